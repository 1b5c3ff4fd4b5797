//! run-node - per-project Node.js runtime launcher

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use noderun_cli::ui::Output;
use noderun_cli::{Cli, cmd, program_name};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs share stderr with the reporter; stdout belongs to the runtime.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::from_argv(std::env::args_os());
    let output = Output::new();

    match cmd::run::run(cli.args, &program_name(), output.clone()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
