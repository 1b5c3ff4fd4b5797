use std::ffi::OsString;
use std::sync::Arc;

use anyhow::{Context, Result};
use noderun_core::install::{DependencyInstaller, SystemRunner};
use noderun_core::io::extract::TarExtractor;
use noderun_core::io::index::fetch_index;
use noderun_core::launch::{self, Invocation};
use noderun_core::lock::FileLockStore;
use noderun_core::resolver::resolve;
use noderun_core::store::{HttpArchiveSource, StoreReconciler};
use noderun_core::{NodeRunError, Reporter, Settings, USER_AGENT};
use noderun_schema::ReleaseIndex;
use tracing::{debug, info};

use crate::split_pin;
use crate::ui::Output;

/// One full invocation: resolve, reconcile, install, hand over.
///
/// Only returns on failure; on success the process image is replaced by
/// the runtime.
pub async fn run(args: Vec<OsString>, program: &str, output: Output) -> Result<()> {
    let (pin, forwarded) = split_pin(args);

    let settings = Settings::from_env()?;
    let store = settings.store();
    let project = settings.project();
    debug!("Store {} project {}", store.root().display(), project.root().display());

    store.ensure_dirs()?;
    project.ensure_exposure_dir()?;

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")?;

    let index = if pin.is_some() {
        ReleaseIndex::default()
    } else {
        fetch_index(&client, &settings.index_url()).await?
    };

    let mut lock = FileLockStore::new(project.lock_path());
    let resolved = resolve(&index, pin.as_deref(), &mut lock)?;
    info!("Resolved {resolved}");

    let reporter: Arc<dyn Reporter> = Arc::new(output.clone());
    let source = HttpArchiveSource::new(client, settings.dist_url.as_str(), reporter);
    let reconciliation = StoreReconciler::new(&store, &source, &TarExtractor, &output)
        .ensure_available(&resolved.version, &project)
        .await?;
    if reconciliation.downloaded || reconciliation.extracted {
        output.success(&format!("Installed {}", resolved.version));
    }

    if forwarded.is_empty() {
        return Err(NodeRunError::Usage {
            program: program.to_string(),
        }
        .into());
    }

    DependencyInstaller::new(&project, &SystemRunner, &output).install_if_manifest()?;

    let invocation = Invocation::runtime(&project, forwarded)?;
    Err(launch::exec(&invocation).into())
}
