//! Streamed archive download.
//!
//! The response status is checked before the destination file is created,
//! so a missing release leaves nothing behind in the store. A failure
//! while the body is streaming leaves the partial file where it is.

use std::path::Path;

use futures::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::Reporter;
use crate::error::{NodeRunError, Result};

/// Download `url` into `dest`, reporting progress for `version`.
///
/// Returns the number of bytes written.
///
/// # Errors
///
/// Returns [`NodeRunError::Transport`] for HTTP failures and
/// [`NodeRunError::TransportIo`] if the file cannot be written.
pub async fn download_to<R: Reporter + ?Sized>(
    client: &Client,
    url: &str,
    dest: &Path,
    version: &str,
    reporter: &R,
) -> Result<u64> {
    let transport = |source| NodeRunError::Transport {
        url: url.to_string(),
        source,
    };
    let write_err = |source| NodeRunError::TransportIo {
        url: url.to_string(),
        path: dest.to_path_buf(),
        source,
    };

    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await
        .map_err(transport)?
        .error_for_status()
        .map_err(transport)?;

    let total_size = response.content_length();
    reporter.downloading(version, 0, total_size);

    let mut file = File::create(dest).await.map_err(write_err)?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(transport)?;
        file.write_all(&chunk).await.map_err(write_err)?;
        downloaded += chunk.len() as u64;
        reporter.downloading(version, downloaded, total_size);
    }

    file.flush().await.map_err(write_err)?;
    Ok(downloaded)
}
