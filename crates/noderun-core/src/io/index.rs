//! Remote release index client.

use noderun_schema::ReleaseIndex;
use reqwest::Client;
use tracing::debug;

use crate::error::{NodeRunError, Result};

/// Fetch and parse the release index at `url`.
///
/// # Errors
///
/// Returns [`NodeRunError::Transport`] for connection, status or body
/// failures and [`NodeRunError::MalformedIndex`] if the body is not a JSON
/// array.
pub async fn fetch_index(client: &Client, url: &str) -> Result<ReleaseIndex> {
    let transport = |source| NodeRunError::Transport {
        url: url.to_string(),
        source,
    };

    debug!("Fetching release index from {url}");
    let body = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await
        .map_err(transport)?
        .error_for_status()
        .map_err(transport)?
        .text()
        .await
        .map_err(transport)?;

    let index = ReleaseIndex::from_json(&body)?;
    debug!(
        "Release index has {} usable entries, skipped {}",
        index.len(),
        index.skipped
    );
    Ok(index)
}
