//! Signed API requests (get, post, put, delete).

use std::path::Path;

use crate::config::import::expand_home;
use crate::config::ProfileStore;
use crate::request::{Operation, RequestExecutor, RequestParams};

/// Sends `operation` for `params` and prints the rendered response to stdout.
///
/// # Errors
/// - If the operation is unsupported (delete)
/// - If the profile is missing or cannot be authenticated
/// - If the request fails in transport
pub async fn handle_request(params: RequestParams, operation: Operation) -> anyhow::Result<()> {
    tracing::info!(
        "{} {} (profile '{}', format {})",
        operation.name(),
        params.uri,
        params.profile,
        params.format
    );

    let executor = RequestExecutor::new(ProfileStore::locate()?)?;
    let output = executor.execute(&params, &operation).await?;
    println!("{output}");
    Ok(())
}

/// Reads a request body from disk.
pub fn read_body(path: &Path) -> anyhow::Result<Vec<u8>> {
    let path = expand_home(path)?;
    std::fs::read(&path).map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))
}
