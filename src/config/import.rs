//! Credential bundle import.
//!
//! The remote service issues a one-time JSON bundle (`{"key_id": ..., "api_key": ...}`)
//! that is read once when a profile is configured.

use std::fs;
use std::path::{Path, PathBuf};

use super::credential::Credential;
use crate::error::ClientError;

/// Expands a leading `~` to the user's home directory.
///
/// # Errors
/// - `Environment` if the path starts with `~` and the home directory cannot be resolved
pub fn expand_home(path: &Path) -> Result<PathBuf, ClientError> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = dirs::home_dir().ok_or(ClientError::Environment)?;
            Ok(home.join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

/// Reads a credential bundle.
///
/// Returns `Ok(None)` when the file does not exist so the caller can fall back
/// to another credential source.
///
/// # Errors
/// - `ConfigParse` if the bundle is not valid JSON or lacks `key_id`/`api_key`
/// - `Storage` if the file exists but cannot be read
pub fn import_credentials(bundle_path: &Path) -> Result<Option<Credential>, ClientError> {
    let path = expand_home(bundle_path)?;

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Credential bundle not found at {}", path.display());
            eprintln!("File specified at {} not found", path.display());
            return Ok(None);
        }
        Err(e) => return Err(ClientError::storage(&path, e)),
    };

    let credential = parse_bundle(&content)
        .map_err(|e| ClientError::parse(path.display().to_string(), e))?;

    tracing::info!("Imported credential bundle from {}", path.display());
    Ok(Some(credential))
}

/// Parses bundle JSON into a credential; only key material is taken from it.
pub fn parse_bundle(content: &str) -> Result<Credential, serde_json::Error> {
    let mut credential: Credential = serde_json::from_str(content)?;
    credential.access_key.clear();
    credential.api_endpoint = None;
    Ok(credential)
}
