//! Error taxonomy shared by the profile store, token manager and request executor.
//!
//! Command handlers work with `anyhow::Error`; these typed errors are what the
//! library seams return so callers and tests can match on the failure kind.

use std::path::PathBuf;

/// Failures surfaced by the credential store and the signed request flow.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Credential bundle or config file could not be parsed.
    #[error("Failed to parse {source_name}: {message}")]
    ConfigParse {
        source_name: String,
        message: String,
    },

    /// Requested profile is not present in the credential file.
    #[error("Profile '{0}' not found. Run 'cdis-client configure --profile={0}' first.")]
    ProfileNotFound(String),

    /// Token exchange failed, or the retried request was rejected again.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A credential file could not be opened, read or written.
    #[error("Failed to access {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A profile name or value cannot be stored in the line-based credential file.
    #[error("Cannot store {0}")]
    InvalidInput(String),

    /// The user's home directory could not be resolved.
    #[error("Could not determine home directory")]
    Environment,

    /// The operation is not implemented by this client.
    #[error("The '{0}' operation is not supported yet")]
    UnsupportedOperation(&'static str),

    /// The API endpoint is not an absolute URL with a host.
    #[error("Invalid endpoint '{0}'. A valid endpoint looks like: https://www.tests.com")]
    InvalidEndpoint(String),

    /// Transport failure; returned as-is, never retried.
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    pub(crate) fn parse(source_name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ClientError::ConfigParse {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ClientError::Storage {
            path: path.into(),
            source,
        }
    }
}
