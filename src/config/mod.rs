//! Credential configuration for cdis-client.
//!
//! Profiles live in a plain-text file at `~/.cdis/config`. Credentials enter the
//! store through a JSON bundle issued by the remote service, and access tokens
//! are written back whenever they are refreshed.

pub mod credential;
pub mod endpoint;
pub mod import;
pub mod store;

pub use credential::Credential;
pub use endpoint::{parse_endpoint, request_url};
pub use import::import_credentials;
pub use store::{ProfileRecord, ProfileStore};
