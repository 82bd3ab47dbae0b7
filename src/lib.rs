//! cdis-client: command-line client for a data-submission API.
//!
//! Profiles with long-lived key material are stored in `~/.cdis/config`.
//! Requests are signed with a short-lived access token exchanged from that
//! key material, and retried once after a refresh when the token is rejected.

pub mod app;
pub mod auth;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod request;

pub use error::ClientError;
