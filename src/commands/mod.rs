//! Command handlers for cdis-client.
//!
//! # Commands
//! - `configure`: Import a credential bundle into a profile and fetch a first access token
//! - `request`: Signed get/post/put/delete requests against the API
//! - `logs`: Display recent log entries

pub mod configure;
pub mod logs;
pub mod request;

pub use configure::handle_configure;
pub use logs::handle_logs;
pub use request::{handle_request, read_body};
