//! Signed requests against the data-submission API.
//!
//! A request is described by [`RequestParams`] (which profile, which resource,
//! how to render the answer) and an [`Operation`]. The executor signs it with
//! the profile's access token and retries once after a token refresh when the
//! server rejects the token.

pub mod executor;
pub mod render;

pub use executor::RequestExecutor;
pub use render::{render, render_body};

/// How a response body is shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Raw response body
    #[default]
    Txt,
    /// Pretty-printed JSON, raw text if the body is not JSON
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Txt => write!(f, "txt"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Parameters of one request, threaded explicitly from the command to the executor.
#[derive(Debug, Clone)]
pub struct RequestParams {
    pub profile: String,
    pub uri: String,
    pub format: OutputFormat,
}

impl RequestParams {
    pub fn new(profile: impl Into<String>, uri: impl Into<String>, format: OutputFormat) -> Self {
        Self {
            profile: profile.into(),
            uri: uri.into(),
            format,
        }
    }
}

/// HTTP operations exposed by the client.
#[derive(Debug, Clone)]
pub enum Operation {
    Get,
    /// POST with a JSON body
    Post(Vec<u8>),
    /// PUT with a JSON body
    Put(Vec<u8>),
    /// Not supported; fails before any I/O
    Delete,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Post(_) => "post",
            Operation::Put(_) => "put",
            Operation::Delete => "delete",
        }
    }
}
