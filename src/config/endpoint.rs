//! API endpoint validation and request URL construction.

use reqwest::Url;

use crate::error::ClientError;

/// Path prefix under which every API resource lives.
pub const API_PREFIX: &str = "api";

/// Validates that `endpoint` is an absolute URL with a host.
///
/// Returns the endpoint trimmed of surrounding whitespace and trailing slashes.
pub fn parse_endpoint(endpoint: &str) -> Result<String, ClientError> {
    let trimmed = endpoint.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|_| ClientError::InvalidEndpoint(endpoint.to_string()))?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ClientError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Joins `uri` under `<endpoint>/api/`, dropping leading slashes from `uri`.
pub fn request_url(endpoint: &str, uri: &str) -> String {
    format!(
        "{}/{API_PREFIX}/{}",
        endpoint.trim_end_matches('/'),
        uri.trim_start_matches('/')
    )
}
