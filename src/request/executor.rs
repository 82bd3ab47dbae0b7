//! Signed request execution with a single refresh-and-retry on auth failure.
//!
//! Per call the request moves through:
//! `Unauthenticated -> TokenEnsured -> Requesting -> Success`, or on a 401/403
//! `AuthRejected -> Refreshing -> Retrying -> Success | Failed`.
//! A second rejection is final; the refresh is never attempted twice.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};

use super::{render, Operation, RequestParams};
use crate::auth::TokenManager;
use crate::config::{request_url, ProfileStore};
use crate::error::ClientError;

/// Environment variable holding an optional request timeout in seconds.
pub const TIMEOUT_ENV: &str = "CDIS_REQUEST_TIMEOUT";

fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// Reads a timeout in whole seconds; unparseable values are ignored with a warning.
fn parse_timeout(value: Option<&str>) -> Option<Duration> {
    let value = value?.trim();
    match value.parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(e) => {
            tracing::warn!("Ignoring {}={:?}: {}", TIMEOUT_ENV, value, e);
            None
        }
    }
}

/// Executes requests signed with a profile's access token.
pub struct RequestExecutor {
    client: Client,
    store: ProfileStore,
}

impl RequestExecutor {
    /// Creates an executor with a client honoring `CDIS_REQUEST_TIMEOUT`.
    ///
    /// Without the variable no timeout is set and a stalled transport blocks.
    pub fn new(store: ProfileStore) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(timeout) = parse_timeout(std::env::var(TIMEOUT_ENV).ok().as_deref()) {
            tracing::debug!("Request timeout set to {}s", timeout.as_secs());
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, store))
    }

    pub fn with_client(client: Client, store: ProfileStore) -> Self {
        Self { client, store }
    }

    /// Runs `operation` for `params` and renders the response.
    ///
    /// # Errors
    /// - `UnsupportedOperation` for delete, before any file or network access
    /// - `ProfileNotFound` if the profile is not configured (no network call)
    /// - `Authentication` if the token cannot be obtained or is rejected twice
    /// - `Http` on transport failure
    pub async fn execute(&self, params: &RequestParams, operation: &Operation) -> Result<String, ClientError> {
        let (method, body) = match operation {
            Operation::Get => (Method::GET, None),
            Operation::Post(body) => (Method::POST, Some(body)),
            Operation::Put(body) => (Method::PUT, Some(body)),
            Operation::Delete => return Err(ClientError::UnsupportedOperation(operation.name())),
        };

        self.execute_with(params, |client, url| {
            let request = client.request(method.clone(), url);
            match body {
                Some(body) => request
                    .header(CONTENT_TYPE, "application/json")
                    .body(body.clone()),
                None => request,
            }
        })
        .await
    }

    /// Runs a request built by `build` and renders the response.
    ///
    /// `build` receives the client and the full target URL and is invoked once
    /// per attempt; the authorization header is added afterwards.
    pub async fn execute_with<F>(&self, params: &RequestParams, build: F) -> Result<String, ClientError>
    where
        F: Fn(&Client, &str) -> RequestBuilder,
    {
        let response = self.send_signed(&params.profile, &params.uri, build).await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("{} {} returned {}", params.profile, params.uri, status);
        }
        render(response, params.format).await
    }

    /// Sends a signed request, refreshing the token and retrying exactly once
    /// if the server answers 401 or 403.
    ///
    /// A token that was only just exchanged because none was stored is not
    /// refreshed again. Any other status is returned untouched.
    pub async fn send_signed<F>(&self, profile: &str, uri: &str, build: F) -> Result<Response, ClientError>
    where
        F: Fn(&Client, &str) -> RequestBuilder,
    {
        let credential = self.store.profile(profile)?;
        let endpoint = credential.endpoint().ok_or_else(|| {
            ClientError::parse(
                self.store.path().display().to_string(),
                format!("profile '{profile}' has no api_endpoint"),
            )
        })?;
        let url = request_url(endpoint, uri);
        let tokens = TokenManager::new(&self.client, &self.store);

        let minted = credential.access_key.is_empty();
        let token = tokens.ensure_token(profile, &credential).await?;
        let response = self.attempt(&build, &url, &token).await?;
        if !is_auth_failure(response.status()) {
            return Ok(response);
        }
        if minted {
            // Token was exchanged during this call.
            let status = response.status();
            tracing::error!("Freshly issued token for profile '{}' rejected by {} ({})", profile, url, status);
            return Err(ClientError::Authentication(format!(
                "newly issued token rejected ({status})"
            )));
        }

        tracing::info!(
            "Request to {} rejected with {}, refreshing token for profile '{}'",
            url,
            response.status(),
            profile
        );
        let token = tokens.refresh_token(profile, &credential).await?;
        let response = self.attempt(&build, &url, &token).await?;
        let status = response.status();
        if is_auth_failure(status) {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Request to {} rejected again after token refresh ({})", url, status);
            return Err(ClientError::Authentication(format!(
                "request rejected after token refresh ({status}): {body}"
            )));
        }
        Ok(response)
    }

    async fn attempt<F>(&self, build: &F, url: &str, token: &str) -> Result<Response, ClientError>
    where
        F: Fn(&Client, &str) -> RequestBuilder,
    {
        tracing::debug!("Sending request:\n  URL: {}\n  Authorization: bearer <redacted>", url);
        let response = build(&self.client, url)
            .header(AUTHORIZATION, format!("bearer {token}"))
            .send()
            .await?;
        tracing::debug!("Response status: {}", response.status());
        Ok(response)
    }
}
