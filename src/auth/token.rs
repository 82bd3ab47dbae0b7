//! Access token exchange.
//!
//! Long-lived key material (`key_id` + `api_key`) is exchanged for a short-lived
//! access token at a well-known endpoint. Refreshed tokens are written back to
//! the profile so later invocations can reuse them.

use serde::{Deserialize, Serialize};

use crate::config::{Credential, ProfileStore};
use crate::error::ClientError;

/// Token exchange path, relative to the profile's API endpoint.
pub const TOKEN_PATH: &str = "user/credentials/cdis/access_token";

#[derive(Serialize)]
struct AccessTokenRequest<'a> {
    api_key: &'a str,
    key_id: &'a str,
}

#[derive(Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

/// Obtains access tokens for profiles and persists refreshed ones.
pub struct TokenManager<'a> {
    client: &'a reqwest::Client,
    store: &'a ProfileStore,
}

impl<'a> TokenManager<'a> {
    pub fn new(client: &'a reqwest::Client, store: &'a ProfileStore) -> Self {
        Self { client, store }
    }

    /// Returns the stored access token, refreshing only when none is stored.
    ///
    /// The token's expiry is not checked locally; the server decides validity.
    pub async fn ensure_token(&self, profile: &str, credential: &Credential) -> Result<String, ClientError> {
        if !credential.access_key.is_empty() {
            tracing::debug!("Using stored access token for profile '{}'", profile);
            return Ok(credential.access_key.clone());
        }
        tracing::info!("No access token stored for profile '{}'", profile);
        self.refresh_token(profile, credential).await
    }

    /// Exchanges the profile's key material for a new access token.
    ///
    /// On success the token is written to the profile's `access_key` line and
    /// nothing else in the file changes.
    ///
    /// # Errors
    /// - `Authentication` if the exchange fails for any reason (the store is untouched)
    /// - `Storage` if the new token cannot be written
    pub async fn refresh_token(&self, profile: &str, credential: &Credential) -> Result<String, ClientError> {
        if !credential.has_key_material() {
            return Err(ClientError::Authentication(format!(
                "profile '{profile}' has no key_id/api_key. Run 'cdis-client configure --profile={profile}'."
            )));
        }
        let endpoint = credential.endpoint().ok_or_else(|| {
            ClientError::Authentication(format!("profile '{profile}' has no api_endpoint"))
        })?;

        let url = format!("{endpoint}/{TOKEN_PATH}");
        tracing::debug!(
            "Token exchange:\n  URL: {}\n  Method: POST\n  Body: {{\"api_key\": <redacted>, \"key_id\": {}}}",
            url,
            credential.key_id
        );

        let response = self
            .client
            .post(&url)
            .json(&AccessTokenRequest {
                api_key: &credential.api_key,
                key_id: &credential.key_id,
            })
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_connect() {
                    "failed to connect to the token endpoint".to_string()
                } else if e.is_timeout() {
                    "token request timed out".to_string()
                } else {
                    format!("token request failed: {e}")
                };
                ClientError::Authentication(reason)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Token exchange for profile '{}' rejected with {}", profile, status);
            return Err(ClientError::Authentication(format!(
                "token exchange returned {status}: {body}"
            )));
        }

        let token = response
            .json::<AccessTokenResponse>()
            .await
            .map_err(|e| ClientError::Authentication(format!("invalid token response: {e}")))?
            .access_token;
        if token.is_empty() || token.contains(['\n', '\r']) {
            return Err(ClientError::Authentication(
                "token endpoint returned an empty or multi-line token".to_string(),
            ));
        }

        self.store.update(profile, &Credential::access_only(&token), "")?;
        tracing::info!("Refreshed access token for profile '{}'", profile);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn store_for(dir: &TempDir, endpoint: &str, access_key: &str) -> ProfileStore {
        let path = dir.path().join("config");
        fs::write(
            &path,
            format!("[default]\nkey_id=kid\napi_key=secret\naccess_key={access_key}\napi_endpoint={endpoint}\n\n"),
        )
        .unwrap();
        ProfileStore::at(path)
    }

    #[tokio::test]
    async fn test_ensure_token_uses_stored_token_without_network() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let dir = TempDir::new().unwrap();
        let store = store_for(&dir, &server.url(), "stored");
        let client = reqwest::Client::new();
        let cred = store.profile("default").unwrap();

        let token = TokenManager::new(&client, &store)
            .ensure_token("default", &cred)
            .await
            .unwrap();

        assert_eq!(token, "stored");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_persists_new_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/user/credentials/cdis/access_token")
            .match_body(Matcher::Json(json!({"api_key": "secret", "key_id": "kid"})))
            .with_status(200)
            .with_body(r#"{"access_token": "fresh"}"#)
            .create_async()
            .await;
        let dir = TempDir::new().unwrap();
        let store = store_for(&dir, &server.url(), "");
        let client = reqwest::Client::new();
        let cred = store.profile("default").unwrap();

        let token = TokenManager::new(&client, &store)
            .ensure_token("default", &cred)
            .await
            .unwrap();

        assert_eq!(token, "fresh");
        let stored = store.profile("default").unwrap();
        assert_eq!(stored.access_key, "fresh");
        assert_eq!(stored.key_id, "kid");
        assert_eq!(stored.api_key, "secret");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_store_untouched() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/user/credentials/cdis/access_token")
            .with_status(401)
            .with_body("invalid api key")
            .create_async()
            .await;
        let dir = TempDir::new().unwrap();
        let store = store_for(&dir, &server.url(), "old");
        let before = fs::read(store.path()).unwrap();
        let client = reqwest::Client::new();
        let cred = store.profile("default").unwrap();

        let err = TokenManager::new(&client, &store)
            .refresh_token("default", &cred)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Authentication(_)));
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_multiline_token_is_not_persisted() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/user/credentials/cdis/access_token")
            .with_status(200)
            .with_body(r#"{"access_token": "tok\nen"}"#)
            .create_async()
            .await;
        let dir = TempDir::new().unwrap();
        let store = store_for(&dir, &server.url(), "old");
        let before = fs::read(store.path()).unwrap();
        let client = reqwest::Client::new();
        let cred = store.profile("default").unwrap();

        let err = TokenManager::new(&client, &store)
            .refresh_token("default", &cred)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Authentication(_)));
        assert_eq!(fs::read(store.path()).unwrap(), before);
        assert_eq!(store.profile("default").unwrap().access_key, "old");
    }

    #[tokio::test]
    async fn test_refresh_without_key_material_fails() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::at(dir.path().join("config"));
        let client = reqwest::Client::new();
        let cred = Credential {
            api_endpoint: Some("https://x.test".to_string()),
            ..Credential::default()
        };

        let err = TokenManager::new(&client, &store)
            .refresh_token("default", &cred)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Authentication(_)));
        assert!(!store.path().exists());
    }
}
