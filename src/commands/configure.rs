//! Profile configuration.
//!
//! Imports a credential bundle into a profile, records the API endpoint and
//! exchanges the key material for a first access token.

use std::path::Path;

use cliclack::{input, outro};

use crate::auth::TokenManager;
use crate::config::{import_credentials, parse_endpoint, Credential, ProfileStore};
use crate::error::ClientError;

/// Configures `profile` from a credential bundle and an API endpoint.
///
/// When the bundle is missing but the profile already exists, its stored key
/// material is kept and only the endpoint is updated. The endpoint is prompted
/// for when not given on the command line.
///
/// # Errors
/// - If the bundle is malformed
/// - If no key material is available from the bundle or the existing profile
/// - If the endpoint is not a valid URL
/// - If the credential file cannot be written or the token exchange fails
pub async fn handle_configure(
    profile: &str,
    cred: Option<&Path>,
    api_endpoint: Option<String>,
) -> anyhow::Result<()> {
    let store = ProfileStore::locate()?;
    tracing::info!("Configuring profile '{}' in {}", profile, store.path().display());

    let existing = match store.profile(profile) {
        Ok(credential) => Some(credential),
        Err(ClientError::ProfileNotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };

    let imported = match cred {
        Some(path) => import_credentials(path)?,
        None => None,
    };
    let credential = match (imported, &existing) {
        (Some(credential), _) => credential,
        (None, Some(_)) => {
            tracing::info!("No credential bundle, keeping stored key material for '{}'", profile);
            Credential::default()
        }
        (None, None) => {
            return Err(anyhow::anyhow!(
                "No credentials available for profile '{profile}'. Pass --cred with the credential file issued by the service."
            ))
        }
    };

    let endpoint = match api_endpoint {
        Some(endpoint) => endpoint,
        None => prompt_endpoint(existing.as_ref().and_then(Credential::endpoint))?,
    };
    let endpoint = parse_endpoint(&endpoint)?;

    store.update(profile, &credential, &endpoint)?;

    let stored = store.profile(profile)?;
    let client = reqwest::Client::new();
    TokenManager::new(&client, &store)
        .refresh_token(profile, &stored)
        .await?;

    outro(format!("Profile '{profile}' configured for {endpoint}"))?;
    Ok(())
}

fn prompt_endpoint(current: Option<&str>) -> anyhow::Result<String> {
    let mut prompt = input("API endpoint:").placeholder("https://www.tests.com");
    if let Some(current) = current {
        prompt = prompt.default_input(current);
    }
    let endpoint: String = prompt
        .interact()
        .map_err(|e| anyhow::anyhow!("Endpoint input cancelled: {e}"))?;
    Ok(endpoint)
}
