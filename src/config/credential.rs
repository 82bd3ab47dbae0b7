//! Credential entity for a single profile.

use serde::Deserialize;

/// Authentication material for one profile.
///
/// `key_id` and `api_key` are long-lived and issued once by the remote service.
/// `access_key` is the short-lived bearer token. When a `Credential` is used as
/// an update, empty fields mean "leave the stored value alone".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credential {
    pub key_id: String,
    pub api_key: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub api_endpoint: Option<String>,
}

impl Credential {
    /// Update carrying only a refreshed access token.
    pub fn access_only(access_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            ..Self::default()
        }
    }

    /// Endpoint with any trailing slash removed, if one is set.
    pub fn endpoint(&self) -> Option<&str> {
        self.api_endpoint
            .as_deref()
            .map(|e| e.trim_end_matches('/'))
            .filter(|e| !e.is_empty())
    }

    pub fn has_key_material(&self) -> bool {
        !self.key_id.is_empty() && !self.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let cred = Credential {
            api_endpoint: Some("https://x.test/".to_string()),
            ..Credential::default()
        };
        assert_eq!(cred.endpoint(), Some("https://x.test"));
    }

    #[test]
    fn test_empty_endpoint_is_none() {
        let cred = Credential {
            api_endpoint: Some(String::new()),
            ..Credential::default()
        };
        assert_eq!(cred.endpoint(), None);
    }

    #[test]
    fn test_access_only_leaves_key_material_empty() {
        let cred = Credential::access_only("tok");
        assert_eq!(cred.access_key, "tok");
        assert!(!cred.has_key_material());
    }
}
