//! The backend calls a session depends on.
//!
//! `RestGateway` talks to the RAI service; `MockGateway` answers in memory for the mock
//! service mode and for tests.

use async_trait::async_trait;
use entity::users;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::Error;

mod mock;
mod rest;

pub use mock::{MockGateway, RefreshBehavior};
pub use rest::RestGateway;

/// External identity providers the backend accepts tokens from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityProvider {
    #[serde(rename = "AzureAD")]
    AzureAd,
}

/// Body of the login call. Exactly one of the credential or provider pairs is set.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<IdentityProvider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl LoginRequest {
    pub fn credentials(user_name: &str, password: &str) -> Self {
        Self {
            user_name: Some(user_name.to_string()),
            password: Some(password.to_string()),
            provider: None,
            access_token: None,
        }
    }

    pub fn provider(provider: IdentityProvider, access_token: &str) -> Self {
        Self {
            user_name: None,
            password: None,
            provider: Some(provider),
            access_token: Some(access_token.to_string()),
        }
    }

    pub fn is_provider(&self) -> bool {
        self.provider.is_some()
    }
}

/// Tokens issued by the backend. Either may be absent on a malformed response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedTokens {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Reason reported by the backend when it declined to issue tokens.
    #[serde(default)]
    pub error: Option<String>,
}

impl IssuedTokens {
    /// The access token, treating an empty string as missing.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<IssuedTokens, Error>;

    async fn current_user(&self, access_token: &SecretString) -> Result<users::Model, Error>;

    /// Exchanges a refresh token for a new token pair.
    async fn refresh(&self, refresh_token: &SecretString) -> Result<IssuedTokens, Error>;

    async fn logout(&self, access_token: &SecretString) -> Result<(), Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_login_body() {
        let body = serde_json::to_value(LoginRequest::credentials("alice", "pw")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "userName": "alice", "password": "pw" })
        );
    }

    #[test]
    fn test_provider_login_body() {
        let body =
            serde_json::to_value(LoginRequest::provider(IdentityProvider::AzureAd, "az-token"))
                .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "provider": "AzureAD", "accessToken": "az-token" })
        );
    }

    #[test]
    fn test_empty_access_token_counts_as_missing() {
        let tokens: IssuedTokens =
            serde_json::from_value(serde_json::json!({ "accessToken": "" })).unwrap();
        assert_eq!(tokens.access_token(), None);
    }
}
