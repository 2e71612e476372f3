use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use entity::users;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use super::{AuthGateway, IssuedTokens, LoginRequest};
use crate::error::{status_error, Error};

/// How the in-memory backend answers refresh calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshBehavior {
    /// Issue a new access token and keep the refresh token.
    Issue,
    /// Issue a new access token and a new refresh token.
    Rotate,
    /// Answer 200 with no access token in the body.
    OmitAccessToken,
    /// Answer 401.
    Reject,
}

/// In-memory stand-in for the backend's auth endpoints.
///
/// Accepts any non-empty credentials unless accounts were registered with
/// [`MockGateway::with_account`]. Counts calls so tests can assert on traffic.
pub struct MockGateway {
    accounts: HashMap<String, String>,
    refresh_behavior: Mutex<RefreshBehavior>,
    refresh_delay: Duration,
    issued: Mutex<HashMap<String, users::Model>>,
    sequence: AtomicUsize,
    login_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    logout_calls: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
            refresh_behavior: Mutex::new(RefreshBehavior::Issue),
            refresh_delay: Duration::ZERO,
            issued: Mutex::new(HashMap::new()),
            sequence: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_account(mut self, username: &str, password: &str) -> Self {
        self.accounts
            .insert(username.to_string(), password.to_string());
        self
    }

    pub fn with_refresh_behavior(self, behavior: RefreshBehavior) -> Self {
        self.set_refresh_behavior(behavior);
        self
    }

    /// Delays every refresh answer, to widen race windows in tests.
    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    pub fn set_refresh_behavior(&self, behavior: RefreshBehavior) {
        *self
            .refresh_behavior
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = behavior;
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    fn next_token(&self, kind: &str) -> String {
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        format!("mock-{kind}-{n}")
    }

    fn user_for(&self, token: &str) -> Option<users::Model> {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
    }

    fn remember(&self, token: &str, user: users::Model) {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.to_string(), user);
    }

    fn authenticate(&self, request: &LoginRequest) -> Result<users::Model, Error> {
        if let (Some(_), Some(token)) = (request.provider, request.access_token.as_deref()) {
            if token.is_empty() {
                return Err(status_error(401, "Missing identity provider token"));
            }
            return Ok(users::Model {
                id: "sso-user".to_string(),
                full_name: "SSO User".to_string(),
                email: "sso.user@example.com".to_string(),
                roles: vec!["member".to_string()],
            });
        }

        let username = request.user_name.as_deref().unwrap_or_default();
        let password = request.password.as_deref().unwrap_or_default();
        let accepted = match self.accounts.get(username) {
            Some(expected) => expected == password,
            None => self.accounts.is_empty() && !username.is_empty() && !password.is_empty(),
        };
        if !accepted {
            return Err(status_error(401, "Invalid username or password"));
        }
        Ok(users::Model {
            id: format!("user-{username}"),
            full_name: username.to_string(),
            email: format!("{username}@example.com"),
            roles: vec!["member".to_string()],
        })
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthGateway for MockGateway {
    async fn login(&self, request: &LoginRequest) -> Result<IssuedTokens, Error> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        let user = self.authenticate(request)?;
        let access_token = self.next_token("access");
        let refresh_token = self.next_token("refresh");
        self.remember(&access_token, user.clone());
        self.remember(&refresh_token, user);
        Ok(IssuedTokens {
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
            error: None,
        })
    }

    async fn current_user(&self, access_token: &SecretString) -> Result<users::Model, Error> {
        self.user_for(access_token.expose_secret())
            .ok_or_else(|| status_error(401, "Unknown access token"))
    }

    async fn refresh(&self, refresh_token: &SecretString) -> Result<IssuedTokens, Error> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }

        let user = self
            .user_for(refresh_token.expose_secret())
            .ok_or_else(|| status_error(401, "Unknown refresh token"))?;
        let behavior = *self
            .refresh_behavior
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        debug!("Mock refresh answering with {:?}", behavior);

        match behavior {
            RefreshBehavior::Reject => Err(status_error(401, "Refresh token revoked")),
            RefreshBehavior::OmitAccessToken => Ok(IssuedTokens {
                access_token: None,
                refresh_token: None,
                error: Some("RefreshAccessTokenError".to_string()),
            }),
            RefreshBehavior::Issue | RefreshBehavior::Rotate => {
                let access_token = self.next_token("access");
                self.remember(&access_token, user.clone());
                let refresh_token = if behavior == RefreshBehavior::Rotate {
                    let rotated = self.next_token("refresh");
                    self.remember(&rotated, user);
                    Some(rotated)
                } else {
                    None
                };
                Ok(IssuedTokens {
                    access_token: Some(access_token),
                    refresh_token,
                    error: None,
                })
            }
        }
    }

    async fn logout(&self, access_token: &SecretString) -> Result<(), Error> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(access_token.expose_secret());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::IdentityProvider;

    #[tokio::test]
    async fn test_registered_account_requires_matching_password() {
        let gateway = MockGateway::new().with_account("alice", "secret");

        assert!(gateway
            .login(&LoginRequest::credentials("alice", "wrong"))
            .await
            .is_err());
        let tokens = gateway
            .login(&LoginRequest::credentials("alice", "secret"))
            .await
            .unwrap();

        let user = gateway
            .current_user(&SecretString::new(
                tokens.access_token.unwrap_or_default(),
            ))
            .await
            .unwrap();
        assert_eq!(user.full_name, "alice");
        assert_eq!(gateway.login_calls(), 2);
    }

    #[tokio::test]
    async fn test_provider_login_issues_tokens() {
        let gateway = MockGateway::new();
        let tokens = gateway
            .login(&LoginRequest::provider(IdentityProvider::AzureAd, "az"))
            .await
            .unwrap();
        assert!(tokens.access_token().is_some());
    }

    #[tokio::test]
    async fn test_omitted_access_token_on_refresh() {
        let gateway = MockGateway::new().with_refresh_behavior(RefreshBehavior::OmitAccessToken);
        let tokens = gateway
            .login(&LoginRequest::credentials("bob", "pw"))
            .await
            .unwrap();

        let refreshed = gateway
            .refresh(&SecretString::new(tokens.refresh_token.unwrap_or_default()))
            .await
            .unwrap();

        assert_eq!(refreshed.access_token(), None);
        assert_eq!(gateway.refresh_calls(), 1);
    }
}
