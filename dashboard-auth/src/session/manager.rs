//! Session manager with single-flight token refresh.

use std::sync::Arc;

use chrono::{Duration, Utc};
use entity::users;
use secrecy::SecretString;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::{SessionState, SessionToken};
use crate::credentials::Credentials;
use crate::error::{denied, session_error, Error, ErrorKind, SessionErrorKind};
use crate::gateway::{AuthGateway, IdentityProvider};
use crate::sign_in::{self, SignInOutcome};

/// Token timing for a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// How long an issued access token is used before it is refreshed.
    pub token_lifetime: std::time::Duration,
    /// A session unused for longer than this is expired outright. `None` disables the check.
    pub max_idle: Option<std::time::Duration>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            token_lifetime: std::time::Duration::from_secs(60),
            max_idle: Some(std::time::Duration::from_secs(70)),
        }
    }
}

struct Inner {
    state: SessionState,
    token: Option<SessionToken>,
    /// Bumped on every sign-in and sign-out so a refresh that outlives its session is dropped.
    generation: u64,
}

/// Owns the session of one console user.
///
/// Concurrent callers of [`SessionManager::current_token`] that find a stale token share a
/// single refresh call: the first takes the refresh lock, the others wait on it and re-check
/// the session once it is released. A failed refresh is observed by every waiter and is not
/// retried.
pub struct SessionManager {
    gateway: Arc<dyn AuthGateway>,
    lifetime: Duration,
    max_idle: Option<Duration>,
    inner: RwLock<Inner>,
    refresh_lock: Mutex<()>,
}

fn to_chrono(duration: std::time::Duration) -> Duration {
    Duration::from_std(duration).unwrap_or_else(|_| Duration::days(365))
}

impl SessionManager {
    pub fn new(gateway: Arc<dyn AuthGateway>, settings: SessionSettings) -> Self {
        Self {
            gateway,
            lifetime: to_chrono(settings.token_lifetime),
            max_idle: settings.max_idle.map(to_chrono),
            inner: RwLock::new(Inner {
                state: SessionState::Unauthenticated,
                token: None,
                generation: 0,
            }),
            refresh_lock: Mutex::new(()),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.inner.read().await.state
    }

    /// The signed-in user, while the session is usable.
    pub async fn user(&self) -> Option<users::Model> {
        let inner = self.inner.read().await;
        if !inner.state.has_session() {
            return None;
        }
        inner.token.as_ref().map(|t| t.user.clone())
    }

    /// Signs in with a username and password.
    ///
    /// Invalid input is reported field by field without contacting the backend. Any other
    /// failure is a denied sign-in and leaves no session behind.
    pub async fn sign_in_with_credentials(
        &self,
        credentials: &Credentials,
    ) -> Result<users::Model, Error> {
        let outcome = sign_in::with_credentials(self.gateway.as_ref(), credentials).await;
        self.finish_sign_in(outcome).await
    }

    /// Signs in with an access token issued by an enterprise identity provider.
    pub async fn sign_in_with_identity_provider(
        &self,
        provider: IdentityProvider,
        provider_access_token: Option<&str>,
    ) -> Result<users::Model, Error> {
        let outcome =
            sign_in::with_identity_provider(self.gateway.as_ref(), provider, provider_access_token)
                .await;
        self.finish_sign_in(outcome).await
    }

    async fn finish_sign_in(
        &self,
        outcome: Result<SignInOutcome, Error>,
    ) -> Result<users::Model, Error> {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) if matches!(err.error_kind, ErrorKind::Validation(_)) => return Err(err),
            Err(err) => {
                warn!("Sign-in denied: {}", err);
                return Err(denied(err));
            }
        };

        let user = outcome.user.clone();
        let mut inner = self.inner.write().await;
        inner.generation += 1;
        inner.state = SessionState::Authenticated;
        inner.token = Some(SessionToken::issued(
            outcome.user,
            outcome.access_token,
            outcome.refresh_token,
            self.lifetime,
            Utc::now(),
        ));
        info!("Session established for user {}", user.id);
        Ok(user)
    }

    /// Returns an access token that is fresh as of this call, refreshing it first if needed.
    pub async fn current_token(&self) -> Result<SecretString, Error> {
        if let Some(token) = self.fresh_token().await? {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed (or failed to) while we waited for the lock.
        if let Some(token) = self.fresh_token().await? {
            debug!("Token was refreshed by another request");
            return Ok(token);
        }

        let (stale, generation) = {
            let mut inner = self.inner.write().await;
            let stale = inner
                .token
                .clone()
                .ok_or_else(|| session_error(SessionErrorKind::NotSignedIn, "Not signed in"))?;
            inner.state = SessionState::Refreshing;
            (stale, inner.generation)
        };

        debug!("Access token stale for user {}, refreshing", stale.user.id);
        let refreshed = self.refresh(&stale).await;

        let mut inner = self.inner.write().await;
        if inner.generation != generation {
            return Err(session_error(
                SessionErrorKind::NotSignedIn,
                "Session ended during token refresh",
            ));
        }
        match refreshed {
            Ok(token) => {
                let access_token = token.access_token.clone();
                inner.token = Some(token);
                inner.state = SessionState::Authenticated;
                debug!("Token refreshed successfully");
                Ok(access_token)
            }
            Err(err) => {
                warn!("Token refresh failed, session expired: {}", err);
                inner.state = SessionState::Expired;
                Err(Error {
                    source: Some(Box::new(err)),
                    error_kind: ErrorKind::Session(SessionErrorKind::Expired),
                })
            }
        }
    }

    /// `Ok(Some)` for a fresh token, `Ok(None)` when a refresh is due.
    async fn fresh_token(&self) -> Result<Option<SecretString>, Error> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        match inner.state {
            SessionState::Unauthenticated => {
                return Err(session_error(SessionErrorKind::NotSignedIn, "Not signed in"))
            }
            SessionState::Expired => {
                return Err(session_error(
                    SessionErrorKind::Expired,
                    "Session expired, sign in again",
                ))
            }
            SessionState::Authenticated | SessionState::Refreshing => {}
        }

        let (idle, fresh) = match inner.token.as_ref() {
            Some(token) => (
                token.is_idle_expired(now, self.max_idle),
                token.is_fresh(now),
            ),
            None => return Err(session_error(SessionErrorKind::NotSignedIn, "Not signed in")),
        };
        if idle {
            info!("Session idle past its maximum age");
            inner.state = SessionState::Expired;
            return Err(session_error(
                SessionErrorKind::Expired,
                "Session idle past its maximum age",
            ));
        }
        if !fresh {
            return Ok(None);
        }

        Ok(inner.token.as_mut().map(|token| {
            token.last_seen = now;
            token.access_token.clone()
        }))
    }

    async fn refresh(&self, stale: &SessionToken) -> Result<SessionToken, Error> {
        let refresh_token = stale.refresh_token.as_ref().ok_or_else(|| {
            session_error(SessionErrorKind::RefreshFailed, "No refresh token available")
        })?;

        let issued = self.gateway.refresh(refresh_token).await?;
        let access_token = issued.access_token().ok_or_else(|| {
            session_error(
                SessionErrorKind::RefreshFailed,
                issued
                    .error
                    .as_deref()
                    .unwrap_or("Refresh response did not include an access token"),
            )
        })?;

        // The backend may omit the refresh token, in which case the current one stays valid.
        let refresh_token = issued
            .refresh_token()
            .map(|t| SecretString::new(t.to_string()))
            .or_else(|| stale.refresh_token.clone());

        Ok(SessionToken::issued(
            stale.user.clone(),
            SecretString::new(access_token.to_string()),
            refresh_token,
            self.lifetime,
            Utc::now(),
        ))
    }

    /// Ends the session. The backend logout is best effort; local state is always cleared.
    pub async fn sign_out(&self) {
        let token = {
            let mut inner = self.inner.write().await;
            inner.generation += 1;
            inner.state = SessionState::Unauthenticated;
            inner.token.take()
        };

        if let Some(token) = token {
            match self.gateway.logout(&token.access_token).await {
                Ok(()) => info!("Signed out user {}", token.user.id),
                Err(err) => warn!("Backend logout failed, session cleared locally: {}", err),
            }
        }
    }

    #[cfg(test)]
    async fn backdate(&self, by: Duration) {
        let mut inner = self.inner.write().await;
        if let Some(token) = inner.token.as_mut() {
            token.expires_at -= by;
            token.last_seen -= by;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SignInErrorKind;
    use crate::gateway::{MockGateway, RefreshBehavior, RestGateway};
    use secrecy::ExposeSecret;

    async fn signed_in(gateway: Arc<MockGateway>) -> SessionManager {
        let session = SessionManager::new(gateway, SessionSettings::default());
        session
            .sign_in_with_credentials(&Credentials::new("alice", "secret"))
            .await
            .unwrap();
        session
    }

    #[tokio::test]
    async fn test_fresh_token_makes_no_refresh_call() {
        let gateway = Arc::new(MockGateway::new());
        let session = signed_in(gateway.clone()).await;

        let first = session.current_token().await.unwrap();
        let second = session.current_token().await.unwrap();

        assert_eq!(first.expose_secret(), second.expose_secret());
        assert_eq!(gateway.refresh_calls(), 0);
        assert_eq!(session.state().await, SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_stale_token_is_refreshed_once() {
        let gateway = Arc::new(MockGateway::new());
        let session = signed_in(gateway.clone()).await;
        let before = session.current_token().await.unwrap();

        session.backdate(Duration::seconds(61)).await;
        let after = session.current_token().await.unwrap();
        let again = session.current_token().await.unwrap();

        assert_ne!(before.expose_secret(), after.expose_secret());
        assert_eq!(after.expose_secret(), again.expose_secret());
        assert_eq!(gateway.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_keeps_refresh_token_when_none_returned() {
        let gateway = Arc::new(MockGateway::new());
        let session = signed_in(gateway.clone()).await;

        session.backdate(Duration::seconds(61)).await;
        session.current_token().await.unwrap();
        session.backdate(Duration::seconds(61)).await;
        session.current_token().await.unwrap();

        assert_eq!(gateway.refresh_calls(), 2);
        assert_eq!(session.state().await, SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_missing_access_token_on_refresh_expires_session() {
        let gateway = Arc::new(MockGateway::new());
        let session = signed_in(gateway.clone()).await;
        gateway.set_refresh_behavior(RefreshBehavior::OmitAccessToken);

        session.backdate(Duration::seconds(61)).await;
        let err = session.current_token().await.unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::Session(SessionErrorKind::Expired));
        assert_eq!(session.state().await, SessionState::Expired);

        let err = session.current_token().await.unwrap_err();
        assert!(err.is_authentication());
        assert_eq!(gateway.refresh_calls(), 1);
        assert!(session.user().await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let gateway = Arc::new(
            MockGateway::new().with_refresh_delay(std::time::Duration::from_millis(50)),
        );
        let session = signed_in(gateway.clone()).await;
        session.backdate(Duration::seconds(61)).await;

        let (a, b, c) = tokio::join!(
            session.current_token(),
            session.current_token(),
            session.current_token()
        );

        let a = a.unwrap();
        assert_eq!(a.expose_secret(), b.unwrap().expose_secret());
        assert_eq!(a.expose_secret(), c.unwrap().expose_secret());
        assert_eq!(gateway.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_refresh_failure() {
        let gateway = Arc::new(
            MockGateway::new()
                .with_refresh_behavior(RefreshBehavior::Reject)
                .with_refresh_delay(std::time::Duration::from_millis(50)),
        );
        let session = signed_in(gateway.clone()).await;
        session.backdate(Duration::seconds(61)).await;

        let (a, b) = tokio::join!(session.current_token(), session.current_token());

        assert!(a.unwrap_err().is_authentication());
        assert!(b.unwrap_err().is_authentication());
        assert_eq!(gateway.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_idle_session_expires_without_refresh() {
        let gateway = Arc::new(MockGateway::new());
        let session = signed_in(gateway.clone()).await;

        session.backdate(Duration::seconds(71)).await;
        let err = session.current_token().await.unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Session(SessionErrorKind::Expired));
        assert_eq!(gateway.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_sign_in_is_denied_and_leaves_no_session() {
        let gateway = Arc::new(MockGateway::new().with_account("alice", "secret"));
        let session = SessionManager::new(gateway, SessionSettings::default());

        let err = session
            .sign_in_with_credentials(&Credentials::new("alice", "wrong"))
            .await
            .unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::SignIn(SignInErrorKind::Denied));
        assert_eq!(session.state().await, SessionState::Unauthenticated);
        assert!(session.user().await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_input_is_not_a_denial() {
        let gateway = Arc::new(MockGateway::new());
        let session = SessionManager::new(gateway.clone(), SessionSettings::default());

        let err = session
            .sign_in_with_credentials(&Credentials::new("", ""))
            .await
            .unwrap_err();

        assert!(matches!(err.error_kind, ErrorKind::Validation(_)));
        assert_eq!(gateway.login_calls(), 0);
    }

    #[tokio::test]
    async fn test_sign_out_clears_session() {
        let gateway = Arc::new(MockGateway::new());
        let session = signed_in(gateway.clone()).await;

        session.sign_out().await;

        assert_eq!(gateway.logout_calls(), 1);
        assert_eq!(session.state().await, SessionState::Unauthenticated);
        let err = session.current_token().await.unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::Session(SessionErrorKind::NotSignedIn)
        );
    }

    #[tokio::test]
    async fn test_failed_backend_logout_still_clears_session() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/auth/login")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"accessToken":"at-1","refreshToken":"rt-1"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/users/me")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"u1","name":"Alice","email":"alice@example.com","roles":[]}"#)
            .create_async()
            .await;
        let logout = server
            .mock("GET", "/api/v1/auth/logout")
            .match_header("authorization", "Bearer at-1")
            .with_status(500)
            .with_body(r#"{"message":"logout unavailable"}"#)
            .expect(1)
            .create_async()
            .await;

        let gateway = RestGateway::new(
            reqwest::Client::new(),
            format!("{}/api/v1", server.url()),
        );
        let session = SessionManager::new(Arc::new(gateway), SessionSettings::default());
        session
            .sign_in_with_credentials(&Credentials::new("alice", "secret"))
            .await
            .unwrap();

        session.sign_out().await;

        logout.assert_async().await;
        assert_eq!(session.state().await, SessionState::Unauthenticated);
        assert!(session.user().await.is_none());
        let err = session.current_token().await.unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::Session(SessionErrorKind::NotSignedIn)
        );
    }

    #[tokio::test]
    async fn test_identity_provider_sign_in() {
        let gateway = Arc::new(MockGateway::new());
        let session = SessionManager::new(gateway, SessionSettings::default());

        let user = session
            .sign_in_with_identity_provider(IdentityProvider::AzureAd, Some("az-token"))
            .await
            .unwrap();

        assert_eq!(user.id, "sso-user");
        assert_eq!(session.state().await, SessionState::Authenticated);
    }
}
