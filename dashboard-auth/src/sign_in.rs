//! Sign-in handlers: turn credentials or an identity provider token into a backend session.
//!
//! Both handlers need a login response carrying an access token, then read the user
//! profile with that token. They report the precise cause; [`SessionManager`] maps every
//! failure to a denied sign-in.
//!
//! [`SessionManager`]: crate::session::SessionManager

use entity::users;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::credentials::Credentials;
use crate::error::{sign_in_error, Error, SignInErrorKind};
use crate::gateway::{AuthGateway, IdentityProvider, IssuedTokens, LoginRequest};

/// A successful sign-in, ready to become a session.
pub struct SignInOutcome {
    pub user: users::Model,
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
}

pub async fn with_credentials(
    gateway: &dyn AuthGateway,
    credentials: &Credentials,
) -> Result<SignInOutcome, Error> {
    credentials.validate()?;
    let request = LoginRequest::credentials(
        credentials.username.trim(),
        credentials.password.expose_secret(),
    );
    let tokens = gateway.login(&request).await?;
    complete(gateway, tokens).await
}

pub async fn with_identity_provider(
    gateway: &dyn AuthGateway,
    provider: IdentityProvider,
    provider_access_token: Option<&str>,
) -> Result<SignInOutcome, Error> {
    let token = provider_access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            sign_in_error(
                SignInErrorKind::Denied,
                "Identity provider returned no access token",
            )
        })?;
    let tokens = gateway
        .login(&LoginRequest::provider(provider, token))
        .await?;
    complete(gateway, tokens).await
}

async fn complete(gateway: &dyn AuthGateway, tokens: IssuedTokens) -> Result<SignInOutcome, Error> {
    let access_token = tokens.access_token().map(str::to_string).ok_or_else(|| {
        sign_in_error(
            SignInErrorKind::MissingAccessToken,
            "Login response did not include an access token",
        )
    })?;
    let access_token = SecretString::new(access_token);
    let refresh_token = tokens.refresh_token().map(|t| SecretString::new(t.to_string()));
    if refresh_token.is_none() {
        warn!("Login response did not include a refresh token; the session cannot be renewed");
    }

    let user = gateway.current_user(&access_token).await?;
    debug!("Signed in as user {}", user.id);

    Ok(SignInOutcome {
        user,
        access_token,
        refresh_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::gateway::MockGateway;

    #[tokio::test]
    async fn test_empty_password_never_reaches_backend() {
        let gateway = MockGateway::new();

        let err = with_credentials(&gateway, &Credentials::new("alice", ""))
            .await
            .err()
            .unwrap();

        match err.error_kind {
            ErrorKind::Validation(errors) => {
                assert_eq!(errors.get("password"), Some("Password is required"))
            }
            other => panic!("unexpected error kind {other:?}"),
        }
        assert_eq!(gateway.login_calls(), 0);
    }

    #[tokio::test]
    async fn test_credentials_sign_in_loads_user() {
        let gateway = MockGateway::new();
        let outcome = with_credentials(&gateway, &Credentials::new(" alice ", "secret"))
            .await
            .unwrap();
        assert_eq!(outcome.user.full_name, "alice");
        assert!(outcome.refresh_token.is_some());
    }

    #[tokio::test]
    async fn test_missing_provider_token_is_denied_without_backend_call() {
        let gateway = MockGateway::new();
        let err = with_identity_provider(&gateway, IdentityProvider::AzureAd, None)
            .await
            .err()
            .unwrap();
        assert_eq!(err.error_kind, ErrorKind::SignIn(SignInErrorKind::Denied));
        assert_eq!(gateway.login_calls(), 0);
    }

    #[tokio::test]
    async fn test_login_without_access_token_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/login")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"refreshToken":"rt"}"#)
            .create_async()
            .await;
        let gateway = crate::gateway::RestGateway::new(reqwest::Client::new(), server.url());

        let err = with_credentials(&gateway, &Credentials::new("alice", "secret"))
            .await
            .err()
            .unwrap();

        assert_eq!(
            err.error_kind,
            ErrorKind::SignIn(SignInErrorKind::MissingAccessToken)
        );
    }
}
