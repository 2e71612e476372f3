use async_trait::async_trait;
use entity::users;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use super::{AuthGateway, IssuedTokens, LoginRequest};
use crate::endpoints::{self, bearer};
use crate::error::{status_error, Error};

/// Auth gateway backed by the RAI service.
///
/// Uses a plain client: every call here sets its own `Authorization` header, and the refresh
/// call must never go through the session middleware.
pub struct RestGateway {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl RestGateway {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        endpoints::join(&self.base_url, path)
    }

    async fn ensure_success(response: Response) -> Result<Response, Error> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| {
                format!(
                    "API Error: {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or_default()
                )
            });
        Err(status_error(status.as_u16(), &message))
    }
}

#[async_trait]
impl AuthGateway for RestGateway {
    async fn login(&self, request: &LoginRequest) -> Result<IssuedTokens, Error> {
        debug!(
            "Logging in via {}",
            if request.is_provider() {
                "identity provider"
            } else {
                "credentials"
            }
        );
        let response = self
            .client
            .post(self.url(endpoints::LOGIN))
            .json(request)
            .send()
            .await?;
        Ok(Self::ensure_success(response).await?.json().await?)
    }

    async fn current_user(&self, access_token: &SecretString) -> Result<users::Model, Error> {
        let response = self
            .client
            .get(self.url(endpoints::CURRENT_USER))
            .header(AUTHORIZATION, bearer(access_token.expose_secret()))
            .send()
            .await?;
        Ok(Self::ensure_success(response).await?.json().await?)
    }

    async fn refresh(&self, refresh_token: &SecretString) -> Result<IssuedTokens, Error> {
        let response = self
            .client
            .get(self.url(endpoints::REFRESH_TOKEN))
            .header(AUTHORIZATION, bearer(refresh_token.expose_secret()))
            .send()
            .await?;
        Ok(Self::ensure_success(response).await?.json().await?)
    }

    async fn logout(&self, access_token: &SecretString) -> Result<(), Error> {
        let response = self
            .client
            .get(self.url(endpoints::LOGOUT))
            .header(AUTHORIZATION, bearer(access_token.expose_secret()))
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, HttpErrorKind};
    use mockito::Matcher;

    fn gateway(server: &mockito::Server) -> RestGateway {
        RestGateway::new(Client::new(), format!("{}/api/v1", server.url()))
    }

    #[tokio::test]
    async fn test_login_posts_credentials() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/auth/login")
            .match_body(Matcher::Json(serde_json::json!({
                "userName": "alice",
                "password": "secret"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"accessToken":"at-1","refreshToken":"rt-1"}"#)
            .create_async()
            .await;

        let tokens = gateway(&server)
            .login(&LoginRequest::credentials("alice", "secret"))
            .await
            .unwrap();

        assert_eq!(tokens.access_token(), Some("at-1"));
        assert_eq!(tokens.refresh_token(), Some("rt-1"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_sends_refresh_token_as_bearer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/auth/refresh-token")
            .match_header("authorization", "Bearer rt-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"accessToken":"at-2"}"#)
            .create_async()
            .await;

        let tokens = gateway(&server)
            .refresh(&SecretString::new("rt-1".to_string()))
            .await
            .unwrap();

        assert_eq!(tokens.access_token(), Some("at-2"));
        assert_eq!(tokens.refresh_token(), None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_backend_message_is_kept_on_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/auth/login")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"Invalid credentials"}"#)
            .create_async()
            .await;

        let err = gateway(&server)
            .login(&LoginRequest::credentials("alice", "wrong"))
            .await
            .unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Http(HttpErrorKind::Status(401)));
        assert_eq!(
            err.source.map(|s| s.to_string()),
            Some("Invalid credentials".to_string())
        );
    }

    #[tokio::test]
    async fn test_current_user_reads_profile() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/users/me")
            .match_header("authorization", "Bearer at-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"u1","name":"Alice","email":"alice@example.com","roles":["admin"]}"#)
            .create_async()
            .await;

        let user = gateway(&server)
            .current_user(&SecretString::new("at-1".to_string()))
            .await
            .unwrap();

        assert_eq!(user.full_name, "Alice");
        assert!(user.has_role("admin"));
    }
}
