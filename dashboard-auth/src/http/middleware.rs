use std::sync::Arc;

use ::http::Extensions;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use secrecy::ExposeSecret;
use tracing::debug;

use crate::endpoints::{self, bearer};
use crate::session::SessionManager;

/// Attaches the session's access token as a bearer credential.
///
/// The token is re-validated (and refreshed when stale) before each request. Requests that
/// target the refresh endpoint or already carry an `Authorization` header pass through
/// untouched.
///
/// Without a usable session (signed out, or expired) the request fails with the session error
/// instead of being sent.
pub struct SessionAuthMiddleware {
    session: Arc<SessionManager>,
}

impl SessionAuthMiddleware {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    fn bypasses(request: &Request) -> bool {
        request
            .url()
            .path()
            .trim_end_matches('/')
            .ends_with(endpoints::REFRESH_TOKEN)
            || request.headers().contains_key(AUTHORIZATION)
    }
}

#[async_trait::async_trait]
impl Middleware for SessionAuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        if Self::bypasses(&req) {
            return next.run(req, extensions).await;
        }

        let token = self
            .session
            .current_token()
            .await
            .map_err(|e| reqwest_middleware::Error::Middleware(anyhow::Error::new(e)))?;
        let mut value = HeaderValue::from_str(&bearer(token.expose_secret()))
            .map_err(|e| reqwest_middleware::Error::Middleware(anyhow::Error::new(e)))?;
        value.set_sensitive(true);
        req.headers_mut().insert(AUTHORIZATION, value);

        debug!("{} {}", req.method(), req.url().path());
        next.run(req, extensions).await
    }
}
