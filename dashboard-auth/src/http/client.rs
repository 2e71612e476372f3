//! HTTP client builder.

use std::sync::Arc;
use std::time::Duration;

use super::SessionAuthMiddleware;
use crate::session::SessionManager;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("rai-dashboard/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Client whose requests carry the session's bearer token.
pub type SessionClient = reqwest_middleware::ClientWithMiddleware;

/// Builds the plain client used for auth calls and the session-aware client used for
/// everything else.
pub struct ClientBuilder {
    config: HttpClientConfig,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Client without session middleware.
    pub fn build_plain(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent.clone())
            .build()
    }

    /// Client that attaches `session`'s access token to every request.
    pub fn build_with_session(
        &self,
        session: Arc<SessionManager>,
    ) -> Result<SessionClient, reqwest::Error> {
        let client = self.build_plain()?;
        Ok(reqwest_middleware::ClientBuilder::new(client)
            .with(SessionAuthMiddleware::new(session))
            .build())
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockGateway;
    use crate::session::SessionSettings;

    #[test]
    fn test_builder_default() {
        let builder = ClientBuilder::new();
        assert_eq!(builder.config.timeout, Duration::from_secs(30));
        assert!(builder.config.user_agent.starts_with("rai-dashboard/"));
    }

    #[test]
    fn test_builder_with_timeout() {
        let builder = ClientBuilder::new().with_timeout(Duration::from_secs(5));
        assert_eq!(builder.config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_build_with_session() {
        let session = Arc::new(SessionManager::new(
            Arc::new(MockGateway::new()),
            SessionSettings::default(),
        ));
        assert!(ClientBuilder::new().build_with_session(session).is_ok());
    }
}
