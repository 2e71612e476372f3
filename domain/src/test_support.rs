//! Shared fixtures for tests that talk to a mockito server.

use crate::api_client::ApiClient;
use dashboard_auth::credentials::Credentials;
use dashboard_auth::gateway::MockGateway;
use dashboard_auth::http::ClientBuilder;
use dashboard_auth::session::{SessionManager, SessionSettings};
use std::sync::Arc;

/// An API client rooted at `{server_url}/api/v1` with a signed-in session.
pub async fn signed_in_api(server_url: &str) -> Arc<ApiClient> {
    let session = Arc::new(SessionManager::new(
        Arc::new(MockGateway::new()),
        SessionSettings::default(),
    ));
    session
        .sign_in_with_credentials(&Credentials::new("alice", "secret"))
        .await
        .unwrap();
    let client = ClientBuilder::new().build_with_session(session).unwrap();
    Arc::new(ApiClient::new(client, format!("{server_url}/api/v1")))
}
