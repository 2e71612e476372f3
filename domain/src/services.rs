//! Wires the session and the data services together from configuration.
//!
//! `SERVICE_MODE` picks one implementation per service: `mock` serves seeded in-memory data,
//! `rest` talks to the RAI backend through the authenticated client.

use crate::api_client::ApiClient;
use crate::environment::{EnvironmentService, MockEnvironmentService, RestEnvironmentService};
use crate::error::Error;
use crate::mock_data;
use crate::test_set::{MockTestSetService, RestTestSetService, TestSetService};
use crate::workspace::{self, MockWorkspaceService, RestWorkspaceService, WorkspaceService};
use dashboard_auth::gateway::{AuthGateway, MockGateway, RestGateway};
use dashboard_auth::http::ClientBuilder;
use dashboard_auth::session::{SessionManager, SessionSettings};
use dashboard_auth::sso::{AzureAdConfig, AzureAdProvider};
use log::*;
use service::config::{Config, ServiceMode};
use std::sync::Arc;

pub struct Services {
    pub session: Arc<SessionManager>,
    pub environments: Arc<dyn EnvironmentService>,
    pub workspaces: Arc<dyn WorkspaceService>,
    pub test_sets: Arc<dyn TestSetService>,
    /// Present only when every Azure AD setting is configured.
    pub sso: Option<AzureAdProvider>,
    pub page_size: u32,
}

fn session_settings(config: &Config) -> SessionSettings {
    SessionSettings {
        token_lifetime: config.token_lifetime(),
        max_idle: Some(config.session_max_idle()),
    }
}

fn sso_provider(config: &Config, client: reqwest::Client) -> Option<AzureAdProvider> {
    match AzureAdConfig::from_parts(
        config.azure_ad_client_id(),
        config.azure_ad_client_secret(),
        config.azure_ad_tenant_id(),
        config.azure_ad_redirect_uri(),
        config.azure_ad_authority_url(),
    ) {
        Ok(sso_config) => Some(AzureAdProvider::new(client, sso_config)),
        Err(err) => {
            debug!("Enterprise sign-in disabled: {}", err);
            None
        }
    }
}

impl Services {
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let builder = ClientBuilder::new().with_timeout(config.request_timeout());
        let plain = builder.build_plain()?;
        let sso = sso_provider(config, plain.clone());

        let services = match config.service_mode {
            ServiceMode::Mock => {
                info!("Using mock services (seed {})", config.mock_seed);
                let gateway: Arc<dyn AuthGateway> = Arc::new(MockGateway::new());
                let session = Arc::new(SessionManager::new(gateway, session_settings(config)));

                let environments = mock_data::environments(config.mock_seed);
                let environment_ids: Vec<String> =
                    environments.iter().map(|e| e.id.clone()).collect();
                let workspaces = mock_data::workspaces(config.mock_seed, &environment_ids);
                let test_sets = Arc::new(MockTestSetService::new(
                    config.mock_seed,
                    &workspace::seeded_ids(&workspaces),
                ));

                Services {
                    session,
                    environments: Arc::new(MockEnvironmentService::with_records(environments)),
                    workspaces: Arc::new(MockWorkspaceService::new(workspaces, test_sets.clone())),
                    test_sets,
                    sso,
                    page_size: config.page_size,
                }
            }
            ServiceMode::Rest => {
                let base_url = config.api_base_url();
                info!("Using RAI service at {}", base_url);
                let gateway: Arc<dyn AuthGateway> =
                    Arc::new(RestGateway::new(plain, base_url.clone()));
                let session = Arc::new(SessionManager::new(gateway, session_settings(config)));
                let api = Arc::new(ApiClient::new(
                    builder.build_with_session(session.clone())?,
                    base_url,
                ));

                Services {
                    session,
                    environments: Arc::new(RestEnvironmentService::new(api.clone())),
                    workspaces: Arc::new(RestWorkspaceService::new(api.clone())),
                    test_sets: Arc::new(RestTestSetService::new(api)),
                    sso,
                    page_size: config.page_size,
                }
            }
        };
        Ok(services)
    }
}
