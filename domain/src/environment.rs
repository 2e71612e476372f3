//! Environments: the target APIs that test sets run against.

use crate::api_client::ApiClient;
use crate::error::Error;
use crate::listing::ListQuery;
use crate::mock_data;
use async_trait::async_trait;
use chrono::Utc;
use dashboard_auth::credentials::FieldErrors;
use entity::environments::{AuthType, Draft, Model};
use entity::{Id, Page};
use log::*;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait EnvironmentService: Send + Sync {
    async fn list(&self, query: &ListQuery) -> Result<Page<Model>, Error>;

    /// `Ok(None)` when no environment has this id.
    async fn get(&self, id: &str) -> Result<Option<Model>, Error>;

    async fn create(&self, draft: &Draft) -> Result<Model, Error>;

    async fn update(&self, id: &str, draft: &Draft) -> Result<Model, Error>;

    async fn delete(&self, id: &str) -> Result<(), Error>;
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Checks a draft before it is sent anywhere.
pub fn validate(draft: &Draft) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if draft.name.trim().is_empty() {
        errors.push("name", "Environment name is required.");
    }
    if draft
        .headers
        .iter()
        .any(|h| h.key.trim().is_empty() || h.value.trim().is_empty())
    {
        errors.push("headers", "Key , Value is required.");
    }
    match draft.auth_type {
        AuthType::None => {}
        AuthType::Basic => {
            if blank(&draft.username) || blank(&draft.password) {
                errors.push(
                    "auth",
                    "Username and Password are required for Basic Auth.",
                );
            }
        }
        AuthType::Bearer => {
            if blank(&draft.oauth_endpoint) || blank(&draft.client_id) || blank(&draft.client_secret)
            {
                errors.push(
                    "auth",
                    "OAuth Endpoint, Client ID, and Client Secret are required for Bearer Auth.",
                );
            }
        }
    }
    errors.into_result()
}

pub struct RestEnvironmentService {
    api: Arc<ApiClient>,
}

impl RestEnvironmentService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl EnvironmentService for RestEnvironmentService {
    async fn list(&self, query: &ListQuery) -> Result<Page<Model>, Error> {
        self.api.get_page("/environments", query).await
    }

    async fn get(&self, id: &str) -> Result<Option<Model>, Error> {
        self.api.get_optional(&format!("/environments/{id}")).await
    }

    async fn create(&self, draft: &Draft) -> Result<Model, Error> {
        validate(draft)?;
        let created: Model = self.api.post("/environments", draft).await?;
        info!("Created environment {} ({})", created.name, created.id);
        Ok(created)
    }

    async fn update(&self, id: &str, draft: &Draft) -> Result<Model, Error> {
        validate(draft)?;
        self.api.put(&format!("/environments/{id}"), draft).await
    }

    async fn delete(&self, id: &str) -> Result<(), Error> {
        self.api.delete(&format!("/environments/{id}")).await?;
        info!("Deleted environment {}", id);
        Ok(())
    }
}

/// In-memory environments seeded from `mock_data`.
pub struct MockEnvironmentService {
    records: RwLock<Vec<Model>>,
}

impl MockEnvironmentService {
    pub fn new(seed: u64) -> Self {
        Self::with_records(mock_data::environments(seed))
    }

    pub fn with_records(records: Vec<Model>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub async fn ids(&self) -> Vec<Id> {
        self.records
            .read()
            .await
            .iter()
            .map(|e| e.id.clone())
            .collect()
    }

    fn apply(model: &mut Model, draft: &Draft) {
        model.name = draft.name.trim().to_string();
        model.auth_type = draft.auth_type;
        model.headers = draft.headers.clone();
        model.username = draft.username.clone();
        model.password = draft.password.clone();
        model.oauth_endpoint = draft.oauth_endpoint.clone();
        model.client_id = draft.client_id.clone();
        model.client_secret = draft.client_secret.clone();
        model.last_updated = Some(Utc::now());
    }
}

#[async_trait]
impl EnvironmentService for MockEnvironmentService {
    async fn list(&self, query: &ListQuery) -> Result<Page<Model>, Error> {
        let records = self.records.read().await;
        let auth_types: Option<Vec<AuthType>> = query.filters.selected("authType");
        let matching: Vec<Model> = records
            .iter()
            .filter(|e| {
                auth_types
                    .as_ref()
                    .map_or(true, |wanted| wanted.contains(&e.auth_type))
            })
            .cloned()
            .collect();
        Ok(Page::from_slice(&matching, query.page, query.limit))
    }

    async fn get(&self, id: &str) -> Result<Option<Model>, Error> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn create(&self, draft: &Draft) -> Result<Model, Error> {
        validate(draft)?;
        let mut records = self.records.write().await;
        let now = Utc::now();
        let mut model = Model {
            id: mock_data::padded_id(records.len() + 1),
            name: String::new(),
            auth_type: AuthType::None,
            headers: vec![],
            last_updated: None,
            created_at: Some(now),
            username: None,
            password: None,
            oauth_endpoint: None,
            client_id: None,
            client_secret: None,
        };
        // Ids follow the record count, so skip forward past any id still in use.
        let mut next = records.len() + 1;
        while records.iter().any(|e| e.id == model.id) {
            next += 1;
            model.id = mock_data::padded_id(next);
        }
        Self::apply(&mut model, draft);
        records.push(model.clone());
        Ok(model)
    }

    async fn update(&self, id: &str, draft: &Draft) -> Result<Model, Error> {
        validate(draft)?;
        let mut records = self.records.write().await;
        let model = records
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::not_found(&format!("Environment {id}")))?;
        Self::apply(model, draft);
        Ok(model.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), Error> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|e| e.id != id);
        if records.len() == before {
            return Err(Error::not_found(&format!("Environment {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, InternalErrorKind};
    use crate::listing::FilterMap;
    use crate::test_support::signed_in_api;
    use entity::environments::Header;

    fn basic_draft() -> Draft {
        Draft {
            username: Some("svc".to_string()),
            password: Some("pw".to_string()),
            ..Draft::new("Staging", AuthType::Basic)
        }
    }

    #[test]
    fn test_name_is_required() {
        let errors = validate(&Draft::new("  ", AuthType::None)).unwrap_err();
        assert_eq!(errors.get("name"), Some("Environment name is required."));
    }

    #[test]
    fn test_headers_need_key_and_value() {
        let mut draft = Draft::new("Staging", AuthType::None);
        draft.headers.push(Header::new("X-Api-Key", "", ""));
        let errors = validate(&draft).unwrap_err();
        assert_eq!(errors.get("headers"), Some("Key , Value is required."));
    }

    #[test]
    fn test_basic_auth_needs_username_and_password() {
        let mut draft = basic_draft();
        assert!(validate(&draft).is_ok());
        draft.password = None;
        assert_eq!(
            validate(&draft).unwrap_err().get("auth"),
            Some("Username and Password are required for Basic Auth.")
        );
    }

    #[test]
    fn test_bearer_auth_needs_oauth_fields() {
        let mut draft = Draft::new("Prod", AuthType::Bearer);
        draft.oauth_endpoint = Some("https://auth.example.com/token".to_string());
        draft.client_id = Some("client".to_string());
        assert_eq!(
            validate(&draft).unwrap_err().get("auth"),
            Some("OAuth Endpoint, Client ID, and Client Secret are required for Bearer Auth.")
        );
    }

    #[tokio::test]
    async fn test_mock_pages_seeded_records() {
        let service = MockEnvironmentService::new(42);
        let page = service.list(&ListQuery::new(2, 15)).await.unwrap();
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.total, 20);
        assert_eq!(page.total_pages, 2);
    }

    #[tokio::test]
    async fn test_mock_filters_by_auth_type() {
        let service = MockEnvironmentService::new(42);
        let mut filters = FilterMap::new();
        filters.set("Auth Type", vec!["Bearer".to_string()]);

        let page = service
            .list(&ListQuery::new(1, 50).with_filters(filters))
            .await
            .unwrap();

        assert!(!page.items.is_empty());
        assert!(page.items.iter().all(|e| e.auth_type == AuthType::Bearer));
    }

    #[tokio::test]
    async fn test_mock_unknown_auth_type_matches_nothing() {
        let service = MockEnvironmentService::new(42);
        let mut filters = FilterMap::new();
        filters.set("Auth Type", vec!["kerberos".to_string()]);

        let page = service
            .list(&ListQuery::new(1, 50).with_filters(filters))
            .await
            .unwrap();

        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_mock_create_update_delete() {
        let service = MockEnvironmentService::new(42);

        let created = service.create(&basic_draft()).await.unwrap();
        assert_eq!(created.id, "021");

        let mut draft = Draft::from_model(&created);
        draft.name = "Staging EU".to_string();
        draft.password = Some("pw".to_string());
        let updated = service.update(&created.id, &draft).await.unwrap();
        assert_eq!(updated.name, "Staging EU");

        service.delete(&created.id).await.unwrap();
        assert!(service.get(&created.id).await.unwrap().is_none());
        assert!(service.delete(&created.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_invalid_draft_is_not_stored() {
        let service = MockEnvironmentService::new(42);
        let err = service
            .create(&Draft::new("", AuthType::None))
            .await
            .unwrap_err();
        assert!(matches!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Validation(_))
        ));
        assert_eq!(service.ids().await.len(), 20);
    }

    #[tokio::test]
    async fn test_rest_create_sends_environment_type() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/environments")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "name": "Staging",
                "environmentType": "basic",
                "username": "svc"
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":{"id":"e-1","name":"Staging","type":"basic"}}"#)
            .create_async()
            .await;

        let service = RestEnvironmentService::new(signed_in_api(&server.url()).await);

        let created = service.create(&basic_draft()).await.unwrap();
        assert_eq!(created.auth_type, AuthType::Basic);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rest_invalid_draft_makes_no_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/environments")
            .expect(0)
            .create_async()
            .await;

        let service = RestEnvironmentService::new(signed_in_api(&server.url()).await);
        let mut draft = basic_draft();
        draft.username = None;

        assert!(service.create(&draft).await.is_err());
        mock.assert_async().await;
    }
}
