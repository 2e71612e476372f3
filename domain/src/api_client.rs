//! Authenticated JSON client for the RAI REST API.
//!
//! Requests go through the session middleware, so every call carries a bearer token that was
//! fresh when the request left. Responses are unwrapped from the backend's `{data: ...}`
//! envelope and non-success statuses are normalised into [`ApiError`].

use crate::error::{ApiError, Error};
use crate::listing::ListQuery;
use dashboard_auth::endpoints;
use dashboard_auth::http::SessionClient;
use entity::page::{self, Page};
use log::*;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
#[serde(untagged)]
enum Body<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Body<T> {
    fn into_inner(self) -> T {
        match self {
            Body::Wrapped { data } => data,
            Body::Bare(data) => data,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// List envelope; the backend is inconsistent about `item`/`items` and `limit`/`size`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListBody<T> {
    #[serde(alias = "item", default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    total_items: Option<u64>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(alias = "size", default)]
    limit: Option<u32>,
    #[serde(default)]
    total_pages: Option<u32>,
}

pub struct ApiClient {
    client: SessionClient,
    base_url: String,
}

impl ApiClient {
    pub fn new(client: SessionClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        endpoints::join(&self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, Error> {
        debug!("GET {}", path);
        let response = self.client.get(self.url(path)).query(query).send().await?;
        read(response).await
    }

    /// Like [`Self::get`], but a 404 is `Ok(None)`.
    pub async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, Error> {
        debug!("GET {}", path);
        let response = self.client.get(self.url(path)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read(response).await.map(Some)
    }

    /// Fetches one page of a list endpoint.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &ListQuery,
    ) -> Result<Page<T>, Error> {
        let body: ListBody<T> = self.get(path, &query.to_query_pairs()).await?;
        let limit = body.limit.unwrap_or(query.limit);
        let total = body.total_items.unwrap_or(body.items.len() as u64);
        Ok(Page {
            total_pages: body
                .total_pages
                .unwrap_or_else(|| page::total_pages(total, limit)),
            items: body.items,
            total,
            page: body.page.unwrap_or(query.page),
            limit,
        })
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST {}", path);
        let response = self.client.post(self.url(path)).json(body).send().await?;
        read(response).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("PUT {}", path);
        let response = self.client.put(self.url(path)).json(body).send().await?;
        read(response).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, Error> {
        debug!("POST {} (multipart)", path);
        let response = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await?;
        read(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        debug!("DELETE {}", path);
        let response = self.client.delete(self.url(path)).send().await?;
        ensure_success(response).await?;
        Ok(())
    }
}

async fn read<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    let response = ensure_success(response).await?;
    let body: Body<T> = response.json().await?;
    Ok(body.into_inner())
}

async fn ensure_success(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    // The error body is optional; an unparsable one falls back to the status line.
    let body = response.json::<ErrorBody>().await.ok();
    let (code, message) = body.map(|b| (b.code, b.message)).unwrap_or((None, None));
    let api = ApiError::from_parts(status.as_u16(), status.canonical_reason(), code, message);
    warn!("RAI service answered {}: {}", status.as_u16(), api);
    Err(api.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, ExternalErrorKind};
    use crate::listing::FilterMap;
    use crate::test_support::signed_in_api;
    use mockito::Matcher;
    use std::sync::Arc;

    async fn api(server: &mockito::Server) -> Arc<ApiClient> {
        signed_in_api(&server.url()).await
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Thing {
        id: String,
    }

    #[tokio::test]
    async fn test_get_unwraps_data_envelope() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/things/1")
            .match_header("authorization", Matcher::Regex("^Bearer ".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":{"id":"1"}}"#)
            .create_async()
            .await;

        let thing: Thing = api(&server).await.get("/things/1", &[]).await.unwrap();
        assert_eq!(thing.id, "1");
    }

    #[tokio::test]
    async fn test_get_optional_maps_404_to_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/things/missing")
            .with_status(404)
            .create_async()
            .await;

        let thing: Option<Thing> = api(&server)
            .await
            .get_optional("/things/missing")
            .await
            .unwrap();
        assert_eq!(thing, None);
    }

    #[tokio::test]
    async fn test_get_page_reads_backend_envelope() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/things")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "2".into()),
                Matcher::UrlEncoded("size".into(), "2".into()),
                Matcher::UrlEncoded("status".into(), "failed".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"data":{"item":[{"id":"3"},{"id":"4"}],"totalItems":5,"page":2,"size":2,"totalPages":3}}"#,
            )
            .create_async()
            .await;

        let mut filters = FilterMap::new();
        filters.set("Status", vec!["failed".to_string()]);
        let query = ListQuery {
            page: 2,
            limit: 2,
            filters,
        };

        let page: Page<Thing> = api(&server).await.get_page("/things", &query).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
    }

    #[tokio::test]
    async fn test_error_body_is_normalised() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/things")
            .with_status(422)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"Name taken","code":"ERR_NAME_TAKEN"}"#)
            .create_async()
            .await;

        let err = api(&server)
            .await
            .post::<_, Thing>("/things", &serde_json::json!({ "name": "x" }))
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Api(ApiError {
                status: 422,
                code: "ERR_NAME_TAKEN".to_string(),
                message: "Name taken".to_string(),
            }))
        );
    }

    #[tokio::test]
    async fn test_error_without_body_uses_status_line() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/api/v1/things/1")
            .with_status(500)
            .create_async()
            .await;

        let err = api(&server).await.delete("/things/1").await.unwrap_err();
        assert_eq!(err.code(), "ERROR_500");
        assert_eq!(err.to_string(), "API Error: 500 Internal Server Error");
    }
}
