use crate::Id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How test runs authenticate against the target API of an environment.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    #[serde(alias = "None")]
    None,
    #[serde(alias = "Basic")]
    Basic,
    #[serde(alias = "Bearer")]
    Bearer,
}

impl std::fmt::Display for AuthType {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthType::None => write!(fmt, "None"),
            AuthType::Basic => write!(fmt, "Basic"),
            AuthType::Bearer => write!(fmt, "Bearer"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct AuthTypeParseError;

impl FromStr for AuthType {
    type Err = AuthTypeParseError;
    fn from_str(value: &str) -> Result<AuthType, Self::Err> {
        match value.to_lowercase().as_str() {
            "none" => Ok(AuthType::None),
            "basic" => Ok(AuthType::Basic),
            "bearer" => Ok(AuthType::Bearer),
            _ => Err(AuthTypeParseError),
        }
    }
}

/// A header sent with every request the test runner makes to the target API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub description: String,
}

impl Header {
    pub fn new(key: &str, value: &str, description: &str) -> Self {
        Self {
            id: None,
            key: key.to_string(),
            value: value.to_string(),
            description: description.to_string(),
        }
    }
}

/// A target configuration against which test sets execute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: Id,
    pub name: String,
    #[serde(alias = "type", default)]
    pub auth_type: AuthType,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(alias = "updatedAt", default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default)]
    pub oauth_endpoint: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub client_secret: Option<String>,
}

/// Payload for creating or fully replacing an environment.
///
/// The backend expects the auth type as a lowercase `environmentType`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub name: String,
    #[serde(rename = "environmentType")]
    pub auth_type: AuthType,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl Draft {
    pub fn new(name: &str, auth_type: AuthType) -> Self {
        Self {
            name: name.to_string(),
            auth_type,
            ..Default::default()
        }
    }

    /// Builds a draft pre-filled from an existing environment, for edit forms.
    pub fn from_model(model: &Model) -> Self {
        Self {
            name: model.name.clone(),
            auth_type: model.auth_type,
            headers: model
                .headers
                .iter()
                .map(|h| Header {
                    id: None,
                    ..h.clone()
                })
                .collect(),
            username: model.username.clone(),
            password: model.password.clone(),
            oauth_endpoint: model.oauth_endpoint.clone(),
            client_id: model.client_id.clone(),
            client_secret: model.client_secret.clone(),
        }
    }
}
