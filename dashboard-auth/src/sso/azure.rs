//! Azure AD authorization code flow with PKCE.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::pkce::{Pkce, CHALLENGE_METHOD};
use super::PendingSignIns;
use crate::error::{sso_error, Error, SsoErrorKind};

/// App registration used for enterprise sign-in.
#[derive(Clone)]
pub struct AzureAdConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub tenant_id: String,
    pub redirect_uri: String,
    /// e.g. `https://login.microsoftonline.com`
    pub authority_url: String,
}

impl AzureAdConfig {
    /// Builds a config when every setting is present and non-empty.
    pub fn from_parts(
        client_id: Option<String>,
        client_secret: Option<String>,
        tenant_id: Option<String>,
        redirect_uri: Option<String>,
        authority_url: &str,
    ) -> Result<Self, Error> {
        let require = |value: Option<String>, name: &str| {
            value.filter(|v| !v.trim().is_empty()).ok_or_else(|| {
                sso_error(
                    SsoErrorKind::NotConfigured,
                    &format!("Azure AD {name} is not configured"),
                )
            })
        };
        Ok(Self {
            client_id: require(client_id, "client id")?,
            client_secret: SecretString::new(require(client_secret, "client secret")?),
            tenant_id: require(tenant_id, "tenant id")?,
            redirect_uri: require(redirect_uri, "redirect uri")?,
            authority_url: authority_url.trim_end_matches('/').to_string(),
        })
    }

    /// Scopes requested: identity claims plus the app's own API.
    pub fn scope(&self) -> String {
        format!("openid profile email {}/.default", self.client_id)
    }

    fn endpoint(&self, name: &str) -> String {
        format!(
            "{}/{}/oauth2/v2.0/{}",
            self.authority_url, self.tenant_id, name
        )
    }
}

/// Where to send the user, and the state value the callback must echo.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

/// What the identity provider appended to the redirect URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callback {
    pub code: String,
    pub state: String,
}

impl Callback {
    /// Reads `code` and `state` from the full redirect URL the browser landed on.
    pub fn from_redirect_url(redirect_url: &str) -> Result<Self, Error> {
        let url = reqwest::Url::parse(redirect_url.trim()).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: crate::ErrorKind::Sso(SsoErrorKind::InvalidResponse),
        })?;

        let mut code = None;
        let mut state = None;
        let mut error = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error_description" => error = Some(value.into_owned()),
                "error" if error.is_none() => error = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            return Err(sso_error(SsoErrorKind::TokenExchangeFailed, &error));
        }
        match (code, state) {
            (Some(code), Some(state)) => Ok(Self { code, state }),
            (_, None) => Err(sso_error(
                SsoErrorKind::InvalidState,
                "Redirect URL has no state parameter",
            )),
            (None, _) => Err(sso_error(
                SsoErrorKind::InvalidResponse,
                "Redirect URL has no authorization code",
            )),
        }
    }
}

#[derive(Serialize)]
struct CodeExchange<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
    code_verifier: &'a str,
    scope: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

pub struct AzureAdProvider {
    client: reqwest::Client,
    config: AzureAdConfig,
    pending: PendingSignIns,
}

impl AzureAdProvider {
    pub fn new(client: reqwest::Client, config: AzureAdConfig) -> Self {
        Self {
            client,
            config,
            pending: PendingSignIns::new(),
        }
    }

    /// Starts a sign-in: generates PKCE and CSRF state and builds the authorize URL.
    pub fn authorization_request(&self) -> AuthorizationRequest {
        let pkce = Pkce::generate();
        let state = self.pending.start(pkce.verifier);

        let url = format!(
            "{}?\
            client_id={}&\
            response_type=code&\
            redirect_uri={}&\
            response_mode=query&\
            scope={}&\
            prompt=select_account&\
            state={}&\
            code_challenge={}&\
            code_challenge_method={}",
            self.config.endpoint("authorize"),
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&self.config.scope()),
            urlencoding::encode(&state),
            urlencoding::encode(&pkce.challenge),
            CHALLENGE_METHOD,
        );

        AuthorizationRequest { url, state }
    }

    /// Exchanges the code delivered to the redirect URI for an Azure access token.
    ///
    /// Fails with `InvalidState` unless `state` came from [`Self::authorization_request`]
    /// and has not been used before.
    pub async fn exchange_code(&self, code: &str, state: &str) -> Result<SecretString, Error> {
        let verifier = self.pending.finish(state).ok_or_else(|| {
            sso_error(SsoErrorKind::InvalidState, "Unknown or expired sign-in state")
        })?;

        let scope = self.config.scope();
        let form = CodeExchange {
            grant_type: "authorization_code",
            client_id: &self.config.client_id,
            client_secret: self.config.client_secret.expose_secret(),
            code,
            redirect_uri: &self.config.redirect_uri,
            code_verifier: &verifier,
            scope: &scope,
        };

        debug!("Exchanging Azure AD authorization code");
        let response = self
            .client
            .post(self.config.endpoint("token"))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body: TokenResponse = response.json().await.map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: crate::ErrorKind::Sso(SsoErrorKind::InvalidResponse),
        })?;

        if !status.is_success() {
            let reason = body
                .error_description
                .unwrap_or_else(|| format!("token endpoint answered {status}"));
            warn!("Azure AD code exchange failed: {}", reason);
            return Err(sso_error(SsoErrorKind::TokenExchangeFailed, &reason));
        }

        let token = body.access_token.filter(|t| !t.is_empty()).ok_or_else(|| {
            sso_error(
                SsoErrorKind::InvalidResponse,
                "Token response did not include an access token",
            )
        })?;
        info!("Azure AD code exchanged");
        Ok(SecretString::new(token))
    }
}
