//! Error types for the `domain` layer.
use dashboard_auth::credentials::FieldErrors;
use dashboard_auth::error::{Error as AuthError, ErrorKind as AuthErrorKind, HttpErrorKind};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure with `domain::error::Error` as the
/// root type holding a tree of `error_kind` enums. The `source` field holds the original error.
/// Lower layers (`dashboard-auth`, `reqwest`) are translated here so the console only ever has
/// to match on domain error kinds when deciding what notification to show.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    /// Input rejected before anything was sent; blocks submission.
    Validation(FieldErrors),
    Config,
    Other(String),
}

#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    /// The backend answered with an error status.
    Api(ApiError),
    /// The session is gone; the user must sign in again.
    Authentication,
    /// Credentials or an identity provider token were refused at sign-in.
    SignInDenied,
    NotFound,
    /// An uploaded file was rejected by the backend as malformed.
    InvalidFileFormat(ApiError),
    Network,
    Other(String),
}

/// A backend error normalised from `{message, code}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: u16,
    pub code: String,
    pub message: String,
}

pub const INVALID_CSV_FORMAT: &str = "ERR_INVALID_CSV_FORMAT";

impl ApiError {
    /// Falls back to `ERROR_{status}` and `API Error: {status} {reason}` for missing fields.
    pub fn from_parts(
        status: u16,
        reason: Option<&str>,
        code: Option<String>,
        message: Option<String>,
    ) -> Self {
        Self {
            status,
            code: code
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| format!("ERROR_{status}")),
            message: message.filter(|m| !m.is_empty()).unwrap_or_else(|| {
                format!("API Error: {} {}", status, reason.unwrap_or_default())
                    .trim_end()
                    .to_string()
            }),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl StdError for ApiError {}

impl Error {
    pub fn validation(errors: FieldErrors) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Validation(errors)),
        }
    }

    pub fn config(message: &str) -> Self {
        Error {
            source: Some(message.to_string().into()),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        }
    }

    pub fn not_found(what: &str) -> Self {
        Error {
            source: Some(format!("{what} not found").into()),
            error_kind: DomainErrorKind::External(ExternalErrorKind::NotFound),
        }
    }

    pub fn is_authentication(&self) -> bool {
        self.error_kind == DomainErrorKind::External(ExternalErrorKind::Authentication)
    }

    pub fn is_not_found(&self) -> bool {
        match &self.error_kind {
            DomainErrorKind::External(ExternalErrorKind::NotFound) => true,
            DomainErrorKind::External(ExternalErrorKind::Api(api)) => api.status == 404,
            _ => false,
        }
    }

    /// Machine-readable code for notifications.
    pub fn code(&self) -> String {
        match &self.error_kind {
            DomainErrorKind::Internal(InternalErrorKind::Validation(_)) => "VALIDATION".to_string(),
            DomainErrorKind::Internal(_) => "INTERNAL".to_string(),
            DomainErrorKind::External(ExternalErrorKind::Api(api))
            | DomainErrorKind::External(ExternalErrorKind::InvalidFileFormat(api)) => {
                api.code.clone()
            }
            DomainErrorKind::External(ExternalErrorKind::Authentication) => {
                "UNAUTHENTICATED".to_string()
            }
            DomainErrorKind::External(ExternalErrorKind::SignInDenied) => {
                "SIGN_IN_DENIED".to_string()
            }
            DomainErrorKind::External(ExternalErrorKind::NotFound) => "NOT_FOUND".to_string(),
            DomainErrorKind::External(ExternalErrorKind::Network) => "FETCH_FAILED".to_string(),
            DomainErrorKind::External(ExternalErrorKind::Other(_)) => "EXTERNAL".to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            DomainErrorKind::Internal(InternalErrorKind::Validation(errors)) => {
                write!(f, "{errors}")
            }
            DomainErrorKind::Internal(InternalErrorKind::Config) => {
                write!(f, "Configuration error")?;
                if let Some(source) = &self.source {
                    write!(f, ": {source}")?;
                }
                Ok(())
            }
            DomainErrorKind::Internal(InternalErrorKind::Other(message))
            | DomainErrorKind::External(ExternalErrorKind::Other(message)) => {
                write!(f, "{message}")
            }
            DomainErrorKind::External(ExternalErrorKind::Api(api))
            | DomainErrorKind::External(ExternalErrorKind::InvalidFileFormat(api)) => {
                write!(f, "{}", api.message)
            }
            DomainErrorKind::External(ExternalErrorKind::Authentication) => {
                write!(f, "Your session has expired, please sign in again")
            }
            DomainErrorKind::External(ExternalErrorKind::SignInDenied) => {
                match self.source.as_deref().map(root_cause) {
                    Some(cause) => write!(f, "Sign-in failed: {cause}"),
                    None => write!(f, "Sign-in failed"),
                }
            }
            DomainErrorKind::External(ExternalErrorKind::NotFound) => match &self.source {
                Some(source) => write!(f, "{source}"),
                None => write!(f, "Not found"),
            },
            DomainErrorKind::External(ExternalErrorKind::Network) => match &self.source {
                Some(source) => write!(f, "Fetch failed: {source}"),
                None => write!(f, "Fetch failed"),
            },
        }
    }
}

/// Message of the innermost error in a source chain.
fn root_cause(err: &(dyn StdError + Send + Sync + 'static)) -> String {
    let mut current: &(dyn StdError + 'static) = err;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<FieldErrors> for Error {
    fn from(errors: FieldErrors) -> Self {
        Error::validation(errors)
    }
}

impl From<ApiError> for Error {
    fn from(api: ApiError) -> Self {
        let error_kind = if api.status == 401 {
            ExternalErrorKind::Authentication
        } else if api.code == INVALID_CSV_FORMAT {
            ExternalErrorKind::InvalidFileFormat(api.clone())
        } else {
            ExternalErrorKind::Api(api.clone())
        };
        Error {
            source: Some(Box::new(api)),
            error_kind: DomainErrorKind::External(error_kind),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Errors that result from issues building the request. These occur prior to any
        // network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build request".to_string(),
                )),
            }
        } else if err.is_decode() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                    "Unexpected response from the RAI service".to_string(),
                )),
            }
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(err) => err.into(),
            reqwest_middleware::Error::Middleware(err) => {
                let is_auth = err
                    .downcast_ref::<AuthError>()
                    .is_some_and(AuthError::is_authentication);
                let error_kind = if is_auth {
                    ExternalErrorKind::Authentication
                } else {
                    ExternalErrorKind::Network
                };
                Error {
                    source: Some(err.into()),
                    error_kind: DomainErrorKind::External(error_kind),
                }
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                "Unexpected response from the RAI service".to_string(),
            )),
        }
    }
}

// Translate errors from the auth layer to the domain layer.
impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        let error_kind = match &err.error_kind {
            AuthErrorKind::Validation(errors) => {
                DomainErrorKind::Internal(InternalErrorKind::Validation(errors.clone()))
            }
            AuthErrorKind::SignIn(_) => DomainErrorKind::External(ExternalErrorKind::SignInDenied),
            AuthErrorKind::Session(_) => {
                DomainErrorKind::External(ExternalErrorKind::Authentication)
            }
            AuthErrorKind::Http(HttpErrorKind::Status(401)) => {
                DomainErrorKind::External(ExternalErrorKind::Authentication)
            }
            AuthErrorKind::Http(HttpErrorKind::BuilderFailed) => {
                DomainErrorKind::Internal(InternalErrorKind::Other(err.to_string()))
            }
            AuthErrorKind::Http(_) => DomainErrorKind::External(ExternalErrorKind::Network),
            AuthErrorKind::Sso(_) => {
                DomainErrorKind::External(ExternalErrorKind::Other(err.to_string()))
            }
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}
