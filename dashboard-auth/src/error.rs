//! Error types for the `dashboard-auth` crate.
//!
//! Same shape as `domain::error`: a root `Error` struct carrying an error kind tree and an
//! optional source for chaining.

use std::error::Error as StdError;
use std::fmt;

use crate::credentials::FieldErrors;

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// Input rejected locally before anything was sent.
    Validation(FieldErrors),
    SignIn(SignInErrorKind),
    Session(SessionErrorKind),
    Sso(SsoErrorKind),
    Http(HttpErrorKind),
}

/// Errors from the sign-in handlers. Every failure collapses into `Denied` at the
/// session boundary; the underlying cause stays in `source`.
#[derive(Debug, PartialEq)]
pub enum SignInErrorKind {
    Denied,
    MissingAccessToken,
}

#[derive(Debug, PartialEq)]
pub enum SessionErrorKind {
    NotSignedIn,
    Expired,
    RefreshFailed,
}

#[derive(Debug, PartialEq)]
pub enum SsoErrorKind {
    NotConfigured,
    InvalidState,
    TokenExchangeFailed,
    InvalidResponse,
}

#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Network,
    /// Non-success status from the backend.
    Status(u16),
}

impl Error {
    /// True when the caller no longer holds a usable session and must sign in again.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self.error_kind,
            ErrorKind::Session(_) | ErrorKind::SignIn(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Validation(errors) => write!(f, "Validation error: {errors}"),
            ErrorKind::SignIn(kind) => write!(f, "Sign-in error: {:?}", kind),
            ErrorKind::Session(kind) => write!(f, "Session error: {:?}", kind),
            ErrorKind::Sso(kind) => match &self.source {
                Some(source) => write!(f, "SSO error: {:?}: {}", kind, source),
                None => write!(f, "SSO error: {:?}", kind),
            },
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if let Some(status) = err.status() {
            ErrorKind::Http(HttpErrorKind::Status(status.as_u16()))
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<FieldErrors> for Error {
    fn from(errors: FieldErrors) -> Self {
        Error {
            source: None,
            error_kind: ErrorKind::Validation(errors),
        }
    }
}

pub fn sign_in_error(kind: SignInErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::SignIn(kind),
    }
}

pub fn session_error(kind: SessionErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Session(kind),
    }
}

pub fn sso_error(kind: SsoErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Sso(kind),
    }
}

pub fn status_error(status: u16, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Http(HttpErrorKind::Status(status)),
    }
}

/// Wraps any failure as a denied sign-in, keeping the cause as the source.
pub fn denied(cause: Error) -> Error {
    Error {
        source: Some(Box::new(cause)),
        error_kind: ErrorKind::SignIn(SignInErrorKind::Denied),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_errors_are_authentication_errors() {
        assert!(session_error(SessionErrorKind::Expired, "expired").is_authentication());
        assert!(!status_error(500, "boom").is_authentication());
    }

    #[test]
    fn test_denied_keeps_cause() {
        let err = denied(status_error(401, "Invalid credentials"));
        assert_eq!(err.error_kind, ErrorKind::SignIn(SignInErrorKind::Denied));
        let cause = err.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(cause.contains("401"));
    }
}
