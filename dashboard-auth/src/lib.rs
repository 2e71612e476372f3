//! # dashboard-auth
//!
//! Everything the console needs to hold an authenticated session against the RAI backend:
//! - Sign-in handlers for username/password and enterprise SSO
//! - The session state machine (`Unauthenticated`, `Authenticated`, `Refreshing`, `Expired`)
//!   with a single-flight token refresh
//! - The auth gateway seam with REST and in-memory implementations
//! - HTTP client building and the bearer middleware that attaches session tokens
//! - The Azure AD authorization code flow with PKCE
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dashboard_auth::{
//!     credentials::Credentials,
//!     gateway::MockGateway,
//!     session::{SessionManager, SessionSettings},
//! };
//!
//! let session = SessionManager::new(Arc::new(MockGateway::new()), SessionSettings::default());
//! session.sign_in_with_credentials(&Credentials::new("alice", "secret")).await?;
//! let token = session.current_token().await?;
//! ```

pub mod credentials;
pub mod endpoints;
pub mod error;
pub mod gateway;
pub mod http;
pub mod session;
pub mod sign_in;
pub mod sso;

pub use error::{Error, ErrorKind};
