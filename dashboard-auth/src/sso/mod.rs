//! Enterprise single sign-on via Azure AD.
//!
//! The console sends the user to the authorization URL, receives a code on the redirect URI,
//! exchanges it for an Azure access token and hands that token to
//! [`SessionManager::sign_in_with_identity_provider`](crate::session::SessionManager::sign_in_with_identity_provider).

mod azure;
mod pending;
pub mod pkce;

pub use azure::{AuthorizationRequest, AzureAdConfig, AzureAdProvider, Callback};
pub use pending::PendingSignIns;
