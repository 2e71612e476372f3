//! Session lifecycle: sign-in, token freshness, single-flight refresh and sign-out.

mod manager;
mod state;
mod token;

pub use manager::{SessionManager, SessionSettings};
pub use state::SessionState;
pub use token::SessionToken;
