//! HTTP clients for the RAI backend.
//!
//! Requests are never retried automatically; a failed call surfaces to the caller as is.

mod client;
mod middleware;

pub use client::{ClientBuilder, HttpClientConfig, SessionClient};
pub use middleware::SessionAuthMiddleware;
