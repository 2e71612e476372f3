//! Data services of the RAI dashboard console.
//!
//! Each service is a trait with a REST implementation backed by [`api_client::ApiClient`] and a
//! seeded in-memory implementation for offline use. [`services::Services`] picks one per
//! configuration. Entity types are re-exported so the console does not depend on `entity`
//! directly.

pub use entity::{
    environments, page, rai_dimensions, risk_group, test_set_status, test_sets, users,
    workspaces, Id, Page,
};

pub mod api_client;
pub mod environment;
pub mod error;
pub mod listing;
pub mod mock_data;
pub mod services;
pub mod test_set;
pub mod workspace;

#[cfg(test)]
mod test_support;
