//! Data model shared by the auth, domain and console layers.
//!
//! Every record is owned by the RAI backend; these types only describe what
//! travels over the wire and what the console keeps transiently.

pub mod environments;
pub mod page;
pub mod rai_dimensions;
pub mod risk_group;
pub mod test_set_status;
pub mod test_sets;
pub mod users;
pub mod workspaces;

pub use page::Page;

/// A type alias that represents any record's id field data type.
/// The backend issues opaque string identifiers (e.g. `"001"`, `"TC-0001"`).
pub type Id = String;
