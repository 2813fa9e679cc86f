//! Registry adapters

pub mod http_client;
pub mod memory;

pub use http_client::{HttpError, HttpSchemaRegistry};
pub use memory::InMemorySchemaRegistry;
