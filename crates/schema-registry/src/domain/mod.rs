//! Registry domain: subjects, registered schemas, wire framing and the
//! registry port.

mod error_code;
mod registry;
mod schema;
mod subject;
mod wire;

pub use error_code::RegistryErrorCode;
pub use registry::SchemaRegistry;
pub use schema::RegisteredSchema;
pub use subject::Subject;
pub use wire::{MAGIC_BYTE, WireEnvelope};
