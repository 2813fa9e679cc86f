//! Courier Schema Registry
//!
//! Talks to a Confluent-compatible schema registry and frames Avro payloads
//! the way registry-aware Kafka clients expect them.
//!
//! ```text
//!   body ──▶ SchemaCodecManager::encode(topic)
//!              │  GET /subjects/<topic>-value/versions/latest
//!              ▼
//!            courier_avro::encode ──▶ [0x00][schema id u32 BE][avro bytes]
//!
//!   [0x00][schema id][avro bytes] ──▶ SchemaCodecManager::decode
//!              │  GET /schemas/ids/<id>
//!              ▼
//!            courier_avro::decode ──▶ Value
//! ```
//!
//! Lookups are never cached: every encode and decode asks the registry.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::SchemaCodecManager;
pub use config::RegistryConfig;
pub use domain::{RegisteredSchema, RegistryErrorCode, SchemaRegistry, Subject, WireEnvelope};
pub use error::{RegistryError, RegistryResult, SchemaCodecError, WireError};
pub use infrastructure::{HttpSchemaRegistry, InMemorySchemaRegistry};
