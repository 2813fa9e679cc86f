//! Courier Avro
//!
//! The subset of Avro needed to move schema-registry framed payloads:
//! primitive, fixed, record, enum, array, map and union schemas, a dynamic
//! [`Value`] model, and a binary codec.
//!
//! The codec follows the standard Avro binary encoding with one extension:
//! a value wrapped in a [`UnionSelector`] picks its union branch by name
//! instead of by structural matching.
//!
//! ```text
//!   JSON schema ──parse──▶ SchemaDefinition ─┐
//!                                            ├─▶ encode ─▶ bytes
//!   Value / UnionSelector ───────────────────┘
//!
//!   bytes ─▶ ByteReader ─▶ decode(SchemaDefinition) ─▶ Value
//! ```
//!
//! This crate contains no I/O and is fully unit testable.

pub mod codec;
pub mod error;
pub mod schema;
pub mod validate;
pub mod value;

pub use codec::{ByteReader, decode, decode_bytes, encode};
pub use error::{CodecError, CodecResult};
pub use schema::{
    EnumSchema, FixedSchema, Name, Primitive, RecordField, RecordSchema, Schema, SchemaDefinition,
    UnionSchema,
};
pub use validate::is_valid;
pub use value::{UnionSelector, Value};
