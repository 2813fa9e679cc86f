//! Avro binary codec
//!
//! Integers are zig-zag varints, floats are little-endian, strings and bytes
//! are length prefixed, arrays and maps are written as one block followed by
//! a zero terminator. Unions write the zero-based branch index before the
//! branch value.

mod decode;
mod encode;
mod reader;

pub use reader::{ByteReader, write_long};

use tracing::debug;

use crate::error::CodecResult;
use crate::schema::SchemaDefinition;
use crate::value::Value;

use decode::Decoder;
use encode::Encoder;

/// Encode `value` with the root schema of `definition`.
pub fn encode(definition: &SchemaDefinition, value: &Value) -> CodecResult<Vec<u8>> {
    let mut out = Vec::new();
    Encoder::new(definition).write(definition.root(), value, &mut out)?;
    Ok(out)
}

/// Decode one value from `reader`, advancing it past exactly the bytes the
/// value occupies.
pub fn decode(definition: &SchemaDefinition, reader: &mut ByteReader<'_>) -> CodecResult<Value> {
    Decoder::new(definition).read(definition.root(), reader)
}

pub fn decode_bytes(definition: &SchemaDefinition, bytes: &[u8]) -> CodecResult<Value> {
    let mut reader = ByteReader::new(bytes);
    let value = decode(definition, &mut reader)?;
    if !reader.is_empty() {
        debug!(trailing = reader.remaining(), "ignoring trailing bytes after value");
    }
    Ok(value)
}
