use std::sync::Arc;

use courier_avro::{SchemaDefinition, Value, decode_bytes, encode};
use tracing::debug;

use crate::domain::{RegisteredSchema, SchemaRegistry, Subject, WireEnvelope};
use crate::error::{RegistryError, SchemaCodecError};

/// Encodes application bodies into registry framed Avro and back.
///
/// Schemas are looked up per call: by the value subject of the destination
/// topic when encoding, by the embedded schema id when decoding.
#[derive(Clone)]
pub struct SchemaCodecManager {
    registry: Arc<dyn SchemaRegistry>,
}

impl SchemaCodecManager {
    pub fn new(registry: Arc<dyn SchemaRegistry>) -> Self {
        Self { registry }
    }

    /// Encode `body` with the schema of `<topic>-value`, latest version unless
    /// `version` pins one. For union schemas `type_name` selects the branch.
    pub fn encode(
        &self,
        body: Value,
        topic: &str,
        type_name: Option<&str>,
        version: Option<u32>,
    ) -> Result<Vec<u8>, SchemaCodecError> {
        let schema = self
            .registry
            .get_subject_schema(&Subject::of_value(topic), version)?;
        debug!(
            topic,
            schema_id = schema.id,
            version = schema.version,
            "encoding with registry schema"
        );
        self.encode_with(&schema, body, type_name)
    }

    /// Encode against an already resolved schema
    pub fn encode_with(
        &self,
        schema: &RegisteredSchema,
        body: Value,
        type_name: Option<&str>,
    ) -> Result<Vec<u8>, SchemaCodecError> {
        let value = match type_name {
            Some(name) if schema.is_union() && !matches!(body, Value::Selected(_)) => {
                Value::selected(name, body)
            }
            _ => body,
        };

        let payload = encode(&schema.definition, &value)?;
        Ok(WireEnvelope::new(schema.id, payload).to_bytes())
    }

    /// Decode a registry framed payload. Absent or empty payloads (tombstones)
    /// decode to `None`.
    pub fn decode(&self, payload: Option<&[u8]>) -> Result<Option<Value>, SchemaCodecError> {
        let Some(bytes) = payload.filter(|bytes| !bytes.is_empty()) else {
            return Ok(None);
        };

        let envelope = WireEnvelope::from_bytes(bytes)?;
        let schema = self.registry.get_schema(envelope.schema_id)?;
        let definition = SchemaDefinition::parse(&schema).map_err(RegistryError::from)?;
        debug!(schema_id = envelope.schema_id, "decoding with registry schema");

        Ok(Some(decode_bytes(&definition, &envelope.payload)?))
    }

    /// Decode against an already resolved schema
    pub fn decode_with(
        &self,
        bytes: &[u8],
        schema: &RegisteredSchema,
    ) -> Result<Value, SchemaCodecError> {
        let envelope = WireEnvelope::from_bytes(bytes)?;
        Ok(decode_bytes(&schema.definition, &envelope.payload)?)
    }
}
