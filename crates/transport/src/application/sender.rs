//! Outbound half of the transport

use std::sync::Arc;

use courier_avro::Value;
use courier_ports::{ClientFactory, IDENTIFIER_HEADER};
use courier_schema_registry::SchemaCodecManager;
use parking_lot::Mutex;
use tracing::debug;

use super::connection::{ConnectionManager, OutboundMessage};
use super::envelope::Envelope;
use super::error::{ConfigError, Result, TransportError};
use super::serializer::EnvelopeSerializer;
use super::traits::{MessageSender, MetadataHook};

/// Serializes envelopes and produces them through the shared connection.
///
/// With a schema manager the serialized JSON body is re-encoded per
/// destination topic with the latest (or stamped) schema of the topic's
/// value subject, selecting the union branch named after the identifier.
pub struct KafkaSender<F: ClientFactory> {
    connection: Arc<Mutex<ConnectionManager<F>>>,
    serializer: Arc<dyn EnvelopeSerializer>,
    schema: Option<SchemaCodecManager>,
    metadata: Option<Arc<dyn MetadataHook>>,
}

impl<F: ClientFactory> KafkaSender<F> {
    pub fn new(
        connection: Arc<Mutex<ConnectionManager<F>>>,
        serializer: Arc<dyn EnvelopeSerializer>,
        schema: Option<SchemaCodecManager>,
    ) -> Self {
        Self {
            connection,
            serializer,
            schema,
            metadata: None,
        }
    }

    pub fn with_metadata_hook(mut self, hook: Arc<dyn MetadataHook>) -> Self {
        self.metadata = Some(hook);
        self
    }

    fn produce(&self, outbound: OutboundMessage, version: Option<u32>) -> Result<()> {
        let mut connection = self.connection.lock();
        let Some(schema) = &self.schema else {
            return connection.produce(outbound, None);
        };

        let body = Value::from_json(serde_json::from_slice(&outbound.body)?);
        let identifier = outbound.identifier.clone();
        let mut transform = |topic: &str| -> Result<Vec<u8>> {
            Ok(schema.encode(body.clone(), topic, identifier.as_deref(), version)?)
        };
        connection.produce(outbound, Some(&mut transform))
    }
}

impl<F> MessageSender for KafkaSender<F>
where
    F: ClientFactory + Send,
{
    fn send(&self, envelope: Envelope) -> Result<Envelope> {
        let envelope = match &self.metadata {
            Some(hook) => hook.add_metadata(envelope),
            None => envelope,
        };

        let encoded = self.serializer.encode(&envelope)?;
        if self.schema.is_some() && !self.serializer.supports_schema_registry() {
            return Err(ConfigError::IncompatibleSerializer(self.serializer.name()).into());
        }

        let identifier = encoded
            .headers
            .get(IDENTIFIER_HEADER)
            .cloned()
            .ok_or(TransportError::MissingIdentifier)?;

        let outbound = OutboundMessage {
            partition: envelope.partition(),
            flags: envelope.flags(),
            body: encoded.body,
            key: envelope.key().map(str::to_string),
            headers: encoded.headers,
            force_flush: envelope.force_flush(),
            identifier: Some(identifier.clone()),
        };

        self.produce(outbound, envelope.stamps().version)
            .map_err(|err| TransportError::Send(Box::new(err)))?;
        debug!(identifier = %identifier, "message sent");

        Ok(envelope.with_identifier(identifier))
    }
}
