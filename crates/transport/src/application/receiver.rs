//! Inbound half of the transport

use std::sync::Arc;

use courier_avro::Value;
use courier_ports::{BrokerMessage, ClientFactory};
use courier_schema_registry::SchemaCodecManager;
use parking_lot::Mutex;
use serde_json::Value as Json;
use tracing::debug;

use super::connection::ConnectionManager;
use super::envelope::Envelope;
use super::error::{ConfigError, Result, TransportError};
use super::serializer::{EncodedEnvelope, EnvelopeSerializer};
use super::traits::MessageReceiver;

/// Pulls messages from the shared connection and turns them into envelopes.
///
/// With a schema manager, payloads are registry framed Avro: they are
/// decoded to JSON before the serializer sees them. Absent payloads
/// (tombstones) reach the serializer as JSON `null`.
pub struct KafkaReceiver<F: ClientFactory> {
    connection: Arc<Mutex<ConnectionManager<F>>>,
    serializer: Arc<dyn EnvelopeSerializer>,
    schema: Option<SchemaCodecManager>,
}

impl<F: ClientFactory> KafkaReceiver<F> {
    pub fn new(
        connection: Arc<Mutex<ConnectionManager<F>>>,
        serializer: Arc<dyn EnvelopeSerializer>,
        schema: Option<SchemaCodecManager>,
    ) -> Self {
        Self {
            connection,
            serializer,
            schema,
        }
    }

    fn envelope(&self, message: BrokerMessage) -> Result<Envelope> {
        let body = match &self.schema {
            Some(schema) => {
                if !self.serializer.supports_schema_registry() {
                    return Err(ConfigError::IncompatibleSerializer(self.serializer.name()).into());
                }
                let value = schema.decode(message.payload.as_deref())?;
                serde_json::to_vec(&value.map_or(Json::Null, Value::into_json))?
            }
            None => message.payload.clone().unwrap_or_default(),
        };

        let envelope = self.serializer.decode(EncodedEnvelope {
            body,
            headers: message.headers.clone(),
        })?;
        debug!(
            topic = %message.topic,
            partition = message.partition,
            offset = message.offset,
            "message received"
        );
        Ok(envelope.with_received(message))
    }
}

impl<F> MessageReceiver for KafkaReceiver<F>
where
    F: ClientFactory + Send,
{
    fn get_from_queues(&self, queues: &[String]) -> Result<Option<Envelope>> {
        let message = {
            let mut connection = self.connection.lock();
            let mut messages = connection.get(queues)?;
            match messages.next() {
                Some(Ok(Some(message))) => message,
                Some(Ok(None)) | None => return Ok(None),
                Some(Err(err)) => return Err(err),
            }
        };

        self.envelope(message).map(Some)
    }

    fn ack(&self, envelope: &Envelope) -> Result<()> {
        let message = envelope.received().ok_or(TransportError::NotReceived)?;
        self.connection.lock().ack(message)
    }
}
