//! The transport facade

use std::sync::Arc;

use courier_ports::ClientFactory;
use courier_schema_registry::SchemaCodecManager;
use parking_lot::Mutex;

use super::connection::ConnectionManager;
use super::envelope::Envelope;
use super::error::Result;
use super::receiver::KafkaReceiver;
use super::sender::KafkaSender;
use super::serializer::EnvelopeSerializer;
use super::traits::{MessageReceiver, MessageSender, MetadataHook};
use crate::domain::{GeneralSetting, ShutdownToken};

/// Sender and receiver sharing one connection.
///
/// Sends and receives are serialized on the connection lock.
pub struct KafkaTransport<F: ClientFactory> {
    setting: Arc<GeneralSetting>,
    shutdown: ShutdownToken,
    connection: Arc<Mutex<ConnectionManager<F>>>,
    sender: KafkaSender<F>,
    receiver: KafkaReceiver<F>,
}

impl<F: ClientFactory> KafkaTransport<F> {
    /// `sender_schema`/`receiver_schema` enable registry encoding per role
    pub fn new(
        connection: ConnectionManager<F>,
        serializer: Arc<dyn EnvelopeSerializer>,
        sender_schema: Option<SchemaCodecManager>,
        receiver_schema: Option<SchemaCodecManager>,
    ) -> Self {
        let setting = connection.shared_setting();
        let shutdown = connection.shutdown_token().clone();
        let connection = Arc::new(Mutex::new(connection));
        Self {
            setting,
            shutdown,
            sender: KafkaSender::new(Arc::clone(&connection), Arc::clone(&serializer), sender_schema),
            receiver: KafkaReceiver::new(Arc::clone(&connection), serializer, receiver_schema),
            connection,
        }
    }

    pub fn with_metadata_hook(mut self, hook: Arc<dyn MetadataHook>) -> Self {
        self.sender = self.sender.with_metadata_hook(hook);
        self
    }

    pub fn setting(&self) -> &GeneralSetting {
        &self.setting
    }

    pub fn name(&self) -> &str {
        &self.setting.transport_name
    }

    pub fn shutdown_token(&self) -> &ShutdownToken {
        &self.shutdown
    }

    /// Stop consuming. Takes effect at the next poll boundary and is final.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Wait for outstanding deliveries
    pub fn flush(&self) -> Result<()> {
        self.connection.lock().flush()
    }
}

impl<F> MessageSender for KafkaTransport<F>
where
    F: ClientFactory + Send,
{
    fn send(&self, envelope: Envelope) -> Result<Envelope> {
        self.sender.send(envelope)
    }
}

impl<F> MessageReceiver for KafkaTransport<F>
where
    F: ClientFactory + Send,
{
    fn get_from_queues(&self, queues: &[String]) -> Result<Option<Envelope>> {
        self.receiver.get_from_queues(queues)
    }

    fn ack(&self, envelope: &Envelope) -> Result<()> {
        self.receiver.ack(envelope)
    }

    fn reject(&self, envelope: &Envelope) -> Result<()> {
        self.receiver.reject(envelope)
    }
}
