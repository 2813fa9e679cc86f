//! Transport Traits
//!
//! The send/receive contract exposed to the host application.

use super::envelope::Envelope;
use super::error::Result;

/// Sends envelopes to the broker.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait MessageSender: Send + Sync {
    /// Send `envelope`, returning it with any stamps added while sending
    fn send(&self, envelope: Envelope) -> Result<Envelope>;
}

/// Receives envelopes from the broker
pub trait MessageReceiver: Send + Sync {
    /// Receive from the configured consumer topics.
    ///
    /// `Ok(None)` when the poll found nothing deliverable or the consumer
    /// has been stopped.
    fn get(&self) -> Result<Option<Envelope>> {
        self.get_from_queues(&[])
    }

    /// Receive from `queues`. Only honoured by the call that subscribes.
    fn get_from_queues(&self, queues: &[String]) -> Result<Option<Envelope>>;

    /// Acknowledge a received envelope
    fn ack(&self, envelope: &Envelope) -> Result<()>;

    /// Reject a received envelope. Nothing is redelivered: the offset moves
    /// forward exactly as with [`MessageReceiver::ack`].
    fn reject(&self, envelope: &Envelope) -> Result<()> {
        self.ack(envelope)
    }
}

/// Enriches outbound envelopes before they are serialized
pub trait MetadataHook: Send + Sync {
    fn add_metadata(&self, envelope: Envelope) -> Envelope;
}

/// Boxed sender type for dynamic dispatch
pub type BoxSender = Box<dyn MessageSender>;

/// Boxed receiver type for dynamic dispatch
pub type BoxReceiver = Box<dyn MessageReceiver>;
