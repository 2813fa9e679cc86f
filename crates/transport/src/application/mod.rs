//! Application Layer
//!
//! Connection lifecycle, envelopes, serializers and the send/receive
//! contract.

pub mod connection;
pub mod envelope;
pub mod error;
pub mod message;
pub mod receiver;
pub mod sender;
pub mod serializer;
pub mod traits;
pub mod transport;

pub use connection::{BodyTransform, ConnectionManager, FLUSH_ATTEMPTS, Messages, OutboundMessage};
pub use envelope::{Envelope, MessageStamp, Stamps};
pub use error::{ConfigError, Result, TransportError};
pub use message::{AnyMessage, Message, MessageTypes};
pub use receiver::KafkaReceiver;
pub use sender::KafkaSender;
pub use serializer::{
    BincodeMessageSerializer, EncodedEnvelope, EnvelopeSerializer, JsonMessageSerializer,
    envelope_serializer,
};
pub use traits::{BoxReceiver, BoxSender, MessageReceiver, MessageSender, MetadataHook};
pub use transport::KafkaTransport;
