//! Kafka Message Transport
//!
//! Sends and receives application messages over Kafka topics. Bodies are
//! serialized as JSON (or bincode) and, when schema validation is enabled,
//! re-encoded as registry framed Avro on the way out and decoded back on the
//! way in.
//!
//! - **Memory** (default): in-process broker via crossbeam channels
//! - **Kafka**: librdkafka clients (feature-gated)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Application Layer                     │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────┐  │
//! │  │ KafkaSender │  │KafkaReceiver│  │    Envelope     │  │
//! │  │             │  │             │  │  + serializer   │  │
//! │  └──────┬──────┘  └──────┬──────┘  └─────────────────┘  │
//! │         └───── ConnectionManager (lazy clients) ─────   │
//! └─────────────────────────────────────────────────────────┘
//!                            │  courier_ports
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Infrastructure Layer                    │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────┐  │
//! │  │   Memory    │  │   Kafka     │  │ Config/Factory  │  │
//! │  │ (crossbeam) │  │  (feature)  │  │     (JSON)      │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_transport::{Envelope, MemoryBroker, MessageReceiver, MessageSender, TransportFactory};
//!
//! let factory = TransportFactory::memory(MemoryBroker::new());
//! let transport = factory.create_transport("kafka://localhost:9092", &options, types)?;
//!
//! transport.send(Envelope::new(OrderCreated { order_id: "o-1".into() }))?;
//! if let Some(envelope) = transport.get()? {
//!     transport.ack(&envelope)?;
//! }
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export application layer types
pub use application::{
    AnyMessage, ConfigError, ConnectionManager, Envelope, EnvelopeSerializer, KafkaTransport,
    Message, MessageReceiver, MessageSender, MessageStamp, MessageTypes, MetadataHook, Result,
    TransportError,
};

// Re-export domain types
pub use domain::{ConsumeState, GeneralSetting, SerializerKind, ShutdownToken};

// Re-export infrastructure layer types
pub use infrastructure::{TransportFactory, init_tracing, listen_for_signals};

#[cfg(feature = "memory")]
pub use infrastructure::MemoryBroker;

#[cfg(feature = "kafka")]
pub use infrastructure::KafkaClientFactory;
