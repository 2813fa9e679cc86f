//! Infrastructure Layer - Concrete implementations
//!
//! - Config: JSON options resolved into settings
//! - Memory: in-process broker on crossbeam channels
//! - Kafka: librdkafka clients (feature-gated)

pub mod config;
pub mod factory;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod kafka_options;
pub mod logging;
#[cfg(feature = "memory")]
pub mod memory;
pub mod signals;

pub use config::{
    ConsumerOptions, ConsumerRoute, ProducerOptions, ProducerRoute, TransportOptions,
    resolve_settings, validate_message_types,
};
pub use factory::TransportFactory;
#[cfg(feature = "kafka")]
pub use kafka::{KafkaClientFactory, KafkaConsumer, KafkaProducer};
pub use logging::init_tracing;
#[cfg(feature = "memory")]
pub use memory::{CommittedOffset, MemoryBroker, MemoryConsumer, MemoryProducer};
pub use signals::listen_for_signals;
