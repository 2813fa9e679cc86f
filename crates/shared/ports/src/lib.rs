//! Courier Ports
//!
//! Port definitions (traits) for the Courier transport.
//! These define the boundary between the connection lifecycle and the
//! broker client library that actually speaks the Kafka protocol.

mod client;
mod error;
mod message;
mod rebalance;

pub use client::{ClientFactory, CommitMode, ConsumerClient, ProducerClient};
pub use error::{BrokerError, BrokerResult};
pub use message::{
    BrokerErrorCode, BrokerMessage, CUSTOM_ATTR_HEADER, Headers, IDENTIFIER_HEADER,
    ProducerRecord, TopicPartition,
};
pub use rebalance::{RebalanceAction, RebalanceEvent, rebalance_action};
