use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::BrokerResult;
use crate::message::{BrokerErrorCode, BrokerMessage, ProducerRecord, TopicPartition};
use crate::rebalance::{RebalanceAction, RebalanceEvent, rebalance_action};

/// How a consumed offset is committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    Sync,
    Async,
}

/// Port for a group consumer
///
/// One instance is owned by exactly one connection manager; implementations
/// need not be shareable.
pub trait ConsumerClient: Send {
    fn subscribe(&mut self, topics: &[String]) -> BrokerResult<()>;

    /// Block up to `timeout` for the next message. A poll without a message
    /// returns an error-coded [`BrokerMessage`] rather than failing.
    fn poll(&mut self, timeout: Duration) -> BrokerMessage;

    /// Commit the offset following `message`
    fn commit(&mut self, message: &BrokerMessage, mode: CommitMode) -> BrokerResult<()>;

    fn assign(&mut self, partitions: &[TopicPartition]) -> BrokerResult<()>;

    fn unassign(&mut self) -> BrokerResult<()>;

    /// Apply a rebalance notification to this consumer
    fn rebalance(&mut self, event: RebalanceEvent) -> BrokerResult<()> {
        match rebalance_action(event)? {
            RebalanceAction::Assign(partitions) => self.assign(&partitions),
            RebalanceAction::Unassign => self.unassign(),
        }
    }
}

/// Port for a producer
pub trait ProducerClient: Send {
    /// Enqueue a record for delivery
    fn send(&mut self, record: ProducerRecord) -> BrokerResult<()>;

    /// Serve delivery reports for up to `timeout`
    fn poll(&mut self, timeout: Duration);

    /// Wait up to `timeout` for outstanding deliveries. Returns the outcome
    /// as a code so callers can retry on anything but `NoError`.
    fn flush(&mut self, timeout: Duration) -> BrokerErrorCode;
}

/// Builds client handles from a flat librdkafka-style property map
pub trait ClientFactory {
    type Consumer: ConsumerClient;
    type Producer: ProducerClient;

    fn create_consumer(&self, config: &BTreeMap<String, String>) -> BrokerResult<Self::Consumer>;

    fn create_producer(&self, config: &BTreeMap<String, String>) -> BrokerResult<Self::Producer>;
}
