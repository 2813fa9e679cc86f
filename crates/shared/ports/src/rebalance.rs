use crate::error::{BrokerError, BrokerResult};
use crate::message::TopicPartition;

/// Partition rebalance notification delivered by the group coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebalanceEvent {
    Assign(Vec<TopicPartition>),
    Revoke(Vec<TopicPartition>),
    Error(String),
}

/// What the consumer must do in response to a [`RebalanceEvent`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebalanceAction {
    Assign(Vec<TopicPartition>),
    /// Release every current assignment
    Unassign,
}

/// Assignments are taken as given, revocations drop every assignment and
/// anything else is fatal.
pub fn rebalance_action(event: RebalanceEvent) -> BrokerResult<RebalanceAction> {
    match event {
        RebalanceEvent::Assign(partitions) => Ok(RebalanceAction::Assign(partitions)),
        RebalanceEvent::Revoke(_) => Ok(RebalanceAction::Unassign),
        RebalanceEvent::Error(message) => Err(BrokerError::Rebalance(message)),
    }
}
