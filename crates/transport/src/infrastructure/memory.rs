//! In-Memory Broker
//!
//! In-process stand-in for a Kafka cluster, built on crossbeam bounded
//! channels. Every topic is a single partition channel shared by all
//! consumers, so consumers compete for messages the way members of one
//! consumer group do. Produced messages are staged until the producer is
//! polled or flushed, and commits are recorded for inspection.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use courier_ports::{
    BrokerError, BrokerErrorCode, BrokerMessage, BrokerResult, ClientFactory, CommitMode,
    ConsumerClient, ProducerClient, ProducerRecord, RebalanceEvent, TopicPartition,
};
use crossbeam_channel::{Receiver, Select, Sender, TrySendError, bounded};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// librdkafka's generic failure code
const FAIL: BrokerErrorCode = BrokerErrorCode::Other(-196);

const DEFAULT_CAPACITY: usize = 10_000;

/// An offset commit seen by the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedOffset {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub mode: CommitMode,
}

struct TopicQueue {
    tx: Sender<BrokerMessage>,
    rx: Receiver<BrokerMessage>,
    next_offset: i64,
}

struct BrokerState {
    capacity: usize,
    topics: Mutex<HashMap<String, TopicQueue>>,
    commits: Mutex<Vec<CommittedOffset>>,
    rebalances: Mutex<VecDeque<RebalanceEvent>>,
}

/// Handle to an in-memory cluster. Clones share the same cluster.
#[derive(Clone)]
pub struct MemoryBroker {
    state: Arc<BrokerState>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// `capacity` bounds the number of undelivered messages per topic
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Arc::new(BrokerState {
                capacity,
                topics: Mutex::new(HashMap::new()),
                commits: Mutex::new(Vec::new()),
                rebalances: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Append `message` to `topic` as if a producer had delivered it.
    /// Topic, partition and offset of `message` are overwritten.
    pub fn inject(&self, topic: &str, message: BrokerMessage) -> BrokerResult<i64> {
        let mut topics = self.state.topics.lock();
        let queue = self.queue(&mut topics, topic);

        let offset = queue.next_offset;
        let message = BrokerMessage {
            topic: topic.to_string(),
            partition: 0,
            offset,
            ..message
        };
        match queue.tx.try_send(message) {
            Ok(()) => {
                queue.next_offset += 1;
                Ok(offset)
            }
            Err(TrySendError::Full(_)) => Err(BrokerError::broker(
                BrokerErrorCode::Other(-184),
                format!("queue of topic {topic} is full"),
            )),
            Err(TrySendError::Disconnected(_)) => Err(BrokerError::broker(
                BrokerErrorCode::Transport,
                format!("topic {topic} is closed"),
            )),
        }
    }

    /// Messages waiting in `topic`
    pub fn pending(&self, topic: &str) -> usize {
        self.state
            .topics
            .lock()
            .get(topic)
            .map_or(0, |queue| queue.rx.len())
    }

    pub fn commits(&self) -> Vec<CommittedOffset> {
        self.state.commits.lock().clone()
    }

    /// Deliver `event` to the next consumer that polls
    pub fn trigger_rebalance(&self, event: RebalanceEvent) {
        self.state.rebalances.lock().push_back(event);
    }

    fn receiver(&self, topic: &str) -> Receiver<BrokerMessage> {
        let mut topics = self.state.topics.lock();
        self.queue(&mut topics, topic).rx.clone()
    }

    fn queue<'a>(
        &self,
        topics: &'a mut HashMap<String, TopicQueue>,
        topic: &str,
    ) -> &'a mut TopicQueue {
        topics.entry(topic.to_string()).or_insert_with(|| {
            let (tx, rx) = bounded(self.state.capacity);
            TopicQueue {
                tx,
                rx,
                next_offset: 0,
            }
        })
    }
}

impl ClientFactory for MemoryBroker {
    type Consumer = MemoryConsumer;
    type Producer = MemoryProducer;

    fn create_consumer(&self, config: &BTreeMap<String, String>) -> BrokerResult<MemoryConsumer> {
        if !config.contains_key("group.id") {
            return Err(BrokerError::Configuration(
                "\"group.id\" must be configured".to_string(),
            ));
        }
        Ok(MemoryConsumer {
            broker: self.clone(),
            subscriptions: Vec::new(),
            assignment: Vec::new(),
        })
    }

    fn create_producer(&self, _config: &BTreeMap<String, String>) -> BrokerResult<MemoryProducer> {
        Ok(MemoryProducer {
            broker: self.clone(),
            staged: VecDeque::new(),
        })
    }
}

pub struct MemoryConsumer {
    broker: MemoryBroker,
    subscriptions: Vec<(String, Receiver<BrokerMessage>)>,
    assignment: Vec<TopicPartition>,
}

impl MemoryConsumer {
    pub fn assignment(&self) -> &[TopicPartition] {
        &self.assignment
    }

    fn is_assigned(&self, topic: &str) -> bool {
        self.assignment.iter().any(|tp| tp.topic == topic)
    }
}

impl ConsumerClient for MemoryConsumer {
    fn subscribe(&mut self, topics: &[String]) -> BrokerResult<()> {
        self.subscriptions = topics
            .iter()
            .map(|topic| (topic.clone(), self.broker.receiver(topic)))
            .collect();

        // a lone group member gets every partition right away
        let partitions = topics.iter().map(|topic| TopicPartition::new(topic, 0)).collect();
        self.rebalance(RebalanceEvent::Assign(partitions))
    }

    fn poll(&mut self, timeout: Duration) -> BrokerMessage {
        let event = self.broker.state.rebalances.lock().pop_front();
        if let Some(event) = event
            && let Err(err) = self.rebalance(event)
        {
            return BrokerMessage::error(FAIL, err.to_string());
        }

        let active: Vec<&Receiver<BrokerMessage>> = self
            .subscriptions
            .iter()
            .filter(|(topic, _)| self.is_assigned(topic))
            .map(|(_, rx)| rx)
            .collect();
        if active.is_empty() {
            std::thread::sleep(timeout);
            return BrokerMessage::error(BrokerErrorCode::TimedOut, "no partitions assigned");
        }

        let mut select = Select::new();
        for rx in &active {
            select.recv(rx);
        }
        match select.select_timeout(timeout) {
            Ok(operation) => {
                let index = operation.index();
                match operation.recv(active[index]) {
                    Ok(message) => message,
                    Err(_) => BrokerMessage::error(BrokerErrorCode::Transport, "topic closed"),
                }
            }
            Err(_) => BrokerMessage::error(BrokerErrorCode::TimedOut, "poll timed out"),
        }
    }

    fn commit(&mut self, message: &BrokerMessage, mode: CommitMode) -> BrokerResult<()> {
        self.broker.state.commits.lock().push(CommittedOffset {
            topic: message.topic.clone(),
            partition: message.partition,
            offset: message.offset,
            mode,
        });
        Ok(())
    }

    fn assign(&mut self, partitions: &[TopicPartition]) -> BrokerResult<()> {
        info!(partitions = ?partitions, "partitions assigned");
        self.assignment = partitions.to_vec();
        Ok(())
    }

    fn unassign(&mut self) -> BrokerResult<()> {
        info!(partitions = ?self.assignment, "partitions revoked");
        self.assignment.clear();
        Ok(())
    }
}

pub struct MemoryProducer {
    broker: MemoryBroker,
    staged: VecDeque<ProducerRecord>,
}

impl MemoryProducer {
    /// Move staged records into their topics, stopping at the first full one
    fn deliver(&mut self) -> BrokerErrorCode {
        while let Some(record) = self.staged.pop_front() {
            let mut message = BrokerMessage::new(&record.topic, record.partition.unwrap_or(0), 0);
            message.key = record.key.clone();
            message.payload = record.payload.clone();
            message.headers = record.headers.clone();

            if let Err(err) = self.broker.inject(&record.topic, message) {
                warn!(topic = %record.topic, error = %err, "delivery failed");
                let code = err.code().unwrap_or(FAIL);
                self.staged.push_front(record);
                return code;
            }
            debug!(topic = %record.topic, "record delivered");
        }
        BrokerErrorCode::NoError
    }
}

impl ProducerClient for MemoryProducer {
    fn send(&mut self, record: ProducerRecord) -> BrokerResult<()> {
        self.staged.push_back(record);
        Ok(())
    }

    fn poll(&mut self, _timeout: Duration) {
        self.deliver();
    }

    fn flush(&mut self, _timeout: Duration) -> BrokerErrorCode {
        self.deliver()
    }
}
