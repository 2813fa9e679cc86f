use std::collections::BTreeMap;
use std::fmt;

/// Header carrying the routing identifier of a message
pub const IDENTIFIER_HEADER: &str = "X-courier-identifier";

/// Header carrying a JSON list of application header keys
pub const CUSTOM_ATTR_HEADER: &str = "X-courier-custom-attr";

pub type Headers = BTreeMap<String, String>;

/// Broker-side status of a polled message.
///
/// Raw values follow librdkafka's `rd_kafka_resp_err_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrokerErrorCode {
    NoError,
    TimedOut,
    Transport,
    UnknownTopicOrPartition,
    PartitionEof,
    AssignPartitions,
    RevokePartitions,
    Other(i32),
}

impl BrokerErrorCode {
    pub fn from_raw(code: i32) -> Self {
        match code {
            0 => BrokerErrorCode::NoError,
            -185 => BrokerErrorCode::TimedOut,
            -195 => BrokerErrorCode::Transport,
            3 => BrokerErrorCode::UnknownTopicOrPartition,
            -191 => BrokerErrorCode::PartitionEof,
            -175 => BrokerErrorCode::AssignPartitions,
            -174 => BrokerErrorCode::RevokePartitions,
            other => BrokerErrorCode::Other(other),
        }
    }

    pub fn raw(&self) -> i32 {
        match self {
            BrokerErrorCode::NoError => 0,
            BrokerErrorCode::TimedOut => -185,
            BrokerErrorCode::Transport => -195,
            BrokerErrorCode::UnknownTopicOrPartition => 3,
            BrokerErrorCode::PartitionEof => -191,
            BrokerErrorCode::AssignPartitions => -175,
            BrokerErrorCode::RevokePartitions => -174,
            BrokerErrorCode::Other(code) => *code,
        }
    }

    /// Conditions a consume loop skips over without failing
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BrokerErrorCode::TimedOut
                | BrokerErrorCode::Transport
                | BrokerErrorCode::UnknownTopicOrPartition
                | BrokerErrorCode::PartitionEof
        )
    }
}

impl fmt::Display for BrokerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BrokerErrorCode::NoError => "no error",
            BrokerErrorCode::TimedOut => "timed out",
            BrokerErrorCode::Transport => "transport",
            BrokerErrorCode::UnknownTopicOrPartition => "unknown topic or partition",
            BrokerErrorCode::PartitionEof => "partition eof",
            BrokerErrorCode::AssignPartitions => "assign partitions",
            BrokerErrorCode::RevokePartitions => "revoke partitions",
            BrokerErrorCode::Other(_) => "other",
        };
        write!(f, "{} ({})", self.raw(), name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: i32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

/// A message (or poll status) returned by a consumer.
///
/// Polls that yield no message are represented by a message whose `err`
/// is not [`BrokerErrorCode::NoError`], mirroring librdkafka's event model.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerMessage {
    pub err: BrokerErrorCode,
    pub error_message: Option<String>,
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
    pub payload: Option<Vec<u8>>,
    pub headers: Headers,
    pub timestamp_ms: Option<i64>,
}

impl BrokerMessage {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            err: BrokerErrorCode::NoError,
            error_message: None,
            topic: topic.into(),
            partition,
            offset,
            key: None,
            payload: None,
            headers: Headers::new(),
            timestamp_ms: None,
        }
    }

    /// A poll result carrying only an error code
    pub fn error(err: BrokerErrorCode, message: impl Into<String>) -> Self {
        Self {
            err,
            error_message: Some(message.into()),
            ..Self::new("", -1, -1)
        }
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn identifier(&self) -> Option<&str> {
        self.headers.get(IDENTIFIER_HEADER).map(String::as_str)
    }

    /// Human readable error, falling back to the code description
    pub fn error_string(&self) -> String {
        self.error_message
            .clone()
            .unwrap_or_else(|| self.err.to_string())
    }
}

/// A message to enqueue on a producer
#[derive(Debug, Clone, PartialEq)]
pub struct ProducerRecord {
    pub topic: String,
    /// `None` lets the client's partitioner decide
    pub partition: Option<i32>,
    /// Client specific message flags
    pub flags: i32,
    pub key: Option<String>,
    pub payload: Option<Vec<u8>>,
    pub headers: Headers,
}
