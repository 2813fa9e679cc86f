//! Transport Error Types

use courier_ports::{BrokerError, BrokerErrorCode};
use courier_schema_registry::SchemaCodecError;
use thiserror::Error;

/// Error raised while resolving transport options.
///
/// Always detected at setup (or on the first message for serializer
/// compatibility), never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid Kafka DSN \"{dsn}\": {reason}")]
    InvalidDsn { dsn: String, reason: String },

    #[error("invalid transport options: {0}")]
    Options(String),

    #[error("at least one of \"consumer\" or \"producer\" options is required")]
    MissingRole,

    #[error("at least one of \"consumer.topics\", \"producer.topics\" or \"topics\" options is required")]
    MissingTopics,

    #[error("invalid {role} config option \"{key}\"")]
    UnknownKafkaOption { role: &'static str, key: String },

    #[error("{role} config value \"{key}\" must be a string")]
    KafkaValueType { role: &'static str, key: String },

    #[error("{role} config \"{key}\" is required")]
    MissingKafkaOption { role: &'static str, key: String },

    #[error("duplicate {role} routing name \"{name}\"")]
    DuplicateRoute { role: &'static str, name: String },

    #[error("consumer routing \"{name}\" names unregistered message type \"{message_type}\"")]
    UnknownMessageType { name: String, message_type: String },

    #[error("producer routing \"{name}\" targets \"{topic}\", which is not a producer topic")]
    UnroutableTopic { name: String, topic: String },

    #[error("schema validation is enabled but no schema registry is configured")]
    MissingSchemaRegistry,

    #[error("schema registry is enabled but the {0} serializer cannot carry registry payloads")]
    IncompatibleSerializer(&'static str),
}

/// Error type for transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Broker client call failed
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// Non recoverable status returned by a consumer poll
    #[error("fatal consume error {code}: {message}")]
    Consume {
        code: BrokerErrorCode,
        message: String,
    },

    #[error("flush failed after {attempts} attempts, last result {code}")]
    Flush {
        attempts: u32,
        code: BrokerErrorCode,
    },

    #[error(transparent)]
    Schema(#[from] SchemaCodecError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("message routing identifier not found")]
    MissingIdentifier,

    #[error("no message type routed for identifier \"{0}\"")]
    UnroutedIdentifier(String),

    #[error("no destination topic for message \"{0}\"")]
    NoDestination(String),

    #[error("envelope was not received from the broker")]
    NotReceived,

    /// Any failure while handing a message to the connection
    #[error("failed to send message: {0}")]
    Send(#[source] Box<TransportError>),
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for TransportError {
    fn from(err: bincode::Error) -> Self {
        TransportError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
