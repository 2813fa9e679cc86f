//! Resolved transport settings
//!
//! Immutable snapshots produced once per transport by the option resolver.

use std::collections::BTreeMap;
use std::time::Duration;

use courier_ports::CommitMode;
use courier_schema_registry::RegistryConfig;
use serde::{Deserialize, Serialize};

/// Flat librdkafka property map
pub type KafkaConfig = BTreeMap<String, String>;

/// Broker list property every client is created with
pub const BROKER_LIST_KEY: &str = "metadata.broker.list";

/// Envelope serializer selected by the `serializer` option
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializerKind {
    #[default]
    Json,
    Bincode,
}

impl SerializerKind {
    pub fn name(&self) -> &'static str {
        match self {
            SerializerKind::Json => "json",
            SerializerKind::Bincode => "bincode",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerSetting {
    /// Routing identifier to registered message type
    pub routing: BTreeMap<String, String>,
    pub config: KafkaConfig,
    pub topics: Vec<String>,
    pub consume_timeout_ms: u64,
    pub commit_async: bool,
    pub validate_schema: bool,
}

impl ConsumerSetting {
    pub fn commit_mode(&self) -> CommitMode {
        if self.commit_async {
            CommitMode::Async
        } else {
            CommitMode::Sync
        }
    }

    pub fn consume_timeout(&self) -> Duration {
        Duration::from_millis(self.consume_timeout_ms)
    }

    /// True when messages carrying `identifier` can be delivered
    pub fn routes(&self, identifier: &str) -> bool {
        self.routing.contains_key(identifier)
    }

    pub fn message_type(&self, identifier: &str) -> Option<&str> {
        self.routing.get(identifier).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerSetting {
    /// Routing identifier to destination topic
    pub routing: BTreeMap<String, String>,
    pub config: KafkaConfig,
    pub topics: Vec<String>,
    pub poll_timeout_ms: u64,
    pub flush_timeout_ms: u64,
    pub validate_schema: bool,
}

impl ProducerSetting {
    /// Topics a message with `identifier` is produced to: the routed topic
    /// when the identifier has a route, every configured topic otherwise.
    pub fn destinations(&self, identifier: Option<&str>) -> Vec<&str> {
        let routed = identifier.and_then(|id| self.routing.get(id));
        self.topics
            .iter()
            .filter(|topic| routed.is_none_or(|routed| routed == *topic))
            .map(String::as_str)
            .collect()
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralSetting {
    /// `host:port` of the bootstrap broker
    pub host: String,
    pub transport_name: String,
    pub consumer: ConsumerSetting,
    pub producer: ProducerSetting,
    pub serializer: SerializerKind,
    pub schema_registry: Option<RegistryConfig>,
}

impl GeneralSetting {
    /// Properties a consumer handle is created with
    pub fn consumer_config(&self) -> KafkaConfig {
        self.client_config(&self.consumer.config)
    }

    /// Properties a producer handle is created with
    pub fn producer_config(&self) -> KafkaConfig {
        self.client_config(&self.producer.config)
    }

    /// True when either role pushes payloads through the schema registry
    pub fn validates_schema(&self) -> bool {
        self.consumer.validate_schema || self.producer.validate_schema
    }

    fn client_config(&self, role: &KafkaConfig) -> KafkaConfig {
        let mut config = KafkaConfig::new();
        config.insert(BROKER_LIST_KEY.to_string(), self.host.clone());
        config.extend(role.iter().map(|(k, v)| (k.clone(), v.clone())));
        config
    }
}
