//! Transport Configuration
//!
//! Options arrive as JSON: global options shared by every transport, merged
//! recursively with the options of one transport, then deserialized into the
//! types below and resolved into a [`GeneralSetting`] together with the DSN.
//!
//! ```json
//! {
//!   "transport_name": "orders",
//!   "topics": ["orders"],
//!   "validate_schema": true,
//!   "schema_registry": {"base_uri": "http://registry:8081"},
//!   "consumer": {
//!     "routing": [{"name": "order.created", "class": "OrderCreated"}],
//!     "config": {"group.id": "billing"}
//!   },
//!   "producer": {
//!     "routing": [{"name": "order.created", "topic": "orders"}]
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use courier_schema_registry::RegistryConfig;
use serde::Deserialize;
use serde_json::{Map, Value as Json};
use url::Url;

use super::kafka_options;
use crate::application::error::ConfigError;
use crate::application::message::MessageTypes;
use crate::domain::{ConsumerSetting, GeneralSetting, KafkaConfig, ProducerSetting, SerializerKind};

/// The only DSN scheme accepted
pub const KAFKA_SCHEME: &str = "kafka";

const CONSUMER: &str = "consumer";
const PRODUCER: &str = "producer";

/// Broker properties every consumer requires
const REQUIRED_CONSUMER_CONFIG: &[&str] = &["group.id"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsumerRoute {
    pub name: String,
    pub class: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProducerRoute {
    pub name: String,
    pub topic: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsumerOptions {
    #[serde(default = "default_commit_async")]
    pub commit_async: bool,

    #[serde(default = "default_consume_timeout_ms")]
    pub consume_timeout_ms: u64,

    #[serde(default)]
    pub validate_schema: bool,

    #[serde(default)]
    pub topics: Vec<String>,

    #[serde(default)]
    pub routing: Vec<ConsumerRoute>,

    /// librdkafka properties, merged over [`default_consumer_config`]
    #[serde(default)]
    pub config: BTreeMap<String, Json>,
}

fn default_commit_async() -> bool {
    true
}

fn default_consume_timeout_ms() -> u64 {
    500
}

/// Properties every consumer starts from
pub fn default_consumer_config() -> KafkaConfig {
    KafkaConfig::from([
        ("auto.offset.reset".to_string(), "earliest".to_string()),
        ("enable.auto.commit".to_string(), "false".to_string()),
        ("enable.partition.eof".to_string(), "true".to_string()),
    ])
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            commit_async: default_commit_async(),
            consume_timeout_ms: default_consume_timeout_ms(),
            validate_schema: false,
            topics: Vec::new(),
            routing: Vec::new(),
            config: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProducerOptions {
    #[serde(default)]
    pub validate_schema: bool,

    #[serde(default)]
    pub poll_timeout_ms: u64,

    #[serde(default = "default_flush_timeout_ms")]
    pub flush_timeout_ms: u64,

    #[serde(default)]
    pub topics: Vec<String>,

    #[serde(default)]
    pub routing: Vec<ProducerRoute>,

    #[serde(default)]
    pub config: BTreeMap<String, Json>,
}

fn default_flush_timeout_ms() -> u64 {
    10_000
}

impl Default for ProducerOptions {
    fn default() -> Self {
        Self {
            validate_schema: false,
            poll_timeout_ms: 0,
            flush_timeout_ms: default_flush_timeout_ms(),
            topics: Vec::new(),
            routing: Vec::new(),
            config: BTreeMap::new(),
        }
    }
}

/// Root transport options
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportOptions {
    pub consumer: Option<ConsumerOptions>,

    pub producer: Option<ProducerOptions>,

    /// Fills the topics of a role that configures none
    #[serde(default)]
    pub topics: Vec<String>,

    /// Overrides `validate_schema` of both roles
    pub validate_schema: Option<bool>,

    pub schema_registry: Option<RegistryConfig>,

    #[serde(default = "default_transport_name")]
    pub transport_name: String,

    #[serde(default)]
    pub serializer: SerializerKind,
}

fn default_transport_name() -> String {
    "kafka".to_string()
}

impl TransportOptions {
    /// Validate the options and resolve them against the broker `host`
    pub fn into_setting(self, host: String) -> Result<GeneralSetting, ConfigError> {
        if self.consumer.is_none() && self.producer.is_none() {
            return Err(ConfigError::MissingRole);
        }

        let mut consumer = consumer_setting(self.consumer)?;
        let mut producer = producer_setting(self.producer)?;

        if consumer.topics.is_empty() && producer.topics.is_empty() && self.topics.is_empty() {
            return Err(ConfigError::MissingTopics);
        }
        if consumer.topics.is_empty() {
            consumer.topics = self.topics.clone();
        }
        if producer.topics.is_empty() {
            producer.topics = self.topics;
        }

        if let Some(validate_schema) = self.validate_schema {
            consumer.validate_schema = validate_schema;
            producer.validate_schema = validate_schema;
        }

        if let Some((name, topic)) = producer
            .routing
            .iter()
            .find(|(_, topic)| !producer.topics.contains(*topic))
        {
            return Err(ConfigError::UnroutableTopic {
                name: name.clone(),
                topic: topic.clone(),
            });
        }

        Ok(GeneralSetting {
            host,
            transport_name: self.transport_name,
            consumer,
            producer,
            serializer: self.serializer,
            schema_registry: self.schema_registry,
        })
    }
}

/// Resolve the settings of one transport from its DSN, the global options
/// and its own options.
pub fn resolve_settings(
    dsn: &str,
    global: &Json,
    options: &Json,
) -> Result<GeneralSetting, ConfigError> {
    let host = broker_host(dsn)?;

    let mut merged = Json::Object(Map::new());
    merge_options(&mut merged, global);
    merge_options(&mut merged, options);

    let options: TransportOptions =
        serde_json::from_value(merged).map_err(|e| ConfigError::Options(e.to_string()))?;
    options.into_setting(host)
}

/// Merge `overlay` into `base`. Objects merge key by key, any other value
/// replaces what it lands on. `null` leaves `base` untouched.
pub fn merge_options(base: &mut Json, overlay: &Json) {
    match (base, overlay) {
        (_, Json::Null) => {}
        (Json::Object(base), Json::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(existing) => merge_options(existing, value),
                    None => {
                        if !value.is_null() {
                            base.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// `host:port` of a `kafka://host:port` DSN
pub fn broker_host(dsn: &str) -> Result<String, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidDsn {
        dsn: dsn.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(dsn).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme() != KAFKA_SCHEME {
        return Err(invalid("must start with \"kafka://\""));
    }
    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| invalid("missing host"))?;
    let port = url.port().ok_or_else(|| invalid("missing port"))?;

    Ok(format!("{host}:{port}"))
}

/// Every consumer routing entry must name a type in `types`
pub fn validate_message_types(
    setting: &GeneralSetting,
    types: &MessageTypes,
) -> Result<(), ConfigError> {
    match setting
        .consumer
        .routing
        .iter()
        .find(|(_, message_type)| !types.contains(message_type))
    {
        Some((name, message_type)) => Err(ConfigError::UnknownMessageType {
            name: name.clone(),
            message_type: message_type.clone(),
        }),
        None => Ok(()),
    }
}

fn consumer_setting(options: Option<ConsumerOptions>) -> Result<ConsumerSetting, ConfigError> {
    let configured = options.is_some();
    let options = options.unwrap_or_default();

    let config = kafka_config(
        CONSUMER,
        default_consumer_config(),
        options.config,
        kafka_options::is_consumer_option,
    )?;
    if configured
        && let Some(missing) = REQUIRED_CONSUMER_CONFIG
            .iter()
            .find(|key| !config.contains_key(**key))
    {
        return Err(ConfigError::MissingKafkaOption {
            role: CONSUMER,
            key: missing.to_string(),
        });
    }

    Ok(ConsumerSetting {
        routing: routing_table(CONSUMER, options.routing.into_iter().map(|r| (r.name, r.class)))?,
        config,
        topics: options.topics,
        consume_timeout_ms: options.consume_timeout_ms,
        commit_async: options.commit_async,
        validate_schema: options.validate_schema,
    })
}

fn producer_setting(options: Option<ProducerOptions>) -> Result<ProducerSetting, ConfigError> {
    let options = options.unwrap_or_default();

    Ok(ProducerSetting {
        routing: routing_table(PRODUCER, options.routing.into_iter().map(|r| (r.name, r.topic)))?,
        config: kafka_config(
            PRODUCER,
            KafkaConfig::new(),
            options.config,
            kafka_options::is_producer_option,
        )?,
        topics: options.topics,
        poll_timeout_ms: options.poll_timeout_ms,
        flush_timeout_ms: options.flush_timeout_ms,
        validate_schema: options.validate_schema,
    })
}

fn kafka_config(
    role: &'static str,
    defaults: KafkaConfig,
    values: BTreeMap<String, Json>,
    known: fn(&str) -> bool,
) -> Result<KafkaConfig, ConfigError> {
    let mut config = defaults;
    for (key, value) in values {
        if !known(&key) {
            return Err(ConfigError::UnknownKafkaOption { role, key });
        }
        let Json::String(value) = value else {
            return Err(ConfigError::KafkaValueType { role, key });
        };
        config.insert(key, value);
    }
    Ok(config)
}

fn routing_table(
    role: &'static str,
    entries: impl Iterator<Item = (String, String)>,
) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut routing = BTreeMap::new();
    for (name, target) in entries {
        if routing.contains_key(&name) {
            return Err(ConfigError::DuplicateRoute { role, name });
        }
        routing.insert(name, target);
    }
    Ok(routing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DSN: &str = "kafka://localhost:9092";

    fn resolve(options: Json) -> Result<GeneralSetting, ConfigError> {
        resolve_settings(DSN, &Json::Null, &options)
    }

    fn consumer_only() -> Json {
        json!({
            "topics": ["orders"],
            "consumer": {"config": {"group.id": "billing"}}
        })
    }

    // ========================================================================
    // Resolving
    // ========================================================================

    #[test]
    fn test_resolve_with_valid_options() {
        let setting = resolve(json!({
            "transport_name": "orders",
            "consumer": {
                "topics": ["orders"],
                "commit_async": false,
                "consume_timeout_ms": 250,
                "routing": [{"name": "order.created", "class": "OrderCreated"}],
                "config": {"group.id": "billing", "auto.offset.reset": "latest"}
            },
            "producer": {
                "topics": ["orders"],
                "poll_timeout_ms": 5,
                "routing": [{"name": "order.created", "topic": "orders"}],
                "config": {"acks": "all"}
            }
        }))
        .unwrap();

        assert_eq!(setting.host, "localhost:9092");
        assert_eq!(setting.transport_name, "orders");
        assert_eq!(setting.serializer, SerializerKind::Json);
        assert!(!setting.consumer.commit_async);
        assert_eq!(setting.consumer.consume_timeout_ms, 250);
        assert_eq!(setting.consumer.message_type("order.created"), Some("OrderCreated"));
        assert_eq!(setting.consumer.config.get("auto.offset.reset").map(String::as_str), Some("latest"));
        assert_eq!(setting.consumer.config.get("enable.auto.commit").map(String::as_str), Some("false"));
        assert_eq!(setting.producer.poll_timeout_ms, 5);
        assert_eq!(setting.producer.flush_timeout_ms, 10_000);
        assert_eq!(setting.producer.config.get("acks").map(String::as_str), Some("all"));
        assert_eq!(setting.producer.routing.get("order.created").map(String::as_str), Some("orders"));
    }

    #[test]
    fn test_invalid_dsn() {
        for dsn in ["not a dsn", "kafka://localhost", "http://localhost:9092"] {
            let err = resolve_settings(dsn, &Json::Null, &consumer_only()).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidDsn { .. }), "{dsn}: {err}");
        }
    }

    #[test]
    fn test_global_and_transport_options_merge() {
        let global = json!({
            "validate_schema": false,
            "consumer": {"config": {"group.id": "billing", "client.id": "global"}}
        });
        let options = json!({
            "topics": ["orders"],
            "consumer": {"config": {"client.id": "orders"}}
        });

        let setting = resolve_settings(DSN, &global, &options).unwrap();
        let config = &setting.consumer.config;
        assert_eq!(config.get("group.id").map(String::as_str), Some("billing"));
        assert_eq!(config.get("client.id").map(String::as_str), Some("orders"));
    }

    #[test]
    fn test_merge_options() {
        let mut base = json!({"a": {"b": 1, "c": [1, 2]}, "d": 1});
        merge_options(&mut base, &json!({"a": {"c": [3]}, "d": null, "e": true}));
        assert_eq!(base, json!({"a": {"b": 1, "c": [3]}, "d": 1, "e": true}));
    }

    #[test]
    fn test_missing_topics() {
        let err = resolve(json!({"consumer": {"config": {"group.id": "billing"}}})).unwrap_err();
        assert_eq!(err, ConfigError::MissingTopics);
    }

    #[test]
    fn test_missing_role() {
        let err = resolve(json!({"topics": ["orders"]})).unwrap_err();
        assert_eq!(err, ConfigError::MissingRole);
    }

    #[test]
    fn test_top_level_topics_fill_roles() {
        let setting = resolve(json!({
            "topics": ["orders"],
            "consumer": {"topics": ["payments"], "config": {"group.id": "billing"}},
            "producer": {}
        }))
        .unwrap();

        assert_eq!(setting.consumer.topics, vec!["payments"]);
        assert_eq!(setting.producer.topics, vec!["orders"]);
    }

    #[test]
    fn test_global_validate_schema_is_applied() {
        let setting = resolve(json!({
            "topics": ["orders"],
            "validate_schema": true,
            "consumer": {"validate_schema": false, "config": {"group.id": "billing"}},
            "producer": {"validate_schema": false}
        }))
        .unwrap();

        assert!(setting.consumer.validate_schema);
        assert!(setting.producer.validate_schema);
    }

    #[test]
    fn test_unknown_top_level_option() {
        let mut options = consumer_only();
        options["retries"] = json!(3);
        assert!(matches!(resolve(options), Err(ConfigError::Options(_))));
    }

    #[test]
    fn test_serializer_and_registry_options() {
        let mut options = consumer_only();
        options["serializer"] = json!("bincode");
        options["schema_registry"] = json!({"base_uri": "http://registry:8081", "api_key": "k"});

        let setting = resolve(options).unwrap();
        assert_eq!(setting.serializer, SerializerKind::Bincode);
        let registry = setting.schema_registry.unwrap();
        assert_eq!(registry.base_uri, "http://registry:8081");
        assert_eq!(registry.api_key, "k");

        let mut options = consumer_only();
        options["serializer"] = json!("php");
        assert!(matches!(resolve(options), Err(ConfigError::Options(_))));
    }

    // ========================================================================
    // Role options
    // ========================================================================

    #[test]
    fn test_default_consumer_when_not_configured() {
        let setting = resolve(json!({"topics": ["orders"], "producer": {}})).unwrap();

        assert!(setting.consumer.commit_async);
        assert_eq!(setting.consumer.consume_timeout_ms, 500);
        assert_eq!(setting.consumer.config, default_consumer_config());
        assert!(setting.consumer.routing.is_empty());
    }

    #[test]
    fn test_default_producer_when_not_configured() {
        let setting = resolve(consumer_only()).unwrap();

        assert_eq!(setting.producer.poll_timeout_ms, 0);
        assert_eq!(setting.producer.flush_timeout_ms, 10_000);
        assert!(setting.producer.config.is_empty());
    }

    #[test]
    fn test_invalid_role_option_key() {
        let err = resolve(json!({"topics": ["t"], "consumer": {"unknown": 1}})).unwrap_err();
        assert!(matches!(err, ConfigError::Options(_)));

        let err = resolve(json!({"topics": ["t"], "producer": {"unknown": 1}})).unwrap_err();
        assert!(matches!(err, ConfigError::Options(_)));
    }

    #[test]
    fn test_invalid_role_option_types() {
        let err = resolve(json!({"topics": ["t"], "consumer": {"commit_async": "yes"}})).unwrap_err();
        assert!(matches!(err, ConfigError::Options(_)));

        let err = resolve(json!({"topics": ["t"], "producer": {"flush_timeout_ms": "10"}})).unwrap_err();
        assert!(matches!(err, ConfigError::Options(_)));
    }

    #[test]
    fn test_consumer_requires_group_id() {
        let err = resolve(json!({"topics": ["t"], "consumer": {"commit_async": true}})).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingKafkaOption {
                role: "consumer",
                key: "group.id".into()
            }
        );
    }

    #[test]
    fn test_invalid_kafka_option() {
        let err = resolve(json!({"topics": ["t"], "producer": {"config": {"group.id": "x"}}})).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownKafkaOption {
                role: "producer",
                key: "group.id".into()
            }
        );
    }

    #[test]
    fn test_non_string_kafka_value() {
        let err = resolve(json!({
            "topics": ["t"],
            "consumer": {"config": {"group.id": "billing", "session.timeout.ms": 6000}}
        }))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::KafkaValueType {
                role: "consumer",
                key: "session.timeout.ms".into()
            }
        );
    }

    #[test]
    fn test_invalid_routing_entries() {
        let err = resolve(json!({
            "topics": ["t"],
            "consumer": {"routing": [{"name": "order.created"}], "config": {"group.id": "g"}}
        }))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Options(_)));

        let err = resolve(json!({
            "topics": ["t"],
            "producer": {"routing": [{"name": "order.created", "class": "OrderCreated"}]}
        }))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Options(_)));
    }

    #[test]
    fn test_duplicate_routing_name() {
        let err = resolve(json!({
            "topics": ["t"],
            "producer": {"routing": [
                {"name": "order.created", "topic": "t"},
                {"name": "order.created", "topic": "t"}
            ]}
        }))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateRoute {
                role: "producer",
                name: "order.created".into()
            }
        );
    }

    #[test]
    fn test_producer_route_outside_topics() {
        let err = resolve(json!({
            "topics": ["orders"],
            "producer": {"routing": [{"name": "order.created", "topic": "payments"}]}
        }))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnroutableTopic {
                name: "order.created".into(),
                topic: "payments".into()
            }
        );
    }

    #[test]
    fn test_routed_message_types_must_be_registered() {
        #[derive(Debug, serde::Serialize, serde::Deserialize)]
        struct OrderCreated {}

        impl crate::application::message::Message for OrderCreated {
            const IDENTIFIER: &'static str = "order.created";
        }

        let setting = resolve(json!({
            "topics": ["orders"],
            "consumer": {
                "routing": [{"name": "order.created", "class": "OrderCreated"}],
                "config": {"group.id": "billing"}
            }
        }))
        .unwrap();

        let err = validate_message_types(&setting, &MessageTypes::new()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownMessageType { .. }));

        let types = MessageTypes::new().register::<OrderCreated>("OrderCreated");
        assert!(validate_message_types(&setting, &types).is_ok());
    }
}
