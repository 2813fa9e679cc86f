//! Transport Factory
//!
//! Creates [`KafkaTransport`]s from a DSN and JSON options.

use std::sync::Arc;

use courier_ports::ClientFactory;
use courier_schema_registry::{HttpSchemaRegistry, SchemaCodecError, SchemaCodecManager, SchemaRegistry};
use serde_json::Value as Json;
use tracing::info;

use super::config::{KAFKA_SCHEME, resolve_settings, validate_message_types};
use crate::application::connection::ConnectionManager;
use crate::application::error::{ConfigError, Result};
use crate::application::message::MessageTypes;
use crate::application::serializer::envelope_serializer;
use crate::application::traits::MetadataHook;
use crate::application::transport::KafkaTransport;
use crate::domain::{GeneralSetting, ShutdownToken};

/// Factory for Kafka transports sharing one client factory, one set of
/// global options and one shutdown token.
pub struct TransportFactory<F: ClientFactory> {
    clients: F,
    global_options: Json,
    registry: Option<Arc<dyn SchemaRegistry>>,
    metadata: Option<Arc<dyn MetadataHook>>,
    shutdown: ShutdownToken,
}

impl<F: ClientFactory + Clone> TransportFactory<F> {
    pub fn new(clients: F) -> Self {
        Self {
            clients,
            global_options: Json::Null,
            registry: None,
            metadata: None,
            shutdown: ShutdownToken::new(),
        }
    }

    /// Options merged underneath the options of every transport
    pub fn with_global_options(mut self, options: Json) -> Self {
        self.global_options = options;
        self
    }

    /// Use `registry` instead of an HTTP client built from `schema_registry`
    pub fn with_schema_registry(mut self, registry: Arc<dyn SchemaRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_metadata_hook(mut self, hook: Arc<dyn MetadataHook>) -> Self {
        self.metadata = Some(hook);
        self
    }

    pub fn with_shutdown_token(mut self, shutdown: ShutdownToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_token(&self) -> &ShutdownToken {
        &self.shutdown
    }

    /// True for `kafka://` DSNs
    pub fn supports(dsn: &str) -> bool {
        dsn.strip_prefix(KAFKA_SCHEME)
            .is_some_and(|rest| rest.starts_with("://"))
    }

    /// Create a transport for `dsn`. `types` must cover every message type
    /// named by the consumer routing.
    pub fn create_transport(
        &self,
        dsn: &str,
        options: &Json,
        types: MessageTypes,
    ) -> Result<KafkaTransport<F>> {
        let setting = resolve_settings(dsn, &self.global_options, options)?;
        validate_message_types(&setting, &types)?;

        let schema = if setting.validates_schema() {
            Some(SchemaCodecManager::new(self.schema_registry(&setting)?))
        } else {
            None
        };
        let sender_schema = schema.clone().filter(|_| setting.producer.validate_schema);
        let receiver_schema = schema.filter(|_| setting.consumer.validate_schema);

        let serializer = envelope_serializer(setting.serializer, setting.consumer.routing.clone(), types);
        info!(
            transport = %setting.transport_name,
            host = %setting.host,
            serializer = serializer.name(),
            validate_schema = setting.validates_schema(),
            "transport created"
        );

        let connection =
            ConnectionManager::new(Arc::new(setting), self.clients.clone(), self.shutdown.clone());
        let transport = KafkaTransport::new(connection, serializer, sender_schema, receiver_schema);
        Ok(match &self.metadata {
            Some(hook) => transport.with_metadata_hook(Arc::clone(hook)),
            None => transport,
        })
    }

    fn schema_registry(&self, setting: &GeneralSetting) -> Result<Arc<dyn SchemaRegistry>> {
        if let Some(registry) = &self.registry {
            return Ok(Arc::clone(registry));
        }
        let config = setting
            .schema_registry
            .as_ref()
            .ok_or(ConfigError::MissingSchemaRegistry)?;
        let registry = HttpSchemaRegistry::new(config).map_err(SchemaCodecError::from)?;
        Ok(Arc::new(registry))
    }
}

#[cfg(feature = "memory")]
impl TransportFactory<super::memory::MemoryBroker> {
    /// Factory over an in-process broker
    pub fn memory(broker: super::memory::MemoryBroker) -> Self {
        Self::new(broker)
    }
}

#[cfg(feature = "kafka")]
impl TransportFactory<super::kafka::KafkaClientFactory> {
    /// Factory over librdkafka clients
    pub fn kafka() -> Self {
        Self::new(super::kafka::KafkaClientFactory)
    }
}
