//! librdkafka backed clients
//!
//! Consumer and producer ports implemented over rdkafka's polling
//! `BaseConsumer` and `BaseProducer`, so the connection manager keeps full
//! control of when the client is polled.

use std::collections::BTreeMap;
use std::time::Duration;

use courier_ports::{
    BrokerError, BrokerErrorCode, BrokerMessage, BrokerResult, ClientFactory, CommitMode,
    ConsumerClient, ProducerClient, ProducerRecord, RebalanceAction, RebalanceEvent,
    TopicPartition, rebalance_action,
};
use parking_lot::Mutex;
use rdkafka::client::ClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{self, BaseConsumer, Consumer, ConsumerContext, Rebalance};
use rdkafka::error::{KafkaError, KafkaResult};
use rdkafka::message::{BorrowedMessage, Header, Headers as _, Message as _, OwnedHeaders};
use rdkafka::producer::{BaseProducer, BaseRecord, Producer};
use rdkafka::topic_partition_list::{Offset, TopicPartitionList};
use tracing::{debug, error, info, warn};

const FAIL: BrokerErrorCode = BrokerErrorCode::Other(-196);

/// Client context observing rebalance notifications through
/// [`rebalance_action`]. librdkafka applies the assignment itself; a
/// rejected notification is kept until the next poll reports it.
#[derive(Default)]
pub struct RebalanceContext {
    failure: Mutex<Option<String>>,
}

impl RebalanceContext {
    fn take_failure(&self) -> Option<String> {
        self.failure.lock().take()
    }

    fn observe(&self, event: RebalanceEvent) {
        match rebalance_action(event) {
            Ok(RebalanceAction::Assign(partitions)) => {
                info!(partitions = ?partitions, "partitions assigned");
            }
            Ok(RebalanceAction::Unassign) => info!("partitions revoked"),
            Err(e) => {
                error!(error = %e, "rebalance failed");
                self.failure.lock().replace(e.to_string());
            }
        }
    }
}

impl ClientContext for RebalanceContext {}

impl ConsumerContext for RebalanceContext {
    fn pre_rebalance(&self, rebalance: &Rebalance<'_>) {
        let event = match rebalance {
            Rebalance::Assign(tpl) => RebalanceEvent::Assign(partitions(tpl)),
            Rebalance::Revoke(tpl) => RebalanceEvent::Revoke(partitions(tpl)),
            Rebalance::Error(e) => RebalanceEvent::Error(e.to_string()),
        };
        self.observe(event);
    }

    fn commit_callback(&self, result: KafkaResult<()>, _offsets: &TopicPartitionList) {
        if let Err(e) = result {
            warn!(error = %e, "offset commit failed");
        }
    }
}

pub struct KafkaConsumer {
    consumer: BaseConsumer<RebalanceContext>,
}

impl ConsumerClient for KafkaConsumer {
    fn subscribe(&mut self, topics: &[String]) -> BrokerResult<()> {
        let topics: Vec<&str> = topics.iter().map(String::as_str).collect();
        self.consumer.subscribe(&topics).map_err(broker_error)
    }

    fn poll(&mut self, timeout: Duration) -> BrokerMessage {
        if let Some(reason) = self.consumer.context().take_failure() {
            return BrokerMessage::error(FAIL, reason);
        }

        match self.consumer.poll(timeout) {
            None => BrokerMessage::error(BrokerErrorCode::TimedOut, "poll timed out"),
            Some(Ok(message)) => broker_message(&message),
            Some(Err(e)) => BrokerMessage::error(error_code(&e), e.to_string()),
        }
    }

    fn commit(&mut self, message: &BrokerMessage, mode: CommitMode) -> BrokerResult<()> {
        let mut offsets = TopicPartitionList::new();
        offsets
            .add_partition_offset(
                &message.topic,
                message.partition,
                Offset::Offset(message.offset + 1),
            )
            .map_err(broker_error)?;

        let mode = match mode {
            CommitMode::Sync => consumer::CommitMode::Sync,
            CommitMode::Async => consumer::CommitMode::Async,
        };
        self.consumer.commit(&offsets, mode).map_err(broker_error)
    }

    fn assign(&mut self, partitions: &[TopicPartition]) -> BrokerResult<()> {
        let mut tpl = TopicPartitionList::new();
        for tp in partitions {
            tpl.add_partition(&tp.topic, tp.partition);
        }
        self.consumer.assign(&tpl).map_err(broker_error)
    }

    fn unassign(&mut self) -> BrokerResult<()> {
        self.consumer.unassign().map_err(broker_error)
    }
}

pub struct KafkaProducer {
    producer: BaseProducer,
}

impl ProducerClient for KafkaProducer {
    fn send(&mut self, record: ProducerRecord) -> BrokerResult<()> {
        let mut headers = OwnedHeaders::new();
        for (key, value) in &record.headers {
            headers = headers.insert(Header {
                key: key.as_str(),
                value: Some(value.as_str()),
            });
        }

        let mut base = BaseRecord::<str, [u8]>::to(&record.topic).headers(headers);
        if let Some(partition) = record.partition {
            base = base.partition(partition);
        }
        if let Some(key) = &record.key {
            base = base.key(key.as_str());
        }
        if let Some(payload) = &record.payload {
            base = base.payload(payload.as_slice());
        }

        debug!(topic = %record.topic, flags = record.flags, "enqueueing record");
        self.producer.send(base).map_err(|(e, _)| broker_error(e))
    }

    fn poll(&mut self, timeout: Duration) {
        self.producer.poll(timeout);
    }

    fn flush(&mut self, timeout: Duration) -> BrokerErrorCode {
        match self.producer.flush(timeout) {
            Ok(()) => BrokerErrorCode::NoError,
            Err(e) => error_code(&e),
        }
    }
}

/// Creates librdkafka clients from the resolved per role configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct KafkaClientFactory;

impl ClientFactory for KafkaClientFactory {
    type Consumer = KafkaConsumer;
    type Producer = KafkaProducer;

    fn create_consumer(&self, config: &BTreeMap<String, String>) -> BrokerResult<KafkaConsumer> {
        let consumer = client_config(config)
            .create_with_context(RebalanceContext::default())
            .map_err(broker_error)?;
        Ok(KafkaConsumer { consumer })
    }

    fn create_producer(&self, config: &BTreeMap<String, String>) -> BrokerResult<KafkaProducer> {
        let producer = client_config(config).create().map_err(broker_error)?;
        Ok(KafkaProducer { producer })
    }
}

fn client_config(config: &BTreeMap<String, String>) -> ClientConfig {
    let mut client = ClientConfig::new();
    for (key, value) in config {
        client.set(key, value);
    }
    client
}

fn partitions(tpl: &TopicPartitionList) -> Vec<TopicPartition> {
    tpl.elements()
        .iter()
        .map(|e| TopicPartition::new(e.topic(), e.partition()))
        .collect()
}

fn broker_message(message: &BorrowedMessage<'_>) -> BrokerMessage {
    let mut converted = BrokerMessage::new(message.topic(), message.partition(), message.offset());
    converted.key = message
        .key()
        .map(|key| String::from_utf8_lossy(key).into_owned());
    converted.payload = message.payload().map(<[u8]>::to_vec);
    converted.timestamp_ms = message.timestamp().to_millis();

    if let Some(headers) = message.headers() {
        for header in headers.iter() {
            if let Some(value) = header.value {
                converted.headers.insert(
                    header.key.to_string(),
                    String::from_utf8_lossy(value).into_owned(),
                );
            }
        }
    }
    converted
}

fn error_code(e: &KafkaError) -> BrokerErrorCode {
    e.rdkafka_error_code()
        .map_or(FAIL, |code| BrokerErrorCode::from_raw(code as i32))
}

fn broker_error(e: KafkaError) -> BrokerError {
    match e {
        KafkaError::ClientConfig(..) | KafkaError::ClientCreation(_) => {
            BrokerError::Configuration(e.to_string())
        }
        other => BrokerError::broker(error_code(&other), other.to_string()),
    }
}

#[cfg(all(test, feature = "kafka"))]
mod tests {
    use rdkafka::error::RDKafkaErrorCode;

    use super::*;

    fn tpl(topic: &str, partitions: &[i32]) -> TopicPartitionList {
        let mut tpl = TopicPartitionList::new();
        for partition in partitions {
            tpl.add_partition(topic, *partition);
        }
        tpl
    }

    fn config(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_rebalance_error_is_kept_for_next_poll() {
        let context = RebalanceContext::default();

        context.pre_rebalance(&Rebalance::Error(KafkaError::Rebalance(RDKafkaErrorCode::Fail)));

        assert!(context.take_failure().is_some());
        assert!(context.take_failure().is_none());
    }

    #[test]
    fn test_assign_and_revoke_record_no_failure() {
        let context = RebalanceContext::default();
        let assigned = tpl("orders", &[0, 1]);

        context.pre_rebalance(&Rebalance::Assign(&assigned));
        context.pre_rebalance(&Rebalance::Revoke(&assigned));

        assert!(context.take_failure().is_none());
    }

    #[test]
    fn test_partitions_from_list() {
        let converted = partitions(&tpl("orders", &[0, 2]));

        assert_eq!(
            converted,
            vec![TopicPartition::new("orders", 0), TopicPartition::new("orders", 2)]
        );
    }

    #[test]
    fn test_client_creation_error_is_configuration() {
        let e = broker_error(KafkaError::ClientCreation("bad config".into()));
        assert!(matches!(e, BrokerError::Configuration(_)));

        let e = broker_error(KafkaError::Flush(RDKafkaErrorCode::RequestTimedOut));
        assert!(matches!(e, BrokerError::Broker { .. }));
    }

    #[test]
    fn test_factory_creates_clients_without_broker() {
        let factory = KafkaClientFactory;

        let producer = factory.create_producer(&config(&[("bootstrap.servers", "localhost:1")]));
        assert!(producer.is_ok());

        let consumer = factory.create_consumer(&config(&[
            ("bootstrap.servers", "localhost:1"),
            ("group.id", "billing"),
        ]));
        assert!(consumer.is_ok());
    }

    #[test]
    fn test_unknown_property_is_configuration_error() {
        let result = KafkaClientFactory.create_producer(&config(&[("no.such.property", "1")]));

        assert!(matches!(result, Err(BrokerError::Configuration(_))));
    }
}
