//! Transport Integration Test
//!
//! Runs full send/receive flows against the in-memory broker:
//! 1. Union schema: two message types share one topic, each encoded with its
//!    own branch of the registered union
//! 2. Messages without a route are acknowledged and skipped
//! 3. A stopped transport stays stopped
//! 4. A failed rebalance surfaces as a consume error

use std::sync::Arc;

use courier_ports::{BrokerMessage, CommitMode, IDENTIFIER_HEADER, RebalanceEvent};
use courier_schema_registry::{InMemorySchemaRegistry, SchemaRegistry, Subject};
use courier_transport::{
    Envelope, KafkaTransport, MemoryBroker, Message, MessageReceiver, MessageSender, MessageTypes,
    TransportError, TransportFactory,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value as Json, json};

const ORDERS_UNION: &str = r#"[
    {"type": "record", "name": "created", "fields": [{"name": "clusterId", "type": "string"}]},
    {"type": "record", "name": "cancelled", "fields": [
        {"name": "clusterId", "type": "string"},
        {"name": "reason", "type": "string", "default": "unknown"}
    ]}
]"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Created {
    #[serde(rename = "clusterId")]
    cluster_id: String,
}

impl Message for Created {
    const IDENTIFIER: &'static str = "created";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Cancelled {
    #[serde(rename = "clusterId")]
    cluster_id: String,
    reason: String,
}

impl Message for Cancelled {
    const IDENTIFIER: &'static str = "cancelled";
}

fn types() -> MessageTypes {
    MessageTypes::new()
        .register::<Created>("Created")
        .register::<Cancelled>("Cancelled")
}

fn options() -> Json {
    json!({
        "topics": ["orders"],
        "consumer": {
            "routing": [
                {"name": "created", "class": "Created"},
                {"name": "cancelled", "class": "Cancelled"}
            ],
            "config": {"group.id": "billing"},
            "consume_timeout_ms": 10
        },
        "producer": {
            "routing": [
                {"name": "created", "topic": "orders"},
                {"name": "cancelled", "topic": "orders"}
            ]
        }
    })
}

fn transport(broker: &MemoryBroker) -> KafkaTransport<MemoryBroker> {
    TransportFactory::memory(broker.clone())
        .create_transport("kafka://localhost:9092", &options(), types())
        .unwrap()
}

#[test]
fn test_union_topic_round_trip() {
    // === Setup ===
    let registry = Arc::new(InMemorySchemaRegistry::new());
    registry
        .register_schema(&Subject::of_value("orders"), ORDERS_UNION)
        .unwrap();

    let broker = MemoryBroker::new();
    let mut options = options();
    options["validate_schema"] = json!(true);
    let transport = TransportFactory::memory(broker.clone())
        .with_schema_registry(registry)
        .create_transport("kafka://localhost:9092", &options, types())
        .unwrap();

    // === Send both branches ===
    let created = Created {
        cluster_id: "c-1".into(),
    };
    let cancelled = Cancelled {
        cluster_id: "c-1".into(),
        reason: "duplicate".into(),
    };
    transport.send(Envelope::new(created.clone())).unwrap();
    let sent = transport
        .send(Envelope::new(cancelled.clone()).with_key("c-1"))
        .unwrap();
    assert_eq!(sent.stamps().identifier.as_deref(), Some("cancelled"));
    assert_eq!(broker.pending("orders"), 2);

    // === Receive in order ===
    let first = transport.get().unwrap().expect("created");
    assert_eq!(first.message::<Created>(), Some(&created));
    let payload = first.received().unwrap().payload.clone().unwrap();
    assert_eq!(&payload[..6], &[0x00, 0, 0, 0, 1, 0x00]);

    let second = transport.get().unwrap().expect("cancelled");
    assert_eq!(second.message::<Cancelled>(), Some(&cancelled));
    let received = second.received().unwrap();
    assert_eq!(received.key.as_deref(), Some("c-1"));
    assert_eq!(received.payload.as_ref().unwrap()[5], 0x02);

    // === Acknowledge ===
    transport.ack(&first).unwrap();
    transport.reject(&second).unwrap();
    let commits: Vec<(i64, CommitMode)> = broker
        .commits()
        .into_iter()
        .map(|c| (c.offset, c.mode))
        .collect();
    assert_eq!(commits, vec![(0, CommitMode::Async), (1, CommitMode::Async)]);
}

#[test]
fn test_unrouted_message_is_skipped() {
    let broker = MemoryBroker::new();
    let transport = transport(&broker);

    broker
        .inject(
            "orders",
            BrokerMessage::new("", 0, 0)
                .with_header(IDENTIFIER_HEADER, "order.archived")
                .with_payload(b"{}".to_vec()),
        )
        .unwrap();
    transport
        .send(Envelope::new(Created {
            cluster_id: "c-2".into(),
        }))
        .unwrap();

    let envelope = transport.get().unwrap().expect("routed message");
    assert_eq!(envelope.message::<Created>().unwrap().cluster_id, "c-2");
    assert_eq!(envelope.received().unwrap().offset, 1);

    // the skipped message was committed on the way
    let offsets: Vec<i64> = broker.commits().iter().map(|c| c.offset).collect();
    assert_eq!(offsets, vec![0]);
}

#[test]
fn test_empty_topic_yields_nothing() {
    let broker = MemoryBroker::new();
    let transport = transport(&broker);

    assert!(transport.get().unwrap().is_none());
}

#[test]
fn test_stop_is_final() {
    let broker = MemoryBroker::new();
    let transport = transport(&broker);
    transport
        .send(Envelope::new(Created {
            cluster_id: "c-3".into(),
        }))
        .unwrap();

    transport.stop();

    assert!(transport.get().unwrap().is_none());
    assert!(transport.get().unwrap().is_none());
    assert_eq!(broker.pending("orders"), 1);
}

#[test]
fn test_failed_rebalance_is_a_consume_error() {
    let broker = MemoryBroker::new();
    let transport = transport(&broker);

    broker.trigger_rebalance(RebalanceEvent::Error("coordinator lost".into()));

    assert!(matches!(
        transport.get(),
        Err(TransportError::Consume { .. })
    ));
}

#[test]
fn test_unknown_subject_fails_send() {
    let broker = MemoryBroker::new();
    let mut options = options();
    options["validate_schema"] = json!(true);
    let transport = TransportFactory::memory(broker.clone())
        .with_schema_registry(Arc::new(InMemorySchemaRegistry::new()))
        .create_transport("kafka://localhost:9092", &options, types())
        .unwrap();

    let result = transport.send(Envelope::new(Created {
        cluster_id: "c-4".into(),
    }));

    assert!(matches!(result, Err(TransportError::Send(_))));
    assert_eq!(broker.pending("orders"), 0);
}
