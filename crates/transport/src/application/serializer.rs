//! Envelope Serializers
//!
//! Turn an [`Envelope`] into a broker body plus headers and back. Both
//! serializers write the routing identifier header and, when the envelope
//! carries custom headers, a JSON list of their keys so the receiving side
//! can tell them apart from broker headers.

use std::collections::BTreeMap;
use std::sync::Arc;

use courier_ports::{CUSTOM_ATTR_HEADER, Headers, IDENTIFIER_HEADER};
use serde_json::Value as Json;

use super::envelope::Envelope;
use super::error::{ConfigError, Result, TransportError};
use super::message::{AnyMessage, MessageTypes};
use crate::domain::SerializerKind;

/// Serialized form of an envelope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedEnvelope {
    pub body: Vec<u8>,
    pub headers: Headers,
}

pub trait EnvelopeSerializer: Send + Sync {
    fn name(&self) -> &'static str;

    fn encode(&self, envelope: &Envelope) -> Result<EncodedEnvelope>;

    fn decode(&self, encoded: EncodedEnvelope) -> Result<Envelope>;

    /// Whether encoded bodies are JSON the schema codec can re-encode
    fn supports_schema_registry(&self) -> bool {
        true
    }
}

/// JSON bodies. The only serializer usable with the schema registry.
pub struct JsonMessageSerializer {
    routing: BTreeMap<String, String>,
    types: MessageTypes,
}

impl JsonMessageSerializer {
    /// `routing` maps identifiers to names registered in `types`
    pub fn new(routing: BTreeMap<String, String>, types: MessageTypes) -> Self {
        Self { routing, types }
    }
}

impl EnvelopeSerializer for JsonMessageSerializer {
    fn name(&self) -> &'static str {
        SerializerKind::Json.name()
    }

    fn encode(&self, envelope: &Envelope) -> Result<EncodedEnvelope> {
        let headers = outbound_headers(envelope)?;
        let body = serde_json::to_vec(&envelope.message_ref().to_json()?)?;
        Ok(EncodedEnvelope { body, headers })
    }

    fn decode(&self, encoded: EncodedEnvelope) -> Result<Envelope> {
        let (identifier, message_type) = route(&self.routing, &encoded.headers)?;
        let json: Json = serde_json::from_slice(&encoded.body)?;
        let message = self
            .types
            .decode_json(message_type, json)
            .ok_or_else(|| unknown_type(identifier, message_type))??;
        inbound_envelope(message, identifier, &encoded.headers)
    }
}

/// Native binary bodies for in-process types
pub struct BincodeMessageSerializer {
    routing: BTreeMap<String, String>,
    types: MessageTypes,
}

impl BincodeMessageSerializer {
    pub fn new(routing: BTreeMap<String, String>, types: MessageTypes) -> Self {
        Self { routing, types }
    }
}

impl EnvelopeSerializer for BincodeMessageSerializer {
    fn name(&self) -> &'static str {
        SerializerKind::Bincode.name()
    }

    fn encode(&self, envelope: &Envelope) -> Result<EncodedEnvelope> {
        let headers = outbound_headers(envelope)?;
        let body = envelope.message_ref().to_bincode()?;
        Ok(EncodedEnvelope { body, headers })
    }

    fn decode(&self, encoded: EncodedEnvelope) -> Result<Envelope> {
        let (identifier, message_type) = route(&self.routing, &encoded.headers)?;
        let message = self
            .types
            .decode_bincode(message_type, &encoded.body)
            .ok_or_else(|| unknown_type(identifier, message_type))??;
        inbound_envelope(message, identifier, &encoded.headers)
    }

    fn supports_schema_registry(&self) -> bool {
        false
    }
}

/// Build the serializer selected by `kind`
pub fn envelope_serializer(
    kind: SerializerKind,
    routing: BTreeMap<String, String>,
    types: MessageTypes,
) -> Arc<dyn EnvelopeSerializer> {
    match kind {
        SerializerKind::Json => Arc::new(JsonMessageSerializer::new(routing, types)),
        SerializerKind::Bincode => Arc::new(BincodeMessageSerializer::new(routing, types)),
    }
}

fn outbound_headers(envelope: &Envelope) -> Result<Headers> {
    let identifier = envelope.message_ref().identifier();
    if identifier.is_empty() {
        return Err(TransportError::MissingIdentifier);
    }

    let custom = &envelope.stamps().custom_headers;
    let mut headers = custom.clone();
    if !custom.is_empty() {
        let keys: Vec<&String> = custom.keys().collect();
        headers.insert(CUSTOM_ATTR_HEADER.to_string(), serde_json::to_string(&keys)?);
    }
    headers.insert(IDENTIFIER_HEADER.to_string(), identifier.to_string());
    Ok(headers)
}

fn route<'a>(
    routing: &'a BTreeMap<String, String>,
    headers: &'a Headers,
) -> Result<(&'a str, &'a str)> {
    let identifier = headers
        .get(IDENTIFIER_HEADER)
        .ok_or(TransportError::MissingIdentifier)?;
    let message_type = routing
        .get(identifier)
        .ok_or_else(|| TransportError::UnroutedIdentifier(identifier.clone()))?;
    Ok((identifier.as_str(), message_type.as_str()))
}

fn unknown_type(identifier: &str, message_type: &str) -> TransportError {
    ConfigError::UnknownMessageType {
        name: identifier.to_string(),
        message_type: message_type.to_string(),
    }
    .into()
}

fn inbound_envelope(
    message: Box<dyn AnyMessage>,
    identifier: &str,
    headers: &Headers,
) -> Result<Envelope> {
    let mut envelope = Envelope::from_boxed(message).with_identifier(identifier);
    if let Some(keys) = headers.get(CUSTOM_ATTR_HEADER) {
        let keys: Vec<String> = serde_json::from_str(keys)?;
        for key in keys {
            if let Some(value) = headers.get(&key) {
                envelope = envelope.with_header(key, value.clone());
            }
        }
    }
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::message::Message;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct OrderCreated {
        order_id: String,
    }

    impl Message for OrderCreated {
        const IDENTIFIER: &'static str = "order.created";
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Nameless;

    impl Message for Nameless {
        const IDENTIFIER: &'static str = "";
    }

    fn routing() -> BTreeMap<String, String> {
        BTreeMap::from([("order.created".to_string(), "OrderCreated".to_string())])
    }

    fn types() -> MessageTypes {
        MessageTypes::new().register::<OrderCreated>("OrderCreated")
    }

    fn order() -> Envelope {
        Envelope::new(OrderCreated {
            order_id: "o-1".into(),
        })
    }

    #[test]
    fn test_encode_writes_identifier() {
        let serializer = JsonMessageSerializer::new(routing(), types());
        let encoded = serializer.encode(&order()).unwrap();

        assert_eq!(encoded.body, br#"{"order_id":"o-1"}"#);
        assert_eq!(
            encoded.headers.get(IDENTIFIER_HEADER).map(String::as_str),
            Some("order.created")
        );
        assert!(!encoded.headers.contains_key(CUSTOM_ATTR_HEADER));
    }

    #[test]
    fn test_encode_custom_headers() {
        let serializer = JsonMessageSerializer::new(routing(), types());
        let envelope = order().with_header("trace-id", "t-1").with_header("tenant", "acme");
        let encoded = serializer.encode(&envelope).unwrap();

        assert_eq!(encoded.headers.get("trace-id").map(String::as_str), Some("t-1"));
        assert_eq!(
            encoded.headers.get(CUSTOM_ATTR_HEADER).map(String::as_str),
            Some(r#"["tenant","trace-id"]"#)
        );
    }

    #[test]
    fn test_encode_rejects_empty_identifier() {
        let serializer = JsonMessageSerializer::new(routing(), types());
        let err = serializer.encode(&Envelope::new(Nameless)).unwrap_err();
        assert!(matches!(err, TransportError::MissingIdentifier));
    }

    #[test]
    fn test_decode_round_trip() {
        let serializer = JsonMessageSerializer::new(routing(), types());
        let encoded = serializer.encode(&order().with_header("trace-id", "t-1")).unwrap();
        let mut headers = encoded.headers.clone();
        headers.insert("broker-header".into(), "ignored".into());

        let envelope = serializer
            .decode(EncodedEnvelope {
                body: encoded.body,
                headers,
            })
            .unwrap();

        assert_eq!(
            envelope.message::<OrderCreated>().map(|m| m.order_id.as_str()),
            Some("o-1")
        );
        assert_eq!(envelope.stamps().identifier.as_deref(), Some("order.created"));
        assert_eq!(
            envelope.stamps().custom_headers,
            Headers::from([("trace-id".to_string(), "t-1".to_string())])
        );
    }

    #[test]
    fn test_decode_without_identifier() {
        let serializer = JsonMessageSerializer::new(routing(), types());
        let err = serializer
            .decode(EncodedEnvelope {
                body: b"{}".to_vec(),
                headers: Headers::new(),
            })
            .unwrap_err();
        assert!(matches!(err, TransportError::MissingIdentifier));
    }

    #[test]
    fn test_decode_unrouted_identifier() {
        let serializer = JsonMessageSerializer::new(routing(), types());
        let err = serializer
            .decode(EncodedEnvelope {
                body: b"{}".to_vec(),
                headers: Headers::from([(IDENTIFIER_HEADER.to_string(), "user.created".to_string())]),
            })
            .unwrap_err();
        assert!(matches!(err, TransportError::UnroutedIdentifier(id) if id == "user.created"));
    }

    #[test]
    fn test_decode_unregistered_type() {
        let serializer = JsonMessageSerializer::new(routing(), MessageTypes::new());
        let encoded = serializer.encode(&order()).unwrap();
        let err = serializer.decode(encoded).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Config(ConfigError::UnknownMessageType { .. })
        ));
    }

    #[test]
    fn test_bincode_round_trip() {
        let serializer = BincodeMessageSerializer::new(routing(), types());
        assert!(!serializer.supports_schema_registry());

        let encoded = serializer.encode(&order()).unwrap();
        let envelope = serializer.decode(encoded).unwrap();
        assert_eq!(
            envelope.message::<OrderCreated>(),
            Some(&OrderCreated {
                order_id: "o-1".into()
            })
        );
    }

    #[test]
    fn test_serializer_selection() {
        assert!(envelope_serializer(SerializerKind::Json, routing(), types()).supports_schema_registry());
        assert_eq!(
            envelope_serializer(SerializerKind::Bincode, routing(), types()).name(),
            "bincode"
        );
    }
}
