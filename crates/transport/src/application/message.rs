//! Message Types
//!
//! Application messages travel as typed Rust values. Each type carries the
//! routing identifier written to the identifier header; on the way in, the
//! consumer routing table maps that identifier to a registered type name and
//! [`MessageTypes`] turns the body back into a value of that type.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;

/// A message that can be sent over the transport
pub trait Message: Serialize + DeserializeOwned + fmt::Debug + Send + Sync + 'static {
    /// Routing identifier, e.g. `"order.created"`
    const IDENTIFIER: &'static str;
}

/// Object safe view over any [`Message`]
pub trait AnyMessage: fmt::Debug + Send + Sync {
    fn identifier(&self) -> &'static str;

    fn to_json(&self) -> serde_json::Result<Json>;

    fn to_bincode(&self) -> bincode::Result<Vec<u8>>;

    fn as_any(&self) -> &dyn Any;
}

impl<M: Message> AnyMessage for M {
    fn identifier(&self) -> &'static str {
        M::IDENTIFIER
    }

    fn to_json(&self) -> serde_json::Result<Json> {
        serde_json::to_value(self)
    }

    fn to_bincode(&self) -> bincode::Result<Vec<u8>> {
        bincode::serialize(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

type JsonDecoder = fn(Json) -> serde_json::Result<Box<dyn AnyMessage>>;
type BincodeDecoder = fn(&[u8]) -> bincode::Result<Box<dyn AnyMessage>>;

#[derive(Clone, Copy)]
struct Decoders {
    json: JsonDecoder,
    bincode: BincodeDecoder,
}

fn decode_json<M: Message>(json: Json) -> serde_json::Result<Box<dyn AnyMessage>> {
    Ok(Box::new(serde_json::from_value::<M>(json)?))
}

fn decode_bincode<M: Message>(bytes: &[u8]) -> bincode::Result<Box<dyn AnyMessage>> {
    Ok(Box::new(bincode::deserialize::<M>(bytes)?))
}

/// Message types a receiver can materialize, by type name
#[derive(Clone, Default)]
pub struct MessageTypes {
    types: HashMap<String, Decoders>,
}

impl MessageTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `M` under `name`, the value consumer routing entries refer to
    pub fn register<M: Message>(mut self, name: impl Into<String>) -> Self {
        self.types.insert(
            name.into(),
            Decoders {
                json: decode_json::<M>,
                bincode: decode_bincode::<M>,
            },
        );
        self
    }

    /// Register `M` under its own identifier
    pub fn with<M: Message>(self) -> Self {
        self.register::<M>(M::IDENTIFIER)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// `None` when `name` is not registered
    pub fn decode_json(
        &self,
        name: &str,
        json: Json,
    ) -> Option<serde_json::Result<Box<dyn AnyMessage>>> {
        self.types.get(name).map(|decoders| (decoders.json)(json))
    }

    /// `None` when `name` is not registered
    pub fn decode_bincode(
        &self,
        name: &str,
        bytes: &[u8],
    ) -> Option<bincode::Result<Box<dyn AnyMessage>>> {
        self.types.get(name).map(|decoders| (decoders.bincode)(bytes))
    }
}

impl fmt::Debug for MessageTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.types.keys().collect();
        names.sort();
        f.debug_struct("MessageTypes").field("types", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct OrderCreated {
        order_id: String,
        quantity: u32,
    }

    impl Message for OrderCreated {
        const IDENTIFIER: &'static str = "order.created";
    }

    #[test]
    fn test_any_message_identifier() {
        let message: Box<dyn AnyMessage> = Box::new(OrderCreated {
            order_id: "o-1".into(),
            quantity: 2,
        });
        assert_eq!(message.identifier(), "order.created");
        assert_eq!(
            message.to_json().unwrap(),
            json!({"order_id": "o-1", "quantity": 2})
        );
    }

    #[test]
    fn test_decode_registered_type() {
        let types = MessageTypes::new().register::<OrderCreated>("orders.OrderCreated");
        assert!(types.contains("orders.OrderCreated"));

        let decoded = types
            .decode_json("orders.OrderCreated", json!({"order_id": "o-1", "quantity": 2}))
            .unwrap()
            .unwrap();
        let order = decoded.as_any().downcast_ref::<OrderCreated>().unwrap();
        assert_eq!(order.quantity, 2);
    }

    #[test]
    fn test_bincode_round_trip() {
        let types = MessageTypes::new().with::<OrderCreated>();
        let original = OrderCreated {
            order_id: "o-9".into(),
            quantity: 1,
        };

        let bytes = original.to_bincode().unwrap();
        let decoded = types.decode_bincode("order.created", &bytes).unwrap().unwrap();
        assert_eq!(decoded.as_any().downcast_ref::<OrderCreated>(), Some(&original));
    }

    #[test]
    fn test_unregistered_type() {
        let types = MessageTypes::new();
        assert!(types.is_empty());
        assert!(types.decode_json("missing", json!({})).is_none());
    }
}
