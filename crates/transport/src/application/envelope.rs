//! Envelopes and Stamps
//!
//! An [`Envelope`] pairs a message with per-message transport hints.

use courier_ports::{BrokerMessage, Headers};

use super::message::{AnyMessage, Message};

/// Broker level delivery hints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageStamp {
    /// `None` lets the partitioner decide
    pub partition: Option<i32>,
    pub flags: i32,
    pub key: Option<String>,
}

/// Transport hints attached to an envelope
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stamps {
    pub message: Option<MessageStamp>,
    /// Overrides the key of the message stamp
    pub key: Option<String>,
    /// Schema version pinned for registry encoding
    pub version: Option<u32>,
    pub no_flush: bool,
    /// Re-enables flushing when `no_flush` is set
    pub force_flush: bool,
    pub custom_headers: Headers,
    pub identifier: Option<String>,
    /// Raw broker message the envelope was decoded from
    pub received: Option<BrokerMessage>,
}

#[derive(Debug)]
pub struct Envelope {
    message: Box<dyn AnyMessage>,
    stamps: Stamps,
}

impl Envelope {
    pub fn new<M: Message>(message: M) -> Self {
        Self::from_boxed(Box::new(message))
    }

    pub fn from_boxed(message: Box<dyn AnyMessage>) -> Self {
        Self {
            message,
            stamps: Stamps::default(),
        }
    }

    pub fn with_message_stamp(mut self, stamp: MessageStamp) -> Self {
        self.stamps.message = Some(stamp);
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.stamps.key = Some(key.into());
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.stamps.version = Some(version);
        self
    }

    pub fn with_no_flush(mut self) -> Self {
        self.stamps.no_flush = true;
        self
    }

    pub fn with_force_flush(mut self) -> Self {
        self.stamps.force_flush = true;
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.stamps.custom_headers.insert(key.into(), value.into());
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.stamps.identifier = Some(identifier.into());
        self
    }

    pub fn with_received(mut self, message: BrokerMessage) -> Self {
        self.stamps.received = Some(message);
        self
    }

    pub fn stamps(&self) -> &Stamps {
        &self.stamps
    }

    pub fn message_ref(&self) -> &dyn AnyMessage {
        self.message.as_ref()
    }

    /// The message as `M`, if it is one
    pub fn message<M: Message>(&self) -> Option<&M> {
        self.message.as_any().downcast_ref::<M>()
    }

    pub fn into_message(self) -> Box<dyn AnyMessage> {
        self.message
    }

    pub fn partition(&self) -> Option<i32> {
        self.stamps.message.as_ref().and_then(|stamp| stamp.partition)
    }

    pub fn flags(&self) -> i32 {
        self.stamps.message.as_ref().map_or(0, |stamp| stamp.flags)
    }

    pub fn key(&self) -> Option<&str> {
        self.stamps
            .key
            .as_deref()
            .or_else(|| self.stamps.message.as_ref().and_then(|stamp| stamp.key.as_deref()))
    }

    /// Flush after producing unless a no-flush stamp opts out
    pub fn force_flush(&self) -> bool {
        !self.stamps.no_flush || self.stamps.force_flush
    }

    pub fn received(&self) -> Option<&BrokerMessage> {
        self.stamps.received.as_ref()
    }
}
