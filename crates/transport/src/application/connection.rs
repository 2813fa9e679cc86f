//! Connection Manager
//!
//! Owns the consumer and producer handles of one transport and implements
//! the broker facing half of send and receive:
//!
//! - subscribe once, then pull messages through a blocking iterator that
//!   skips recoverable poll conditions, acknowledges unroutable messages and
//!   stops for good once the shutdown token is observed
//! - commit on ack/reject
//! - produce to the routed topic(s), then flush with a bounded retry

use std::sync::Arc;

use courier_ports::{
    BrokerErrorCode, BrokerMessage, ClientFactory, ConsumerClient, Headers, ProducerClient,
    ProducerRecord,
};
use tracing::{debug, error, info, warn};

use super::error::{Result, TransportError};
use crate::domain::{ConsumeState, GeneralSetting, Handle, ShutdownToken};

/// Flush attempts before a flush is reported as failed
pub const FLUSH_ATTEMPTS: u32 = 10;

/// Produces the body sent to one destination topic
pub type BodyTransform<'a> = &'a mut dyn FnMut(&str) -> Result<Vec<u8>>;

/// A message ready to hand to the producer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutboundMessage {
    pub partition: Option<i32>,
    pub flags: i32,
    pub body: Vec<u8>,
    pub key: Option<String>,
    pub headers: Headers,
    pub force_flush: bool,
    /// Routing identifier used to pick destination topics
    pub identifier: Option<String>,
}

enum Polled {
    Message(BrokerMessage),
    Empty,
    Skipped,
}

pub struct ConnectionManager<F: ClientFactory> {
    setting: Arc<GeneralSetting>,
    factory: F,
    consumer: Handle<F::Consumer>,
    producer: Handle<F::Producer>,
    state: ConsumeState,
    shutdown: ShutdownToken,
}

impl<F: ClientFactory> ConnectionManager<F> {
    pub fn new(setting: Arc<GeneralSetting>, factory: F, shutdown: ShutdownToken) -> Self {
        Self {
            setting,
            factory,
            consumer: Handle::Uninitialized,
            producer: Handle::Uninitialized,
            state: ConsumeState::Idle,
            shutdown,
        }
    }

    pub fn setting(&self) -> &GeneralSetting {
        &self.setting
    }

    pub fn shared_setting(&self) -> Arc<GeneralSetting> {
        Arc::clone(&self.setting)
    }

    /// Current consume state. A cancelled token reads as
    /// [`ConsumeState::Stopping`] until the loop observes it.
    pub fn state(&self) -> ConsumeState {
        match self.state {
            ConsumeState::Stopped => ConsumeState::Stopped,
            _ if self.shutdown.is_cancelled() => ConsumeState::Stopping,
            state => state,
        }
    }

    pub fn shutdown_token(&self) -> &ShutdownToken {
        &self.shutdown
    }

    /// Messages from `topics`, or from the configured consumer topics when
    /// `topics` is empty. Only the first call subscribes; later calls keep
    /// the existing subscription whatever topics they pass.
    pub fn get(&mut self, topics: &[String]) -> Result<Messages<'_, F>> {
        if self.state == ConsumeState::Idle {
            let topics = if topics.is_empty() {
                self.setting.consumer.topics.clone()
            } else {
                topics.to_vec()
            };
            self.consumer()?.subscribe(&topics)?;
            info!(
                transport = %self.setting.transport_name,
                topics = ?topics,
                "consumer subscribed"
            );
            self.state = ConsumeState::Subscribed;
        }

        Ok(Messages {
            connection: self,
            done: false,
        })
    }

    /// Commit the offset of `message`
    pub fn ack(&mut self, message: &BrokerMessage) -> Result<()> {
        let mode = self.setting.consumer.commit_mode();
        self.consumer()?.commit(message, mode)?;
        debug!(
            topic = %message.topic,
            partition = message.partition,
            offset = message.offset,
            ?mode,
            "offset committed"
        );
        Ok(())
    }

    /// Rejection only moves the offset forward, like [`Self::ack`]
    pub fn reject(&mut self, message: &BrokerMessage) -> Result<()> {
        self.ack(message)
    }

    /// Enqueue `message` on every destination topic of its identifier.
    /// Fails with [`TransportError::NoDestination`] when there is none.
    ///
    /// `transform`, when given, supplies the body per topic instead of
    /// `message.body`.
    pub fn produce(
        &mut self,
        message: OutboundMessage,
        mut transform: Option<BodyTransform<'_>>,
    ) -> Result<()> {
        let setting = Arc::clone(&self.setting);
        let destinations = setting.producer.destinations(message.identifier.as_deref());
        if destinations.is_empty() {
            let identifier = message.identifier.unwrap_or_default();
            error!(%identifier, "no destination topic for message");
            return Err(TransportError::NoDestination(identifier));
        }

        let poll_timeout = setting.producer.poll_timeout();
        let producer = self.producer()?;
        for topic in destinations {
            let body = match transform.as_deref_mut() {
                Some(transform) => transform(topic)?,
                None => message.body.clone(),
            };

            producer.send(ProducerRecord {
                topic: topic.to_string(),
                partition: message.partition,
                flags: message.flags,
                key: message.key.clone(),
                payload: Some(body),
                headers: message.headers.clone(),
            })?;
            producer.poll(poll_timeout);
            debug!(topic, "message enqueued");
        }

        if message.force_flush {
            self.flush()?;
        }
        Ok(())
    }

    /// Wait for outstanding deliveries, trying up to [`FLUSH_ATTEMPTS`] times
    pub fn flush(&mut self) -> Result<()> {
        let timeout = self.setting.producer.flush_timeout();
        let producer = self.producer()?;

        let mut attempt = 1;
        loop {
            let code = producer.flush(timeout);
            if code == BrokerErrorCode::NoError {
                debug!(attempt, "producer flushed");
                return Ok(());
            }
            if attempt == FLUSH_ATTEMPTS {
                error!(attempts = attempt, %code, "producer flush failed");
                return Err(TransportError::Flush {
                    attempts: attempt,
                    code,
                });
            }
            warn!(attempt, %code, "producer flush incomplete, retrying");
            attempt += 1;
        }
    }

    fn consumer(&mut self) -> Result<&mut F::Consumer> {
        let (factory, setting) = (&self.factory, &self.setting);
        self.consumer.get_or_try_init(|| {
            let consumer = factory.create_consumer(&setting.consumer_config())?;
            info!(transport = %setting.transport_name, host = %setting.host, "consumer created");
            Ok::<_, TransportError>(consumer)
        })
    }

    fn producer(&mut self) -> Result<&mut F::Producer> {
        let (factory, setting) = (&self.factory, &self.setting);
        self.producer.get_or_try_init(|| {
            let producer = factory.create_producer(&setting.producer_config())?;
            info!(transport = %setting.transport_name, host = %setting.host, "producer created");
            Ok::<_, TransportError>(producer)
        })
    }

    /// True once the loop must not poll again
    fn stopped(&mut self) -> bool {
        if self.state != ConsumeState::Stopped && self.shutdown.is_cancelled() {
            info!(
                transport = %self.setting.transport_name,
                from = ?self.state,
                "stop requested, leaving consume loop"
            );
            self.state = ConsumeState::Stopped;
        }
        self.state == ConsumeState::Stopped
    }

    fn poll_once(&mut self) -> Result<Polled> {
        let timeout = self.setting.consumer.consume_timeout();
        self.state = ConsumeState::Polling;
        let message = self.consumer()?.poll(timeout);

        match message.err {
            BrokerErrorCode::NoError => {
                let routed = message
                    .identifier()
                    .is_some_and(|identifier| self.setting.consumer.routes(identifier));
                if routed {
                    return Ok(Polled::Message(message));
                }

                warn!(
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    identifier = message.identifier().unwrap_or_default(),
                    "no route for message, acknowledging and skipping"
                );
                self.ack(&message)?;
                Ok(Polled::Skipped)
            }
            code if code.is_recoverable() => {
                debug!(%code, "no message available");
                Ok(Polled::Empty)
            }
            code => {
                let reason = message.error_string();
                error!(%code, error = %reason, "fatal consume error");
                Err(TransportError::Consume {
                    code,
                    message: reason,
                })
            }
        }
    }
}

/// Blocking pull over consumed messages.
///
/// Each item is a deliverable message, `None` for a poll that found nothing,
/// or a fatal error after which the iterator ends. The iterator also ends
/// when the shutdown token is observed, and every later iterator of the same
/// connection is empty.
pub struct Messages<'a, F: ClientFactory> {
    connection: &'a mut ConnectionManager<F>,
    done: bool,
}

impl<F: ClientFactory> Iterator for Messages<'_, F> {
    type Item = Result<Option<BrokerMessage>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.connection.stopped() {
                self.done = true;
                return None;
            }

            match self.connection.poll_once() {
                Ok(Polled::Message(message)) => {
                    self.connection.state = ConsumeState::Yielding;
                    return Some(Ok(Some(message)));
                }
                Ok(Polled::Empty) => return Some(Ok(None)),
                Ok(Polled::Skipped) => continue,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
