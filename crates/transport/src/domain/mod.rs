//! Domain Layer
//!
//! Settings snapshots and connection lifecycle state.

mod handle;
mod settings;
mod shutdown;

pub use handle::{ConsumeState, Handle};
pub use settings::{
    BROKER_LIST_KEY, ConsumerSetting, GeneralSetting, KafkaConfig, ProducerSetting, SerializerKind,
};
pub use shutdown::ShutdownToken;
