use thiserror::Error;

use crate::message::BrokerErrorCode;

/// Errors reported by a broker client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("Broker error {code}: {message}")]
    Broker {
        code: BrokerErrorCode,
        message: String,
    },

    #[error("Client configuration rejected: {0}")]
    Configuration(String),

    #[error("Unexpected rebalance event: {0}")]
    Rebalance(String),
}

impl BrokerError {
    pub fn broker(code: BrokerErrorCode, message: impl Into<String>) -> Self {
        BrokerError::Broker {
            code,
            message: message.into(),
        }
    }

    /// Error code carried by the error, when it came from the broker
    pub fn code(&self) -> Option<BrokerErrorCode> {
        match self {
            BrokerError::Broker { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type BrokerResult<T> = std::result::Result<T, BrokerError>;
