use courier_avro::CodecError;
use thiserror::Error;

use crate::domain::RegistryErrorCode;

/// Domain error for registry operations
///
/// Infrastructure implementations convert their transport specific errors
/// into this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Registry error {code}: {message}")]
    Api {
        code: RegistryErrorCode,
        message: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Registry returned an unusable schema: {0}")]
    InvalidSchema(#[from] CodecError),
}

impl RegistryError {
    pub fn api(code: RegistryErrorCode, message: impl Into<String>) -> Self {
        RegistryError::Api {
            code,
            message: message.into(),
        }
    }

    /// True for the codes a lookup treats as an absent result
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::Api { code, .. } if code.is_not_found())
    }
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Malformed registry wire framing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("payload of {0} bytes is shorter than the 5 byte header")]
    TooShort(usize),

    #[error("unknown magic byte {0:#04x}")]
    MagicByte(u8),
}

/// Errors from encoding or decoding a registry framed payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaCodecError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Wire(#[from] WireError),
}
