//! Codec error types

use thiserror::Error;

/// Errors raised while parsing schemas or encoding/decoding values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unsupported schema kind: {0}")]
    UnsupportedSchemaKind(String),

    #[error("unknown named type: {0}")]
    UnknownName(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("value {found} does not match schema {expected}")]
    TypeMismatch { expected: String, found: String },

    #[error("record {record} is missing field {field}")]
    MissingField { record: String, field: String },

    #[error("symbol {symbol} is not part of enum {name}")]
    UnknownSymbol { name: String, symbol: String },

    #[error("fixed {name} expects {expected} bytes, got {actual}")]
    FixedSize {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("union has no branch named {0}")]
    UnionBranchNotFound(String),

    #[error("value is not valid against union branch {0}")]
    UnionBranchRejected(String),

    #[error("no union branch matches the value {0}")]
    NoMatchingBranch(String),

    #[error("union branch index {index} out of range ({len} branches)")]
    UnionIndexOutOfRange { index: i64, len: usize },

    #[error("enum index {index} out of range for {name}")]
    EnumIndexOutOfRange { name: String, index: i64 },

    #[error("unexpected end of input at offset {offset}: needed {needed} more bytes")]
    UnexpectedEof { offset: usize, needed: usize },

    #[error("variable-length integer exceeds 64 bits")]
    VarintOverflow,

    #[error("block of {count} items exceeds the limit of {limit}")]
    BlockTooLarge { count: i64, limit: usize },

    #[error("negative length {0}")]
    NegativeLength(i64),

    #[error("integer {0} does not fit in an Avro int")]
    IntOverflow(i64),

    #[error("invalid boolean byte {0:#04x}")]
    InvalidBoolean(u8),

    #[error("invalid UTF-8 in string: {0}")]
    InvalidUtf8(String),
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::InvalidSchema(err.to_string())
    }
}

pub type CodecResult<T> = std::result::Result<T, CodecError>;
