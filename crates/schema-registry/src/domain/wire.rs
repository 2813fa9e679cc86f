use crate::error::WireError;

pub const MAGIC_BYTE: u8 = 0x00;

const HEADER_LEN: usize = 5;

/// Registry framing: `[magic 0x00][schema id, u32 big-endian][payload]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireEnvelope {
    pub schema_id: u32,
    pub payload: Vec<u8>,
}

impl WireEnvelope {
    pub fn new(schema_id: u32, payload: Vec<u8>) -> Self {
        Self { schema_id, payload }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.payload.len());
        bytes.push(MAGIC_BYTE);
        bytes.extend_from_slice(&self.schema_id.to_be_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < HEADER_LEN {
            return Err(WireError::TooShort(bytes.len()));
        }
        if bytes[0] != MAGIC_BYTE {
            return Err(WireError::MagicByte(bytes[0]));
        }
        let schema_id = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
        Ok(Self {
            schema_id,
            payload: bytes[HEADER_LEN..].to_vec(),
        })
    }
}
