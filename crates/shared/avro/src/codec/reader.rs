//! Byte cursor for decoding

use crate::error::{CodecError, CodecResult};

/// Cursor over a byte buffer, consumed left to right.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Number of bytes consumed so far
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_byte(&mut self) -> CodecResult<u8> {
        Ok(self.read_exact(1)?[0])
    }

    pub fn read_exact(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(CodecError::UnexpectedEof {
                offset: self.position,
                needed: len - self.remaining(),
            });
        }
        let slice = &self.bytes[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    /// Zig-zag encoded variable-length long
    pub fn read_long(&mut self) -> CodecResult<i64> {
        let mut raw: u64 = 0;
        let mut shift = 0u32;
        loop {
            if shift >= 64 {
                return Err(CodecError::VarintOverflow);
            }
            let byte = self.read_byte()?;
            raw |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
    }

    pub fn read_int(&mut self) -> CodecResult<i32> {
        let value = self.read_long()?;
        i32::try_from(value).map_err(|_| CodecError::IntOverflow(value))
    }

    /// Length prefix of a bytes/string value
    pub fn read_len(&mut self) -> CodecResult<usize> {
        let len = self.read_long()?;
        if len < 0 {
            return Err(CodecError::NegativeLength(len));
        }
        Ok(len as usize)
    }
}

/// Append a zig-zag encoded variable-length long.
pub fn write_long(value: i64, out: &mut Vec<u8>) {
    let mut raw = ((value << 1) ^ (value >> 63)) as u64;
    while raw & !0x7f != 0 {
        out.push(((raw & 0x7f) | 0x80) as u8);
        raw >>= 7;
    }
    out.push(raw as u8);
}
