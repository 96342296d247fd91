//! Little-endian integer and string primitives of the native wire format.

use crate::{Result, transport::TransportError};

pub fn put_u8(buf: &mut Vec<u8>, value: u8) {
    buf.push(value);
}

pub fn put_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

pub fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Writes a `u32` byte length followed by the UTF-8 bytes of `value`.
pub fn put_str(buf: &mut Vec<u8>, value: &str) -> Result<()> {
    put_u32(buf, len_u32(value.len())?);
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

/// Converts a length to the `u32` the wire format carries.
pub fn len_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        TransportError::Protocol {
            reason: format!("length {len} does not fit in u32"),
        }
        .into()
    })
}

/// A cursor decoding primitives from a frame body.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(TransportError::Protocol {
                reason: format!(
                    "truncated frame: needed {n} bytes at offset {}, {} left",
                    self.pos,
                    self.remaining()
                ),
            }
            .into());
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        let mut bytes = [0u8; 2];
        bytes.copy_from_slice(self.take(2)?);
        Ok(u16::from_le_bytes(bytes))
    }

    pub fn u32(&mut self) -> Result<u32> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(bytes))
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn str(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| {
            TransportError::Protocol {
                reason: format!("string is not valid UTF-8: {e}"),
            }
            .into()
        })
    }

    /// Fails unless the whole buffer was consumed.
    pub fn finish(self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(TransportError::Protocol {
                reason: format!("{} trailing bytes in frame", self.remaining()),
            }
            .into());
        }
        Ok(())
    }
}
