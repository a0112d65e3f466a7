//! Bounds-checked sequential reader over a byte buffer.
//!
//! Every read takes a short label naming the field being read so that a
//! truncated frame reports which field ran out of bytes.

use bytes::Bytes;

use crate::error::HpackError;

/// Sequential reader with a cursor into an immutable [`Bytes`] buffer.
///
/// Slices handed out by [`ByteCursor::read_slice`] share the underlying
/// allocation; nothing is copied until the caller materializes it.
#[derive(Debug, Clone)]
pub struct ByteCursor {
    buf: Bytes,
    pos: usize,
}

impl ByteCursor {
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self {
            buf: buf.into(),
            pos: 0,
        }
    }

    /// Read one byte.
    pub fn read_u8(&mut self, what: &str) -> Result<u8, HpackError> {
        self.ensure(1, what)?;
        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    /// Read one byte split into its top bit and low 7 bits.
    pub fn read_u1p7(&mut self, what: &str) -> Result<(bool, u8), HpackError> {
        let byte = self.read_u8(what)?;
        Ok((byte & 0x80 != 0, byte & 0x7f))
    }

    /// Read a big-endian u32 split into its top bit and low 31 bits.
    pub fn read_u1p31(&mut self, what: &str) -> Result<(bool, u32), HpackError> {
        self.ensure(4, what)?;
        let b = &self.buf[self.pos..self.pos + 4];
        let raw = u32::from_be_bytes([b[0], b[1], b[2], b[3]]);
        self.pos += 4;
        Ok((raw & 0x8000_0000 != 0, raw & 0x7fff_ffff))
    }

    /// Read the next `n` bytes as a shared slice of the buffer.
    pub fn read_slice(&mut self, n: usize, what: &str) -> Result<Bytes, HpackError> {
        self.ensure(n, what)?;
        let slice = self.buf.slice(self.pos..self.pos + n);
        self.pos += n;
        Ok(slice)
    }

    /// Advance past `n` bytes.
    pub fn skip(&mut self, n: usize, what: &str) -> Result<(), HpackError> {
        self.ensure(n, what)?;
        self.pos += n;
        Ok(())
    }

    /// Unread bytes, without consuming them.
    pub fn remaining(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    pub fn remaining_len(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos == self.buf.len()
    }

    fn ensure(&self, n: usize, what: &str) -> Result<(), HpackError> {
        let left = self.remaining_len();
        if n > left {
            return Err(HpackError::malformed(format!(
                "{what}: need {n} bytes, {left} remaining"
            )));
        }
        Ok(())
    }
}
