//! The frame record delivered by the HTTP/2 framing layer.
//!
//! Only HEADERS and CONTINUATION frames reach this crate. The framing layer
//! has already split the 9-byte frame header (RFC 7540 Section 4.1) from the
//! payload and cleared the reserved bit of the stream identifier.

use bytes::Bytes;

// Flag constants (RFC 7540 Sections 6.2 and 6.10).
pub const FLAG_END_STREAM: u8 = 0x1;
pub const FLAG_END_HEADERS: u8 = 0x4;
pub const FLAG_PADDED: u8 = 0x8;
pub const FLAG_PRIORITY: u8 = 0x20;

/// A HEADERS or CONTINUATION frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// 31-bit stream identifier.
    pub stream_id: u32,
    pub flags: u8,
    /// Frame payload, still including any padding and priority fields.
    pub payload: Bytes,
}

impl Frame {
    pub fn new(stream_id: u32, flags: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            stream_id: stream_id & 0x7fff_ffff,
            flags,
            payload: payload.into(),
        }
    }

    pub fn is_set(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    pub fn is_end_headers(&self) -> bool {
        self.is_set(FLAG_END_HEADERS)
    }
}

/// Stream priority fields carried by a HEADERS frame with PRIORITY set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Priority {
    pub exclusive: bool,
    pub dependency: u32,
    pub weight: u8,
}
