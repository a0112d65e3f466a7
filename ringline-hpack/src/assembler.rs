//! Header block reassembly (RFC 7540 Sections 4.3, 6.2, 6.10).
//!
//! A header block arrives as one HEADERS frame followed by zero or more
//! CONTINUATION frames on the same stream. Fragments are accumulated until
//! END_HEADERS, then the whole block is decoded in one pass and routed into
//! the message.
//!
//! ```text
//!   HEADERS ──┐
//!   CONTINUATION ──> PendingHeaderBlock ──(END_HEADERS)──> Decoder ──> MessageSink
//!   CONTINUATION ──┘
//! ```

use bytes::{Bytes, BytesMut};

use crate::cursor::ByteCursor;
use crate::error::HpackError;
use crate::frame::{FLAG_PADDED, FLAG_PRIORITY, Frame, Priority};
use crate::hpack::Decoder;
use crate::message::{MessageSink, route_field};

/// Assembler state. `Decoded` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    /// Waiting for the frame that carries END_HEADERS.
    Accumulating,
    /// The block has been decoded and the message finalized.
    Decoded,
}

/// Header block fragments received so far.
#[derive(Debug, Default)]
pub struct PendingHeaderBlock {
    buf: BytesMut,
}

impl PendingHeaderBlock {
    pub fn append(&mut self, fragment: &[u8]) {
        self.buf.extend_from_slice(fragment);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Take the accumulated bytes, leaving the block empty.
    pub fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

/// Reassembles and decodes the header block of one message.
///
/// The [`Decoder`] is borrowed per call rather than owned: its dynamic table
/// belongs to the connection and outlives every message.
#[derive(Debug)]
pub struct HeaderBlockAssembler {
    state: AssemblerState,
    /// Stream that opened the block with a HEADERS frame.
    stream_id: Option<u32>,
    priority: Option<Priority>,
    pending: PendingHeaderBlock,
}

impl Default for HeaderBlockAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderBlockAssembler {
    pub fn new() -> Self {
        Self {
            state: AssemblerState::Accumulating,
            stream_id: None,
            priority: None,
            pending: PendingHeaderBlock::default(),
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    pub fn stream_id(&self) -> Option<u32> {
        self.stream_id
    }

    /// Priority fields of the opening HEADERS frame, if it had PRIORITY set.
    pub fn priority(&self) -> Option<Priority> {
        self.priority
    }

    pub fn pending(&self) -> &PendingHeaderBlock {
        &self.pending
    }

    /// Accept the HEADERS frame that opens the block.
    pub fn on_headers_frame<M: MessageSink + ?Sized>(
        &mut self,
        frame: &Frame,
        decoder: &mut Decoder,
        message: &mut M,
    ) -> Result<AssemblerState, HpackError> {
        self.ensure_accumulating()?;
        if frame.stream_id == 0 {
            return Err(HpackError::malformed("HEADERS frame on stream 0"));
        }
        if let Some(open) = self.stream_id {
            return Err(HpackError::protocol(format!(
                "HEADERS on stream {} while the header block of stream {open} is open",
                frame.stream_id
            )));
        }

        let (fragment, priority) = split_headers_payload(frame)?;
        self.stream_id = Some(frame.stream_id);
        self.priority = priority;
        self.pending.append(&fragment);

        self.finish_if_end(frame, decoder, message)
    }

    /// Accept a CONTINUATION frame. The whole payload is block fragment.
    pub fn on_continuation_frame<M: MessageSink + ?Sized>(
        &mut self,
        frame: &Frame,
        decoder: &mut Decoder,
        message: &mut M,
    ) -> Result<AssemblerState, HpackError> {
        self.ensure_accumulating()?;
        if frame.stream_id == 0 {
            return Err(HpackError::malformed("CONTINUATION frame on stream 0"));
        }
        match self.stream_id {
            None => {
                return Err(HpackError::protocol(
                    "CONTINUATION without a preceding HEADERS frame",
                ));
            }
            Some(open) if open != frame.stream_id => {
                return Err(HpackError::protocol(format!(
                    "CONTINUATION on stream {} while the header block of stream {open} is open",
                    frame.stream_id
                )));
            }
            Some(_) => {}
        }

        self.pending.append(&frame.payload);

        self.finish_if_end(frame, decoder, message)
    }

    fn ensure_accumulating(&self) -> Result<(), HpackError> {
        match self.state {
            AssemblerState::Accumulating => Ok(()),
            AssemblerState::Decoded => Err(HpackError::protocol("header block already decoded")),
        }
    }

    fn finish_if_end<M: MessageSink + ?Sized>(
        &mut self,
        frame: &Frame,
        decoder: &mut Decoder,
        message: &mut M,
    ) -> Result<AssemblerState, HpackError> {
        if !frame.is_end_headers() {
            return Ok(self.state);
        }

        // One shot: a failed decode leaves the assembler unusable too.
        self.state = AssemblerState::Decoded;
        let block = self.pending.take();
        let block_len = block.len();

        // Decode fully before routing so a bad block emits nothing.
        let fields = decoder.decode(block)?;
        let field_count = fields.len();
        for field in fields {
            route_field(message, field);
        }
        message.finalize();

        tracing::debug!(
            stream_id = frame.stream_id,
            block_len,
            field_count,
            table_size = decoder.dynamic_table().size(),
            table_capacity = decoder.dynamic_table().capacity(),
            "header block decoded"
        );

        Ok(self.state)
    }
}

/// Strip padding and priority fields from a HEADERS payload (RFC 7540
/// Section 6.2), returning the header block fragment.
fn split_headers_payload(frame: &Frame) -> Result<(Bytes, Option<Priority>), HpackError> {
    let mut cur = ByteCursor::new(frame.payload.clone());

    let pad_len = if frame.is_set(FLAG_PADDED) {
        usize::from(cur.read_u8("Pad length")?)
    } else {
        0
    };
    if pad_len > frame.payload.len() {
        return Err(HpackError::malformed(format!(
            "pad length {pad_len} exceeds payload length {}",
            frame.payload.len()
        )));
    }

    let priority = if frame.is_set(FLAG_PRIORITY) {
        let (exclusive, dependency) = cur.read_u1p31("Stream dependency")?;
        let weight = cur.read_u8("Weight")?;
        tracing::trace!(
            stream_id = frame.stream_id,
            exclusive,
            dependency,
            weight,
            "HEADERS priority"
        );
        Some(Priority {
            exclusive,
            dependency,
            weight,
        })
    } else {
        None
    };

    let fragment_len = cur.remaining_len().checked_sub(pad_len).ok_or_else(|| {
        HpackError::malformed(format!(
            "pad length {pad_len} exceeds the {} bytes left after the frame fields",
            cur.remaining_len()
        ))
    })?;
    let fragment = cur.read_slice(fragment_len, "Header block fragment")?;
    cur.skip(pad_len, "Padding")?;
    if !cur.is_at_end() {
        return Err(HpackError::malformed("trailing bytes after padding"));
    }

    Ok((fragment, priority))
}
