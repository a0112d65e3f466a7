//! HPACK header block decoding (RFC 7541).
//!
//! Implements the decoding half of HPACK:
//! - Prefix integer decoding with bounded continuation
//! - String literals, raw or Huffman coded
//! - The five header field representations
//! - Dynamic table maintenance mirroring the peer's encoder

use bytes::Bytes;

use crate::cursor::ByteCursor;
use crate::error::HpackError;
use crate::huffman;
use crate::settings::Settings;
use crate::table::{DynamicTable, HeaderField, HeaderTable};

/// Largest integer accepted from the wire: 2^53 - 1.
pub const MAX_INTEGER: u64 = (1 << 53) - 1;

/// Maximum continuation octets following a saturated prefix. Eight octets
/// already cover [`MAX_INTEGER`]; the extra two tolerate zero padding.
pub const MAX_INTEGER_CONTINUATION_OCTETS: u32 = 10;

// -- Primitives --

/// Decode a prefix integer (RFC 7541 Section 5.1).
///
/// `prefix` is the value of the low `prefix_bits` bits of the first octet,
/// already extracted by the caller. Continuation octets, if any, are read
/// from `cur`.
pub fn decode_int(cur: &mut ByteCursor, prefix: u8, prefix_bits: u8) -> Result<u64, HpackError> {
    debug_assert!((1..=8).contains(&prefix_bits));
    let max = (1u64 << prefix_bits) - 1;
    let prefix = u64::from(prefix);
    if prefix < max {
        return Ok(prefix);
    }
    if prefix != max {
        return Err(HpackError::protocol(format!(
            "integer prefix {prefix} exceeds {prefix_bits}-bit field"
        )));
    }

    let mut value = max;
    for i in 0..MAX_INTEGER_CONTINUATION_OCTETS {
        let byte = cur.read_u8("HPACK integer")?;
        value = u64::from(byte & 0x7f)
            .checked_mul(1u64 << (7 * i))
            .and_then(|increment| value.checked_add(increment))
            .filter(|&v| v <= MAX_INTEGER)
            .ok_or_else(|| HpackError::protocol("integer too large"))?;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }

    Err(HpackError::protocol(format!(
        "integer continues past {MAX_INTEGER_CONTINUATION_OCTETS} octets"
    )))
}

fn to_usize(value: u64) -> Result<usize, HpackError> {
    usize::try_from(value).map_err(|_| HpackError::protocol("integer too large"))
}

/// Decode a string literal (RFC 7541 Section 5.2).
pub fn decode_string(cur: &mut ByteCursor) -> Result<Bytes, HpackError> {
    let (huffman_coded, prefix) = cur.read_u1p7("HPACK string length")?;
    let len = to_usize(decode_int(cur, prefix, 7)?)?;
    if huffman_coded {
        let encoded = cur.read_slice(len, "HPACK string (huffman encoded)")?;
        Ok(Bytes::from(huffman::decode(&encoded)?))
    } else {
        cur.read_slice(len, "HPACK string")
    }
}

// -- Representations --

/// Header field representation, selected by the leading bits of the first
/// octet (RFC 7541 Section 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// `1xxxxxxx`: indexed header field, 7-bit index.
    Indexed,
    /// `01xxxxxx`: literal with incremental indexing, 6-bit name index.
    LiteralWithIndexing,
    /// `0000xxxx`: literal without indexing, 4-bit name index.
    LiteralWithoutIndexing,
    /// `0001xxxx`: literal never indexed, 4-bit name index.
    LiteralNeverIndexed,
    /// `001xxxxx`: dynamic table size update, 5-bit size.
    SizeUpdate,
}

impl Representation {
    pub fn classify(head: u8) -> Self {
        match head {
            0x80..=0xff => Self::Indexed,
            0x40..=0x7f => Self::LiteralWithIndexing,
            0x20..=0x3f => Self::SizeUpdate,
            0x10..=0x1f => Self::LiteralNeverIndexed,
            0x00..=0x0f => Self::LiteralWithoutIndexing,
        }
    }

    pub fn prefix_bits(self) -> u8 {
        match self {
            Self::Indexed => 7,
            Self::LiteralWithIndexing => 6,
            Self::SizeUpdate => 5,
            Self::LiteralWithoutIndexing | Self::LiteralNeverIndexed => 4,
        }
    }

    /// The integer prefix carried in the low bits of `head`.
    pub fn prefix(self, head: u8) -> u8 {
        head & (((1u16 << self.prefix_bits()) - 1) as u8)
    }
}

/// A decoded field plus its never-indexed marker.
///
/// An intermediary that re-encodes a never-indexed field must use the same
/// representation (RFC 7541 Section 6.2.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedField {
    pub field: HeaderField,
    pub never_indexed: bool,
}

// -- Decoder --

/// HPACK decoder. Owns the header table for one direction of a connection;
/// every header block received in that direction must pass through the same
/// decoder, in order.
#[derive(Debug)]
pub struct Decoder {
    table: HeaderTable,
    /// Upper bound for dynamic table size updates (our SETTINGS_HEADER_TABLE_SIZE).
    max_table_size: usize,
    max_header_list_size: Option<usize>,
}

impl Decoder {
    pub fn new(settings: &Settings) -> Self {
        let max_table_size = settings.header_table_size as usize;
        Self {
            table: HeaderTable::new(max_table_size),
            max_table_size,
            max_header_list_size: settings.max_header_list_size.map(|n| n as usize),
        }
    }

    /// Update the bound for size updates after our SETTINGS are acknowledged.
    ///
    /// The table itself is only resized by a size update instruction from the
    /// encoder.
    pub fn set_max_table_size(&mut self, max_size: usize) {
        self.max_table_size = max_size;
    }

    pub fn max_table_size(&self) -> usize {
        self.max_table_size
    }

    /// Look up a field by combined static/dynamic index.
    pub fn field_at(&self, index: usize) -> Result<&HeaderField, HpackError> {
        self.table.field_at(index)
    }

    pub fn dynamic_table(&self) -> &DynamicTable {
        self.table.dynamic()
    }

    /// Decode a complete header block.
    ///
    /// The dynamic table is updated as instructions are applied; on error it
    /// may be left partially updated and the decoder must be discarded along
    /// with the connection.
    pub fn decode(&mut self, block: impl Into<Bytes>) -> Result<Vec<DecodedField>, HpackError> {
        let mut cur = ByteCursor::new(block);
        let mut fields = Vec::new();
        let mut list_size = 0usize;

        while !cur.is_at_end() {
            let head = cur.read_u8("HPACK head")?;
            let kind = Representation::classify(head);
            let prefix = kind.prefix(head);

            let decoded = match kind {
                Representation::Indexed => {
                    let index = to_usize(decode_int(&mut cur, prefix, 7)?)?;
                    let field = self.table.field_at(index)?.clone();
                    tracing::trace!(index, "indexed header field");
                    DecodedField {
                        field,
                        never_indexed: false,
                    }
                }
                Representation::LiteralWithIndexing => {
                    let field = self.read_literal(&mut cur, kind, prefix)?;
                    let evicted = self.table.dynamic_mut().add(field.clone());
                    tracing::trace!(
                        evicted,
                        table_size = self.table.dynamic().size(),
                        "literal header field with incremental indexing"
                    );
                    DecodedField {
                        field,
                        never_indexed: false,
                    }
                }
                Representation::LiteralWithoutIndexing | Representation::LiteralNeverIndexed => {
                    let field = self.read_literal(&mut cur, kind, prefix)?;
                    let never_indexed = kind == Representation::LiteralNeverIndexed;
                    tracing::trace!(never_indexed, "literal header field without indexing");
                    DecodedField {
                        field,
                        never_indexed,
                    }
                }
                Representation::SizeUpdate => {
                    let new_size = to_usize(decode_int(&mut cur, prefix, 5)?)?;
                    self.apply_size_update(new_size)?;
                    continue;
                }
            };

            list_size += decoded.field.size();
            if let Some(limit) = self.max_header_list_size {
                if list_size > limit {
                    return Err(HpackError::protocol(format!(
                        "header list size exceeds {limit} bytes"
                    )));
                }
            }
            fields.push(decoded);
        }

        Ok(fields)
    }

    /// Read the name (indexed or literal) and literal value of a literal
    /// representation.
    fn read_literal(
        &self,
        cur: &mut ByteCursor,
        kind: Representation,
        prefix: u8,
    ) -> Result<HeaderField, HpackError> {
        let name = if prefix == 0 {
            decode_string(cur)?
        } else {
            let index = to_usize(decode_int(cur, prefix, kind.prefix_bits())?)?;
            self.table.field_at(index)?.name.clone()
        };
        let value = decode_string(cur)?;
        Ok(HeaderField { name, value })
    }

    fn apply_size_update(&mut self, new_size: usize) -> Result<(), HpackError> {
        if new_size > self.max_table_size {
            return Err(HpackError::protocol(format!(
                "dynamic table size update to {new_size} exceeds limit {}",
                self.max_table_size
            )));
        }
        let table = self.table.dynamic_mut();
        let old_size = table.capacity();
        let evicted = table.set_capacity(new_size);
        tracing::debug!(old_size, new_size, evicted, "dynamic table size update");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Reference prefix integer encoder.
    fn encode_int(buf: &mut Vec<u8>, value: u64, prefix_bits: u8, pattern: u8) {
        let max = (1u64 << prefix_bits) - 1;
        if value < max {
            buf.push(pattern | value as u8);
        } else {
            buf.push(pattern | max as u8);
            let mut remaining = value - max;
            while remaining >= 128 {
                buf.push(0x80 | (remaining & 0x7f) as u8);
                remaining >>= 7;
            }
            buf.push(remaining as u8);
        }
    }

    /// Decode an integer whose prefix sits in the first octet of `buf`.
    fn decode_from(buf: &[u8], prefix_bits: u8) -> (Result<u64, HpackError>, ByteCursor) {
        let mut cur = ByteCursor::new(buf.to_vec());
        let head = cur.read_u8("head").unwrap();
        let mask = ((1u16 << prefix_bits) - 1) as u8;
        let result = decode_int(&mut cur, head & mask, prefix_bits);
        (result, cur)
    }

    fn decoder() -> Decoder {
        Decoder::new(&Settings::default())
    }

    fn field(name: &str, value: &str) -> HeaderField {
        HeaderField::new(name.to_owned(), value.to_owned())
    }

    #[test]
    fn rfc7541_appendix_c1_integer_examples() {
        // C.1.1: 10 with a 5-bit prefix.
        let (value, cur) = decode_from(&[0x0a], 5);
        assert_eq!(value.unwrap(), 10);
        assert!(cur.is_at_end());

        // C.1.2: 1337 with a 5-bit prefix.
        let (value, cur) = decode_from(&[0x1f, 0x9a, 0x0a], 5);
        assert_eq!(value.unwrap(), 1337);
        assert!(cur.is_at_end());

        // C.1.3: 42 at an octet boundary.
        let (value, _) = decode_from(&[0x2a], 8);
        assert_eq!(value.unwrap(), 42);
    }

    #[test]
    fn mismatched_prefix_width() {
        let mut cur = ByteCursor::new(Bytes::new());
        assert!(matches!(
            decode_int(&mut cur, 40, 5),
            Err(HpackError::ProtocolError(_))
        ));
    }

    #[test]
    fn truncated_integer_is_malformed() {
        let (value, _) = decode_from(&[0x1f, 0x9a], 5);
        assert!(matches!(value, Err(HpackError::MalformedFrame(_))));
    }

    #[test]
    fn zero_continuation_flood_is_capped() {
        let mut buf = vec![0x1f];
        buf.extend(std::iter::repeat_n(0x80, 64));
        let (value, cur) = decode_from(&buf, 5);
        assert!(matches!(value, Err(HpackError::ProtocolError(_))));
        assert_eq!(cur.position(), 1 + MAX_INTEGER_CONTINUATION_OCTETS as usize);
    }

    #[test]
    fn zero_padded_continuation_is_accepted() {
        // 31 + 1, with two redundant zero continuation groups.
        let (value, _) = decode_from(&[0x1f, 0x81, 0x80, 0x00], 5);
        assert_eq!(value.unwrap(), 32);
    }

    #[test]
    fn integer_range_boundary() {
        let mut buf = Vec::new();
        encode_int(&mut buf, MAX_INTEGER, 7, 0x80);
        let (value, _) = decode_from(&buf, 7);
        assert_eq!(value.unwrap(), MAX_INTEGER);

        let mut buf = Vec::new();
        encode_int(&mut buf, MAX_INTEGER + 1, 7, 0x80);
        let (value, _) = decode_from(&buf, 7);
        assert!(matches!(value, Err(HpackError::ProtocolError(_))));

        let buf = [0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        let (value, _) = decode_from(&buf, 7);
        assert!(matches!(value, Err(HpackError::ProtocolError(_))));
    }

    #[test]
    fn classify_every_octet() {
        for head in 0..=255u8 {
            let kind = Representation::classify(head);
            let expected = if head & 0x80 != 0 {
                Representation::Indexed
            } else if head & 0x40 != 0 {
                Representation::LiteralWithIndexing
            } else if head & 0x20 != 0 {
                Representation::SizeUpdate
            } else if head & 0x10 != 0 {
                Representation::LiteralNeverIndexed
            } else {
                Representation::LiteralWithoutIndexing
            };
            assert_eq!(kind, expected, "head {head:#010b}");
            assert!(kind.prefix(head) < (1 << kind.prefix_bits()));
        }
    }

    #[test]
    fn raw_and_huffman_strings() {
        let mut cur = ByteCursor::new(Bytes::from_static(b"\x03abc"));
        assert_eq!(decode_string(&mut cur).unwrap(), Bytes::from_static(b"abc"));

        let mut encoded = vec![0x82];
        encoded.extend_from_slice(&[0xee, 0x1f]); // "v1"
        let mut cur = ByteCursor::new(encoded);
        assert_eq!(decode_string(&mut cur).unwrap(), Bytes::from_static(b"v1"));
        assert!(cur.is_at_end());
    }

    #[test]
    fn string_longer_than_block_is_malformed() {
        let mut cur = ByteCursor::new(Bytes::from_static(b"\x05ab"));
        assert!(matches!(
            decode_string(&mut cur),
            Err(HpackError::MalformedFrame(_))
        ));
    }

    #[test]
    fn rfc7541_c2_1_literal_with_indexing() {
        let mut dec = decoder();
        let mut block = vec![0x40, 0x0a];
        block.extend_from_slice(b"custom-key");
        block.push(0x0d);
        block.extend_from_slice(b"custom-header");
        let fields = dec.decode(block).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field, field("custom-key", "custom-header"));
        assert!(!fields[0].never_indexed);
        assert_eq!(dec.dynamic_table().size(), 55);
        assert_eq!(dec.field_at(62).unwrap(), &field("custom-key", "custom-header"));
    }

    #[test]
    fn rfc7541_c2_2_literal_without_indexing() {
        let mut dec = decoder();
        let mut block = vec![0x04, 0x0c];
        block.extend_from_slice(b"/sample/path");
        let fields = dec.decode(block).unwrap();
        assert_eq!(fields[0].field, field(":path", "/sample/path"));
        assert!(dec.dynamic_table().is_empty());
    }

    #[test]
    fn rfc7541_c2_3_literal_never_indexed() {
        let mut dec = decoder();
        let mut block = vec![0x10, 0x08];
        block.extend_from_slice(b"password");
        block.push(0x06);
        block.extend_from_slice(b"secret");
        let fields = dec.decode(block).unwrap();
        assert_eq!(fields[0].field, field("password", "secret"));
        assert!(fields[0].never_indexed);
        assert!(dec.dynamic_table().is_empty());
    }

    #[test]
    fn rfc7541_c2_4_indexed() {
        let mut dec = decoder();
        let fields = dec.decode(Bytes::from_static(&[0x82])).unwrap();
        assert_eq!(fields[0].field, field(":method", "GET"));
    }

    #[test]
    fn indexed_name_from_dynamic_table() {
        let mut dec = decoder();
        dec.decode(Bytes::from_static(b"\x40\x06x-test\x02v1")).unwrap();
        // Without indexing, name index 62 (saturates the 4-bit prefix).
        let fields = dec.decode(Bytes::from_static(b"\x0f\x2f\x02v2")).unwrap();
        assert_eq!(fields[0].field, field("x-test", "v2"));
        assert_eq!(dec.dynamic_table().len(), 1);
    }

    #[test]
    fn invalid_indices() {
        let mut dec = decoder();
        assert!(matches!(
            dec.decode(Bytes::from_static(&[0x80])),
            Err(HpackError::ProtocolError(_))
        ));
        assert!(matches!(
            dec.decode(Bytes::from_static(&[0xbe])),
            Err(HpackError::ProtocolError(_))
        ));
        // Indexed name pointing past the dynamic table.
        assert!(matches!(
            dec.decode(Bytes::from_static(b"\x7f\x00\x01v")),
            Err(HpackError::ProtocolError(_))
        ));
    }

    #[test]
    fn empty_block() {
        let mut dec = decoder();
        assert!(dec.decode(Bytes::new()).unwrap().is_empty());
    }

    #[test]
    fn size_update_evicts_and_is_bounded() {
        let mut dec = decoder();
        dec.decode(Bytes::from_static(b"\x40\x01a\x011\x40\x01b\x012")).unwrap();
        assert_eq!(dec.dynamic_table().size(), 68);

        // 001xxxxx with 5-bit prefix: 0x3f 0x09 = 31 + 9 = 40.
        dec.decode(Bytes::from_static(&[0x3f, 0x09])).unwrap();
        assert_eq!(dec.dynamic_table().capacity(), 40);
        assert_eq!(dec.dynamic_table().len(), 1);
        assert_eq!(dec.field_at(62).unwrap(), &field("b", "2"));

        // 4097 > SETTINGS_HEADER_TABLE_SIZE.
        let mut buf = Vec::new();
        encode_int(&mut buf, 4097, 5, 0x20);
        assert!(matches!(dec.decode(buf), Err(HpackError::ProtocolError(_))));

        dec.set_max_table_size(8192);
        let mut buf = Vec::new();
        encode_int(&mut buf, 4097, 5, 0x20);
        dec.decode(buf).unwrap();
        assert_eq!(dec.dynamic_table().capacity(), 4097);
    }

    #[test]
    fn header_list_size_limit() {
        let settings = Settings {
            max_header_list_size: Some(80),
            ..Settings::default()
        };
        let mut dec = Decoder::new(&settings);
        // :method GET is 42 bytes; two of them exceed 80.
        dec.decode(Bytes::from_static(&[0x82])).unwrap();
        assert!(matches!(
            dec.decode(Bytes::from_static(&[0x82, 0x82])),
            Err(HpackError::ProtocolError(_))
        ));
    }

    #[test]
    fn huffman_failure_is_protocol_error() {
        let mut dec = decoder();
        // Huffman value "a" with zero padding bits.
        assert!(matches!(
            dec.decode(Bytes::from_static(&[0x04, 0x81, 0x18])),
            Err(HpackError::ProtocolError(_))
        ));
    }

    proptest! {
        #[test]
        fn small_values_take_one_octet(prefix_bits in 1u8..=8, seed in any::<u8>()) {
            let max = ((1u16 << prefix_bits) - 1) as u8;
            let value = seed % max;
            let (decoded, cur) = decode_from(&[value], prefix_bits);
            prop_assert_eq!(decoded.unwrap(), u64::from(value));
            prop_assert!(cur.is_at_end());
        }

        #[test]
        fn integer_roundtrip(prefix_bits in 1u8..=8, value in 0u64..=MAX_INTEGER) {
            let mut buf = Vec::new();
            encode_int(&mut buf, value, prefix_bits, 0);
            let (decoded, cur) = decode_from(&buf, prefix_bits);
            let decoded = decoded.unwrap();
            prop_assert_eq!(decoded, value);
            prop_assert!(cur.is_at_end());
            let mut reencoded = Vec::new();
            encode_int(&mut reencoded, decoded, prefix_bits, 0);
            prop_assert_eq!(reencoded, buf);
        }
    }
}
