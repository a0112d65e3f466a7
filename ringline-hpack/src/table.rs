//! HPACK header tables (RFC 7541 Section 2.3).
//!
//! The static table is a fixed 61-entry array. The dynamic table holds
//! recently indexed fields, newest first, bounded by a byte capacity. Both
//! share one index space: 1..=61 is static, 62.. is dynamic.

use std::collections::VecDeque;

use bytes::Bytes;

use crate::error::HpackError;

/// Per-entry overhead counted against the dynamic table capacity
/// (RFC 7541 Section 4.1).
pub const ENTRY_OVERHEAD: usize = 32;

/// A header name-value pair. HPACK treats both halves as opaque octets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub name: Bytes,
    pub value: Bytes,
}

impl HeaderField {
    pub fn new(name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub const fn from_static(name: &'static [u8], value: &'static [u8]) -> Self {
        Self {
            name: Bytes::from_static(name),
            value: Bytes::from_static(value),
        }
    }

    /// Size of this field for dynamic table accounting.
    pub fn size(&self) -> usize {
        self.name.len() + self.value.len() + ENTRY_OVERHEAD
    }
}

// -- Static table (RFC 7541 Appendix A) --

static STATIC_ENTRIES: [HeaderField; 61] = [
    HeaderField::from_static(b":authority", b""),
    HeaderField::from_static(b":method", b"GET"),
    HeaderField::from_static(b":method", b"POST"),
    HeaderField::from_static(b":path", b"/"),
    HeaderField::from_static(b":path", b"/index.html"),
    HeaderField::from_static(b":scheme", b"http"),
    HeaderField::from_static(b":scheme", b"https"),
    HeaderField::from_static(b":status", b"200"),
    HeaderField::from_static(b":status", b"204"),
    HeaderField::from_static(b":status", b"206"),
    HeaderField::from_static(b":status", b"304"),
    HeaderField::from_static(b":status", b"400"),
    HeaderField::from_static(b":status", b"404"),
    HeaderField::from_static(b":status", b"500"),
    HeaderField::from_static(b"accept-charset", b""),
    HeaderField::from_static(b"accept-encoding", b"gzip, deflate"),
    HeaderField::from_static(b"accept-language", b""),
    HeaderField::from_static(b"accept-ranges", b""),
    HeaderField::from_static(b"accept", b""),
    HeaderField::from_static(b"access-control-allow-origin", b""),
    HeaderField::from_static(b"age", b""),
    HeaderField::from_static(b"allow", b""),
    HeaderField::from_static(b"authorization", b""),
    HeaderField::from_static(b"cache-control", b""),
    HeaderField::from_static(b"content-disposition", b""),
    HeaderField::from_static(b"content-encoding", b""),
    HeaderField::from_static(b"content-language", b""),
    HeaderField::from_static(b"content-length", b""),
    HeaderField::from_static(b"content-location", b""),
    HeaderField::from_static(b"content-range", b""),
    HeaderField::from_static(b"content-type", b""),
    HeaderField::from_static(b"cookie", b""),
    HeaderField::from_static(b"date", b""),
    HeaderField::from_static(b"etag", b""),
    HeaderField::from_static(b"expect", b""),
    HeaderField::from_static(b"expires", b""),
    HeaderField::from_static(b"from", b""),
    HeaderField::from_static(b"host", b""),
    HeaderField::from_static(b"if-match", b""),
    HeaderField::from_static(b"if-modified-since", b""),
    HeaderField::from_static(b"if-none-match", b""),
    HeaderField::from_static(b"if-range", b""),
    HeaderField::from_static(b"if-unmodified-since", b""),
    HeaderField::from_static(b"last-modified", b""),
    HeaderField::from_static(b"link", b""),
    HeaderField::from_static(b"location", b""),
    HeaderField::from_static(b"max-forwards", b""),
    HeaderField::from_static(b"proxy-authenticate", b""),
    HeaderField::from_static(b"proxy-authorization", b""),
    HeaderField::from_static(b"range", b""),
    HeaderField::from_static(b"referer", b""),
    HeaderField::from_static(b"refresh", b""),
    HeaderField::from_static(b"retry-after", b""),
    HeaderField::from_static(b"server", b""),
    HeaderField::from_static(b"set-cookie", b""),
    HeaderField::from_static(b"strict-transport-security", b""),
    HeaderField::from_static(b"transfer-encoding", b""),
    HeaderField::from_static(b"user-agent", b""),
    HeaderField::from_static(b"vary", b""),
    HeaderField::from_static(b"via", b""),
    HeaderField::from_static(b"www-authenticate", b""),
];

/// The read-only static table, 1-indexed.
pub struct StaticTable;

impl StaticTable {
    pub const LEN: usize = 61;

    /// Entry at a 1-based index, or `None` outside 1..=61.
    pub fn field_at(index: usize) -> Option<&'static HeaderField> {
        index.checked_sub(1).and_then(|i| STATIC_ENTRIES.get(i))
    }
}

// -- Dynamic table --

/// HPACK dynamic table (RFC 7541 Section 2.3.2).
///
/// Entries are stored newest-first: front of the deque is relative index 1.
#[derive(Debug)]
pub struct DynamicTable {
    entries: VecDeque<HeaderField>,
    size: usize,
    capacity: usize,
}

impl DynamicTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            size: 0,
            capacity,
        }
    }

    /// Insert a field as the newest entry, evicting the oldest entries until
    /// it fits. A field larger than the whole capacity empties the table and
    /// is not retained (RFC 7541 Section 4.4).
    ///
    /// Returns the number of evicted entries.
    pub fn add(&mut self, field: HeaderField) -> usize {
        let entry_size = field.size();
        if entry_size > self.capacity {
            let evicted = self.entries.len();
            self.entries.clear();
            self.size = 0;
            return evicted;
        }
        let evicted = self.evict_to(self.capacity - entry_size);
        self.size += entry_size;
        self.entries.push_front(field);
        evicted
    }

    /// Change the capacity, evicting the oldest entries until the table fits.
    ///
    /// Returns the number of evicted entries.
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        self.capacity = capacity;
        self.evict_to(capacity)
    }

    /// Entry at a 1-based index relative to the newest entry.
    pub fn field_at(&self, index: usize) -> Result<&HeaderField, HpackError> {
        index
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .ok_or_else(|| {
                HpackError::protocol(format!(
                    "invalid dynamic index {index} (table has {} entries)",
                    self.entries.len()
                ))
            })
    }

    /// Entries newest-first.
    pub fn iter(&self) -> impl Iterator<Item = &HeaderField> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of entry sizes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn evict_to(&mut self, limit: usize) -> usize {
        let mut evicted = 0;
        while self.size > limit {
            match self.entries.pop_back() {
                Some(oldest) => {
                    self.size -= oldest.size();
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }
}

// -- Combined index space --

/// Static and dynamic tables behind one index space.
#[derive(Debug)]
pub struct HeaderTable {
    dynamic: DynamicTable,
}

impl HeaderTable {
    pub fn new(dynamic_capacity: usize) -> Self {
        Self {
            dynamic: DynamicTable::new(dynamic_capacity),
        }
    }

    /// Resolve a combined index: 1..=61 static, 62.. dynamic.
    pub fn field_at(&self, index: usize) -> Result<&HeaderField, HpackError> {
        if index == 0 {
            return Err(HpackError::protocol("header table index 0"));
        }
        match StaticTable::field_at(index) {
            Some(field) => Ok(field),
            None => self.dynamic.field_at(index - StaticTable::LEN),
        }
    }

    pub fn dynamic(&self) -> &DynamicTable {
        &self.dynamic
    }

    pub fn dynamic_mut(&mut self) -> &mut DynamicTable {
        &mut self.dynamic
    }
}
