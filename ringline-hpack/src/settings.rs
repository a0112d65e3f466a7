//! Decoder-side HTTP/2 SETTINGS values (RFC 7540 Section 6.5.2).

/// Default SETTINGS_HEADER_TABLE_SIZE.
pub const DEFAULT_HEADER_TABLE_SIZE: u32 = 4096;

/// The SETTINGS parameters that govern header block decoding.
///
/// These are the values this endpoint advertised to its peer; the peer's
/// encoder must stay within them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// SETTINGS_HEADER_TABLE_SIZE (0x1). Default 4096.
    ///
    /// Initial dynamic table capacity, and the largest capacity a dynamic
    /// table size update may request.
    pub header_table_size: u32,
    /// SETTINGS_MAX_HEADER_LIST_SIZE (0x6). Default unlimited.
    ///
    /// Measured as the sum of name + value + 32 over the decoded fields.
    pub max_header_list_size: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            header_table_size: DEFAULT_HEADER_TABLE_SIZE,
            max_header_list_size: None,
        }
    }
}
