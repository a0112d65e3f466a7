/// HTTP/2 error codes (RFC 7540 Section 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    NoError = 0x0,
    ProtocolError = 0x1,
    InternalError = 0x2,
    FlowControlError = 0x3,
    SettingsTimeout = 0x4,
    StreamClosed = 0x5,
    FrameSizeError = 0x6,
    RefusedStream = 0x7,
    Cancel = 0x8,
    CompressionError = 0x9,
    ConnectError = 0xa,
    EnhanceYourCalm = 0xb,
    InadequateSecurity = 0xc,
    Http11Required = 0xd,
}

/// Errors produced while assembling or decoding a header block.
///
/// Both kinds are fatal to the decoding context: the dynamic table may be
/// out of sync with the peer's encoder, so the caller must tear down the
/// stream or connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HpackError {
    /// Structural violation: a read past the end of the buffer, padding
    /// longer than the payload, or a zero stream identifier.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Semantic violation of HPACK or of the header block framing rules.
    #[error("protocol error: {0}")]
    ProtocolError(String),
}

impl HpackError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedFrame(msg.into())
    }

    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolError(msg.into())
    }

    /// Connection error code to send in GOAWAY when tearing down after this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MalformedFrame(_) => ErrorCode::ProtocolError,
            // RFC 7540 Section 4.3: header block decoding failures are
            // connection errors of type COMPRESSION_ERROR.
            Self::ProtocolError(_) => ErrorCode::CompressionError,
        }
    }
}
