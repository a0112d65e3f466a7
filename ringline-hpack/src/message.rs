//! Routing decoded fields into an HTTP message.
//!
//! Pseudo-header fields populate the start-line; every other field is
//! appended to the header list in wire order, duplicates included.

use bytes::Bytes;

use crate::hpack::DecodedField;

/// Receiver of decoded header fields.
///
/// Implemented by the message type that owns the start-line and header
/// list. [`route_field`] decides which method each field goes to.
pub trait MessageSink {
    fn set_method(&mut self, method: Bytes);
    fn set_scheme(&mut self, scheme: Bytes);
    fn set_host(&mut self, host: Bytes);
    fn set_port(&mut self, port: Bytes);
    fn set_path(&mut self, path: Bytes);
    fn set_status(&mut self, status: Bytes);
    /// Append a regular (non-pseudo) header field.
    fn add_header(&mut self, field: DecodedField);
    /// Called once after the whole header block has been routed.
    fn finalize(&mut self);
}

enum Target {
    Method,
    Scheme,
    Authority,
    Path,
    Status,
    Header,
}

impl Target {
    fn of(name: &[u8]) -> Self {
        match name {
            b":method" => Self::Method,
            b":scheme" => Self::Scheme,
            b":authority" => Self::Authority,
            b":path" => Self::Path,
            b":status" => Self::Status,
            _ => Self::Header,
        }
    }
}

/// Deliver one decoded field to `message`.
///
/// `:authority` is split on its last colon: the host is always assigned,
/// the port only when a colon is present.
pub fn route_field<M: MessageSink + ?Sized>(message: &mut M, decoded: DecodedField) {
    let value = decoded.field.value.clone();
    match Target::of(&decoded.field.name) {
        Target::Method => message.set_method(value),
        Target::Scheme => message.set_scheme(value),
        Target::Path => message.set_path(value),
        Target::Status => message.set_status(value),
        Target::Authority => match value.iter().rposition(|&b| b == b':') {
            Some(colon) => {
                message.set_host(value.slice(..colon));
                message.set_port(value.slice(colon + 1..));
            }
            None => message.set_host(value),
        },
        Target::Header => message.add_header(decoded),
    }
}

/// Target URI components carried by pseudo-headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uri {
    pub scheme: Option<Bytes>,
    pub host: Option<Bytes>,
    pub port: Option<Bytes>,
    pub path: Option<Bytes>,
}

/// Request-line or status-line fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartLine {
    pub method: Option<Bytes>,
    pub uri: Uri,
    pub status: Option<Bytes>,
}

/// An HTTP message assembled from one header block.
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub start_line: StartLine,
    /// Regular header fields in the order they were decoded.
    pub headers: Vec<DecodedField>,
    finalized: bool,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn is_response(&self) -> bool {
        self.start_line.status.is_some()
    }

    /// Numeric `:status`, if present and well-formed.
    pub fn status_code(&self) -> Option<u16> {
        let status = self.start_line.status.as_ref()?;
        std::str::from_utf8(status).ok()?.parse().ok()
    }

    /// First value of the named header.
    pub fn header(&self, name: &[u8]) -> Option<&Bytes> {
        self.headers
            .iter()
            .find(|h| h.field.name == name)
            .map(|h| &h.field.value)
    }

    /// All values of the named header, in order.
    pub fn header_values<'a>(&'a self, name: &'a [u8]) -> impl Iterator<Item = &'a Bytes> + 'a {
        self.headers
            .iter()
            .filter(move |h| h.field.name == name)
            .map(|h| &h.field.value)
    }
}

impl MessageSink for Message {
    fn set_method(&mut self, method: Bytes) {
        self.start_line.method = Some(method);
    }

    fn set_scheme(&mut self, scheme: Bytes) {
        self.start_line.uri.scheme = Some(scheme);
    }

    fn set_host(&mut self, host: Bytes) {
        self.start_line.uri.host = Some(host);
    }

    fn set_port(&mut self, port: Bytes) {
        self.start_line.uri.port = Some(port);
    }

    fn set_path(&mut self, path: Bytes) {
        self.start_line.uri.path = Some(path);
    }

    fn set_status(&mut self, status: Bytes) {
        self.start_line.status = Some(status);
    }

    fn add_header(&mut self, field: DecodedField) {
        self.headers.push(field);
    }

    fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        // A request without :method defaults to GET.
        if !self.is_response() && self.start_line.method.is_none() {
            self.start_line.method = Some(Bytes::from_static(b"GET"));
        }
        self.finalized = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::HeaderField;

    fn decoded(name: &'static str, value: &'static str) -> DecodedField {
        DecodedField {
            field: HeaderField::from_static(name.as_bytes(), value.as_bytes()),
            never_indexed: false,
        }
    }

    #[test]
    fn pseudo_headers_fill_start_line() {
        let mut msg = Message::new();
        route_field(&mut msg, decoded(":method", "POST"));
        route_field(&mut msg, decoded(":scheme", "https"));
        route_field(&mut msg, decoded(":path", "/upload"));
        route_field(&mut msg, decoded(":authority", "example.com:8443"));
        assert_eq!(msg.start_line.method.as_deref(), Some(&b"POST"[..]));
        assert_eq!(msg.start_line.uri.scheme.as_deref(), Some(&b"https"[..]));
        assert_eq!(msg.start_line.uri.path.as_deref(), Some(&b"/upload"[..]));
        assert_eq!(msg.start_line.uri.host.as_deref(), Some(&b"example.com"[..]));
        assert_eq!(msg.start_line.uri.port.as_deref(), Some(&b"8443"[..]));
        assert!(msg.headers.is_empty());
    }

    #[test]
    fn authority_without_port() {
        let mut msg = Message::new();
        route_field(&mut msg, decoded(":authority", "example.com"));
        assert_eq!(msg.start_line.uri.host.as_deref(), Some(&b"example.com"[..]));
        assert_eq!(msg.start_line.uri.port, None);
    }

    #[test]
    fn authority_splits_on_last_colon() {
        let mut msg = Message::new();
        route_field(&mut msg, decoded(":authority", "[::1]:8080"));
        assert_eq!(msg.start_line.uri.host.as_deref(), Some(&b"[::1]"[..]));
        assert_eq!(msg.start_line.uri.port.as_deref(), Some(&b"8080"[..]));

        let mut msg = Message::new();
        route_field(&mut msg, decoded(":authority", "host:"));
        assert_eq!(msg.start_line.uri.host.as_deref(), Some(&b"host"[..]));
        assert_eq!(msg.start_line.uri.port.as_deref(), Some(&b""[..]));
    }

    #[test]
    fn regular_headers_keep_order_and_duplicates() {
        let mut msg = Message::new();
        route_field(&mut msg, decoded("cookie", "a=1"));
        route_field(&mut msg, decoded("accept", "*/*"));
        route_field(&mut msg, decoded("cookie", "b=2"));
        let cookies: Vec<_> = msg.header_values(b"cookie").cloned().collect();
        assert_eq!(
            cookies,
            vec![Bytes::from_static(b"a=1"), Bytes::from_static(b"b=2")]
        );
        assert_eq!(msg.headers[1].field.name, Bytes::from_static(b"accept"));
        assert_eq!(msg.header(b"accept").map(|v| &v[..]), Some(&b"*/*"[..]));
        assert_eq!(msg.header(b"missing"), None);
    }

    #[test]
    fn never_indexed_marker_survives_routing() {
        let mut msg = Message::new();
        route_field(
            &mut msg,
            DecodedField {
                field: HeaderField::from_static(b"authorization", b"secret"),
                never_indexed: true,
            },
        );
        assert!(msg.headers[0].never_indexed);
    }

    #[test]
    fn finalize_defaults_request_method() {
        let mut msg = Message::new();
        route_field(&mut msg, decoded(":path", "/"));
        msg.finalize();
        assert!(msg.is_finalized());
        assert_eq!(msg.start_line.method.as_deref(), Some(&b"GET"[..]));
    }

    #[test]
    fn finalize_leaves_responses_alone() {
        let mut msg = Message::new();
        route_field(&mut msg, decoded(":status", "304"));
        msg.finalize();
        assert!(msg.is_response());
        assert_eq!(msg.status_code(), Some(304));
        assert_eq!(msg.start_line.method, None);
    }
}
