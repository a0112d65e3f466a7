//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::Once;

use bytes::Bytes;
use ringline_hpack::{Decoder, Frame, HeaderBlockAssembler, HpackError, Message};
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Route `tracing` output to the test harness. `RUST_LOG` overrides the
/// default `trace` filter. The first call wins.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Parse a hex string, ignoring whitespace.
pub fn hex(s: &str) -> Bytes {
    let digits: Vec<u8> = s.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    assert!(digits.len() % 2 == 0, "odd hex length");
    digits
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).unwrap();
            u8::from_str_radix(pair, 16).unwrap()
        })
        .collect::<Vec<u8>>()
        .into()
}

/// Feed `frames` (first one HEADERS, the rest CONTINUATION) through a fresh
/// assembler into a fresh message.
pub fn assemble(decoder: &mut Decoder, frames: &[Frame]) -> Result<Message, HpackError> {
    let mut message = Message::new();
    let mut assembler = HeaderBlockAssembler::new();
    let (first, rest) = frames.split_first().expect("at least one frame");
    assembler.on_headers_frame(first, decoder, &mut message)?;
    for frame in rest {
        assembler.on_continuation_frame(frame, decoder, &mut message)?;
    }
    Ok(message)
}

/// Regular headers of `message` as (name, value) string pairs.
pub fn header_pairs(message: &Message) -> Vec<(String, String)> {
    message
        .headers
        .iter()
        .map(|h| {
            (
                String::from_utf8_lossy(&h.field.name).into_owned(),
                String::from_utf8_lossy(&h.field.value).into_owned(),
            )
        })
        .collect()
}

/// Dynamic table contents, newest first, as (name, value) string pairs.
pub fn table_pairs(decoder: &Decoder) -> Vec<(String, String)> {
    decoder
        .dynamic_table()
        .iter()
        .map(|f| {
            (
                String::from_utf8_lossy(&f.name).into_owned(),
                String::from_utf8_lossy(&f.value).into_owned(),
            )
        })
        .collect()
}

pub fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
    expected
        .iter()
        .map(|(n, v)| (n.to_string(), v.to_string()))
        .collect()
}
