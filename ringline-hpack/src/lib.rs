//! Sans-IO HTTP/2 header block decoding.
//!
//! This crate turns the HEADERS and CONTINUATION frames of an HTTP/2
//! connection into HTTP messages. It performs no I/O: the framing layer
//! hands over frames one at a time, and decoded fields are routed into a
//! [`MessageSink`].
//!
//! # Architecture
//!
//! ```text
//!   HEADERS / CONTINUATION frames
//!        |
//!   +----v-----------------+
//!   | HeaderBlockAssembler |  one per message: padding, priority, fragments
//!   +----+-----------------+
//!        | complete block
//!   +----v-----------------+
//!   | Decoder              |  one per connection: HPACK + dynamic table
//!   +----+-----------------+
//!        | DecodedField
//!   +----v-----------------+
//!   | MessageSink          |  pseudo-headers -> start-line, rest -> headers
//!   +----------------------+
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use ringline_hpack::{Decoder, Frame, HeaderBlockAssembler, Message, Settings};
//!
//! let mut decoder = Decoder::new(&Settings::default());
//!
//! // Per message.
//! let mut message = Message::new();
//! let mut assembler = HeaderBlockAssembler::new();
//! assembler.on_headers_frame(&headers_frame, &mut decoder, &mut message)?;
//! for frame in &continuations {
//!     assembler.on_continuation_frame(frame, &mut decoder, &mut message)?;
//! }
//!
//! if message.is_finalized() {
//!     println!("{:?} {:?}", message.start_line.method, message.start_line.uri.path);
//! }
//! ```
//!
//! Any [`HpackError`] is fatal to the connection; [`HpackError::code`] gives
//! the error code for the GOAWAY frame.

pub mod assembler;
pub mod cursor;
pub mod error;
pub mod frame;
pub mod hpack;
mod huffman;
pub mod message;
pub mod settings;
pub mod table;

pub use assembler::{AssemblerState, HeaderBlockAssembler};
pub use error::{ErrorCode, HpackError};
pub use frame::{Frame, Priority};
pub use hpack::{DecodedField, Decoder, Representation};
pub use message::{Message, MessageSink, StartLine, Uri};
pub use settings::Settings;
pub use table::HeaderField;
