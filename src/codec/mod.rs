//! Encoding and decoding of HTTP messages.
//!
//! - [`RequestDecoder`]: frames requests off a byte stream (header boundary,
//!   content-length body sizing, request size limits) and parses them
//! - [`request_parser::parse`]: the pure bytes-to-[`Request`] function
//! - [`ResponseEncoder`]: serializes a [`Response`] into wire bytes
//!
//! Both codec halves implement the `tokio_util` codec traits and operate on
//! `BytesMut`, so they carry no I/O of their own.
//!
//! [`Request`]: crate::protocol::Request
//! [`Response`]: crate::protocol::Response

mod request_decoder;
pub mod request_parser;
mod response_encoder;

pub use request_decoder::{RequestDecoder, DEFAULT_MAX_REQUEST_SIZE};
pub use response_encoder::ResponseEncoder;
