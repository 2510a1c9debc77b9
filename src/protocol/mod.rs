//! Core protocol value types and error taxonomy.
//!
//! Everything in this module is plain data: requests and responses are owned
//! values with no I/O attached, produced by the [`codec`](crate::codec) layer
//! and consumed by handlers.

mod error;
mod query;
mod request;
mod response;

pub use error::{ParseError, SendError};
pub use query::{Query, Value};
pub use request::{Method, Request, Version};
pub use response::{reason_phrase, Response, ResponseBuilder};
