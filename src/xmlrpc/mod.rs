//! Minimal XML-RPC wire codec and transport
//!
//! Covers exactly the subset of XML-RPC the object protocol exercises:
//! scalar values, arrays, structs and `<nil/>`, plus fault responses.
//! [`serde_json::Value`] is the in-memory value model on both sides;
//! `dateTime.iso8601` and `base64` payloads are surfaced as plain strings.

mod encode;
mod parse;
mod transport;

pub use encode::method_call;
pub use parse::{parse_response, ParseError, Response};
pub use transport::Endpoint;
