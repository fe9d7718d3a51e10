//! JSON text encoding of messages.
//!
//! One outbound item becomes one text frame; one inbound text frame
//! becomes one item. No framing is added beyond what the transport does.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Encodes an outbound item as a JSON text frame.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if the value cannot be represented as JSON.
#[inline]
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Error::serialization)
}

/// Decodes an inbound JSON text frame.
///
/// # Errors
///
/// Returns [`Error::Deserialization`] if the text is not valid JSON for `T`.
#[inline]
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(Error::deserialization)
}
