//! # Record Codec
//!
//! Vault entries are stored as JSON text. Decimal amounts are JSON strings,
//! so nothing is rounded on the way to disk.
//!
//! Record types know nothing about the storage they end up in, and storage
//! knows nothing about record types.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while encoding or decoding a vault record.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("record encode error: {0}")]
    Encode(String),

    #[error("record decode error: {0}")]
    Decode(String),
}

/// Encode a record into its stored byte form.
pub fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(record).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode a stored record.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}
