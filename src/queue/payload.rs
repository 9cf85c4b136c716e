//! Fixed-schema records carried on the request and result queues.
//!
//! Both records are flat JSON objects. Every key is always emitted and
//! every key is required on receipt.

use bytes::Bytes;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Payload errors.
#[derive(Error, Debug)]
pub enum PayloadError {
    /// The bytes are not a well-formed record.
    #[error("malformed payload: {0}")]
    Decode(String),

    /// The record failed validation.
    #[error("invalid payload: {0}")]
    Invalid(&'static str),

    /// The record could not be serialized.
    #[error("failed to encode payload: {0}")]
    Encode(String),
}

/// Quote request published by the chat server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Room the answer must be delivered to.
    pub room_id: String,
    /// Symbol exactly as typed.
    pub stock_code: String,
}

impl CommandRequest {
    /// Create a new request.
    pub fn new(room_id: impl Into<String>, stock_code: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            stock_code: stock_code.into(),
        }
    }

    /// Decode and validate a request.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PayloadError> {
        let request: Self = decode(bytes)?;
        if request.room_id.is_empty() {
            return Err(PayloadError::Invalid("room_id is empty"));
        }
        if request.stock_code.is_empty() {
            return Err(PayloadError::Invalid("stock_code is empty"));
        }
        Ok(request)
    }

    /// Encode the request.
    pub fn to_bytes(&self) -> Result<Bytes, PayloadError> {
        encode(self)
    }
}

/// Quote result published by a bot.
///
/// Carries either a positive price with an empty error, or a zero price
/// with a non-empty error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Room the result is addressed to.
    pub room_id: String,
    /// Symbol as originally requested.
    pub symbol: String,
    /// Price, zero on failure.
    pub price: f64,
    /// Failure reason, empty on success.
    pub error: String,
}

impl CommandResult {
    /// Create a successful result.
    pub fn quote(room_id: impl Into<String>, symbol: impl Into<String>, price: f64) -> Self {
        Self {
            room_id: room_id.into(),
            symbol: symbol.into(),
            price,
            error: String::new(),
        }
    }

    /// Create a failed result.
    pub fn failure(
        room_id: impl Into<String>,
        symbol: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            symbol: symbol.into(),
            price: 0.0,
            error: error.into(),
        }
    }

    /// The price on success, or the error on failure.
    pub fn outcome(&self) -> Result<f64, &str> {
        if self.error.is_empty() {
            Ok(self.price)
        } else {
            Err(&self.error)
        }
    }

    /// Decode and validate a result.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PayloadError> {
        let result: Self = decode(bytes)?;
        if result.room_id.is_empty() {
            return Err(PayloadError::Invalid("room_id is empty"));
        }
        if result.symbol.is_empty() {
            return Err(PayloadError::Invalid("symbol is empty"));
        }
        if result.error.is_empty() && !(result.price.is_finite() && result.price > 0.0) {
            return Err(PayloadError::Invalid("success result without a positive price"));
        }
        if !result.error.is_empty() && result.price != 0.0 {
            return Err(PayloadError::Invalid("failed result with a price"));
        }
        Ok(result)
    }

    /// Encode the result.
    pub fn to_bytes(&self) -> Result<Bytes, PayloadError> {
        encode(self)
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PayloadError> {
    serde_json::from_slice(bytes).map_err(|e| PayloadError::Decode(e.to_string()))
}

fn encode<T: Serialize>(value: &T) -> Result<Bytes, PayloadError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| PayloadError::Encode(e.to_string()))
}
