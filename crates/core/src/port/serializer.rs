// Serializer Port (payload text encoding)

use serde_json::Value;
use thiserror::Error;

/// Codec failure (stringify or parse).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CodecError(pub String);

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        Self(e.to_string())
    }
}

/// Payload text codec interface (allows swapping the wire encoding).
///
/// `stringify` produces the outbound request body; `parse` decodes an
/// inbound delivery body into a wire value for schema validation.
pub trait Serializer: Send + Sync {
    fn stringify(&self, value: &Value) -> Result<String, CodecError>;
    fn parse(&self, text: &str) -> Result<Value, CodecError>;
}

/// JSON text encoding (default).
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn stringify(&self, value: &Value) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }

    fn parse(&self, text: &str) -> Result<Value, CodecError> {
        Ok(serde_json::from_str(text)?)
    }
}
