// SDK Error Types
// Enqueue-side errors propagate to the caller; delivery-side errors
// are absorbed into the HTTP response returned to the queue service.

use crate::port::dispatcher::DispatchError;
use crate::port::encryptor::CryptoError;
use crate::port::schema::SchemaError;
use crate::port::serializer::CodecError;
use thiserror::Error;

/// Result type alias for enqueue-side operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Enqueue-side error, propagated to the caller of `enqueue`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The queue service answered with status >= 400.
    #[error("queue service rejected request to {url}: {body} (payload: {payload})")]
    Transport {
        payload: String,
        url: String,
        body: String,
    },

    /// Success status but the body was not a `{"id": string}` object.
    #[error("malformed enqueue response: {0}")]
    ResponseShape(String),

    /// The HTTP call itself failed.
    #[error("network error: {0}")]
    Network(#[from] DispatchError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("encryption error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Queue configuration errors, surfaced at build time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ZEPLO_OLD_SECRETS must be a JSON array of strings: {0}")]
    InvalidOldSecrets(String),

    #[error("encryption secret configured but no cipher supplied")]
    MissingCipher,

    #[error("queue declared without a handler")]
    MissingHandler,
}

/// Delivery-side failure. Never propagated: logged and converted into
/// a `{status: 500, body: <error text>}` response, which the queue
/// service may interpret as a retry signal.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("missing delivery header: {0}")]
    MissingHeader(&'static str),

    #[error("invalid delivery header {name}: {value}")]
    InvalidHeader { name: &'static str, value: String },

    #[error("decrypt failed: {0}")]
    Decrypt(#[from] CryptoError),

    #[error("payload decode failed: {0}")]
    Deserialize(#[from] CodecError),

    #[error("schema validation failed: {0}")]
    Schema(#[from] SchemaError),

    #[error("handler failed: {0}")]
    Handler(anyhow::Error),
}
