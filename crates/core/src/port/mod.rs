// Port Layer - pluggable strategy interfaces and their defaults

pub mod dispatcher;
pub mod encryptor;
pub mod id_provider;
pub mod schema;
pub mod serializer;
pub mod time_provider;

// Re-exports
pub use dispatcher::{
    DeliveryHook, DispatchError, DispatchRequest, DispatchResponse, Dispatcher, HttpDispatcher,
    LoopbackDispatcher,
};
pub use encryptor::{Cipher, CryptoError, Encryptor, Keyring, NoopEncryptor};
pub use id_provider::{IdProvider, UuidProvider};
pub use schema::{CastSchema, Schema, SchemaError};
pub use serializer::{CodecError, JsonSerializer, Serializer};
pub use time_provider::{SystemTimeProvider, TimeProvider};
