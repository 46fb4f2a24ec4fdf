// Schema Port (payload validation on delivery)

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct SchemaError(pub String);

/// Payload validation interface.
///
/// Turns the decoded wire value into the queue's payload type,
/// rejecting invalid shapes. Runs after the serializer, before the
/// handler.
pub trait Schema<P>: Send + Sync {
    fn parse(&self, value: Value) -> Result<P, SchemaError>;
}

/// Identity cast (default): deserialize into `P` with no validation
/// beyond what the type itself requires.
pub struct CastSchema<P>(PhantomData<fn() -> P>);

impl<P> CastSchema<P> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<P> Default for CastSchema<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: DeserializeOwned + Send + Sync> Schema<P> for CastSchema<P> {
    fn parse(&self, value: Value) -> Result<P, SchemaError> {
        serde_json::from_value(value).map_err(|e| SchemaError(e.to_string()))
    }
}
