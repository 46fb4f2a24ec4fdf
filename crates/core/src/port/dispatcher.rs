// Dispatcher Port (outbound HTTP seam)
// Allows recording in tests and in-process loopback in direct mode.

use crate::headers::Headers;
use crate::queue::DeliveryResponse;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Dispatch errors (the HTTP call itself failing, not the service
/// rejecting the request)
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Outbound enqueue request, fully constructed by the transport.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct DispatchResponse {
    pub status: u16,
    pub body: String,
}

/// Outbound dispatch interface. Exactly one `post` per enqueue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn post(&self, request: DispatchRequest) -> Result<DispatchResponse, DispatchError>;
}

/// Production dispatcher: a reqwest POST with no caching and no
/// credential transmission.
pub struct HttpDispatcher {
    client: reqwest::Client,
}

impl HttpDispatcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn post(&self, request: DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        let mut builder = self
            .client
            .post(&request.url)
            .query(&request.query)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .body(request.body);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(DispatchResponse { status, body })
    }
}

/// Inbound delivery entry point, supplied by the wiring that owns the
/// queue. Keeps the enqueue path free of any direct reference to its
/// own handler.
#[async_trait]
pub trait DeliveryHook: Send + Sync {
    async fn deliver(&self, body: String, headers: &Headers) -> DeliveryResponse;
}

/// Direct-mode dispatcher: no network hop. The "remote" delivery runs
/// through the hook in the same task chain, so the handler completes
/// before the enqueue resolves.
pub struct LoopbackDispatcher {
    hook: Arc<dyn DeliveryHook>,
}

impl LoopbackDispatcher {
    pub fn new(hook: Arc<dyn DeliveryHook>) -> Self {
        Self { hook }
    }
}

#[async_trait]
impl Dispatcher for LoopbackDispatcher {
    async fn post(&self, request: DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        // Query params (_delay, _retry, ...) have no local meaning:
        // direct mode delivers immediately, exactly once.
        let headers: Headers = request
            .headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.clone()))
            .collect();

        let response = self.hook.deliver(request.body, &headers).await;

        Ok(DispatchResponse {
            status: response.status,
            body: response.body.into_text(),
        })
    }
}
