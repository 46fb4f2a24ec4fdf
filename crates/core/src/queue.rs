// Transport Client
// Builds the outbound enqueue request and handles inbound deliveries.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use crate::config::{
    resolve, CallOptions, Delay, EnvOverrides, Mode, QueueOptions, ResolvedConfig,
};
use crate::error::{ClientError, ConfigError, DeliveryError, Result};
use crate::headers::{Headers, HEADER_ID, HEADER_START, HEADER_TOKEN};
use crate::port::dispatcher::{
    DeliveryHook, DispatchRequest, Dispatcher, HttpDispatcher, LoopbackDispatcher,
};
use crate::port::encryptor::{Cipher, Encryptor, Keyring, NoopEncryptor};
use crate::port::id_provider::{IdProvider, UuidProvider};
use crate::port::schema::{CastSchema, Schema};
use crate::port::serializer::{JsonSerializer, Serializer};
use crate::port::time_provider::{SystemTimeProvider, TimeProvider};

/// Suffix marking job ids synthesized locally (direct mode) rather
/// than assigned by the queue service.
pub const DIRECT_ID_SUFFIX: &str = "-iow";

/// Delivery metadata passed to the handler alongside the payload.
#[derive(Debug, Clone)]
pub struct JobMeta {
    pub id: String,
    pub start: DateTime<Utc>,
}

/// Successful enqueue acknowledgement from the queue service.
#[derive(Debug, Clone, Deserialize)]
pub struct EnqueueReceipt {
    pub id: String,
}

/// Normalized response handed back to the framework adapter after an
/// inbound delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryResponse {
    pub status: u16,
    pub body: DeliveryBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryBody {
    Json(serde_json::Value),
    Text(String),
}

impl DeliveryBody {
    /// Wire form: JSON text for success bodies, the plain error
    /// string for failures.
    pub fn into_text(self) -> String {
        match self {
            DeliveryBody::Json(value) => value.to_string(),
            DeliveryBody::Text(text) => text,
        }
    }
}

/// Job handler interface. Closures of the shape
/// `Fn(P, JobMeta) -> impl Future<Output = anyhow::Result<()>>`
/// implement it automatically.
#[async_trait]
pub trait Handler<P>: Send + Sync {
    async fn handle(&self, payload: P, meta: JobMeta) -> anyhow::Result<()>;
}

#[async_trait]
impl<P, F, Fut> Handler<P> for F
where
    P: Send + 'static,
    F: Fn(P, JobMeta) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = anyhow::Result<()>> + Send,
{
    async fn handle(&self, payload: P, meta: JobMeta) -> anyhow::Result<()> {
        (self)(payload, meta).await
    }
}

/// Delivery half of a queue: everything `respond_to` needs, with no
/// reference to the dispatcher. Direct mode loops the dispatcher back
/// onto this.
struct Receiver<P> {
    config: ResolvedConfig,
    serializer: Arc<dyn Serializer>,
    schema: Arc<dyn Schema<P>>,
    encryptor: Arc<dyn Encryptor>,
    handler: Arc<dyn Handler<P>>,
}

impl<P> Receiver<P>
where
    P: DeserializeOwned + Send + Sync + 'static,
{
    /// Never fails outward: every failure is logged and absorbed into
    /// a 500 response for the queue service to interpret.
    async fn respond_to(&self, raw_body: String, raw_headers: &Headers) -> DeliveryResponse {
        match self.try_respond(raw_body, raw_headers).await {
            Ok(job_id) => DeliveryResponse {
                status: 200,
                // Mirrors the service's own enqueue-response shape so
                // direct mode presents the same contract as production.
                body: DeliveryBody::Json(json!({ "id": job_id })),
            },
            Err(e) => {
                error!(error = %e, "delivery failed");
                DeliveryResponse {
                    status: 500,
                    body: DeliveryBody::Text(e.to_string()),
                }
            }
        }
    }

    async fn try_respond(
        &self,
        raw_body: String,
        raw_headers: &Headers,
    ) -> std::result::Result<String, DeliveryError> {
        let job_id = raw_headers
            .get(HEADER_ID)
            .ok_or(DeliveryError::MissingHeader(HEADER_ID))?
            .to_string();
        let start_raw = raw_headers
            .get(HEADER_START)
            .ok_or(DeliveryError::MissingHeader(HEADER_START))?;
        let start_secs: f64 = start_raw
            .parse()
            .map_err(|_| DeliveryError::InvalidHeader {
                name: HEADER_START,
                value: start_raw.to_string(),
            })?;
        let start = Utc
            .timestamp_millis_opt((start_secs * 1000.0) as i64)
            .single()
            .ok_or_else(|| DeliveryError::InvalidHeader {
                name: HEADER_START,
                value: start_raw.to_string(),
            })?;

        let plaintext = self.encryptor.decrypt(raw_body).await?;
        let value = self.serializer.parse(&plaintext)?;
        let payload = self.schema.parse(value)?;

        self.handler
            .handle(
                payload,
                JobMeta {
                    id: job_id.clone(),
                    start,
                },
            )
            .await
            .map_err(DeliveryError::Handler)?;

        Ok(job_id)
    }
}

#[async_trait]
impl<P> DeliveryHook for Receiver<P>
where
    P: DeserializeOwned + Send + Sync + 'static,
{
    async fn deliver(&self, body: String, headers: &Headers) -> DeliveryResponse {
        self.respond_to(body, headers).await
    }
}

/// A declared queue: the enqueue half and the delivery half, sharing
/// one immutable resolved configuration. Cheap to clone; safe to use
/// concurrently.
pub struct Queue<P> {
    route: String,
    receiver: Arc<Receiver<P>>,
    dispatcher: Arc<dyn Dispatcher>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl<P> Clone for Queue<P> {
    fn clone(&self) -> Self {
        Self {
            route: self.route.clone(),
            receiver: self.receiver.clone(),
            dispatcher: self.dispatcher.clone(),
            id_provider: self.id_provider.clone(),
            time_provider: self.time_provider.clone(),
        }
    }
}

impl<P> Queue<P>
where
    P: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn builder(route: impl Into<String>) -> QueueBuilder<P> {
        QueueBuilder::new(route)
    }

    /// The callback path the queue service invokes to deliver a job.
    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.receiver.config
    }

    /// Enqueue a payload with the queue's declared defaults.
    pub async fn enqueue(&self, payload: &P) -> Result<EnqueueReceipt> {
        self.enqueue_with(payload, CallOptions::default()).await
    }

    /// Enqueue a payload, overriding delay/retry and attaching a
    /// trace for this call only.
    pub async fn enqueue_with(&self, payload: &P, call: CallOptions) -> Result<EnqueueReceipt> {
        let config = &self.receiver.config;

        let delay = call.delay.or(config.default_delay);
        let retry = call.retry.or(config.default_retry);

        let url = join_url([
            config.api_url.as_str(),
            config.base_url.as_str(),
            self.route.as_str(),
        ]);

        let value = serde_json::to_value(payload)?;
        let serialized = self.receiver.serializer.stringify(&value)?;
        let body = self.receiver.encryptor.encrypt(serialized.clone()).await?;

        let mut query = vec![("_env".to_string(), config.env.clone())];
        if let Some(trace) = call.trace {
            query.push(("_trace".to_string(), trace));
        }
        match delay {
            Some(Delay::Seconds(seconds)) => {
                query.push(("_delay".to_string(), seconds.to_string()));
            }
            Some(Delay::Until(at)) => {
                query.push(("_delay_until".to_string(), at.timestamp_millis().to_string()));
            }
            None => {}
        }
        if let Some(retry) = retry {
            query.push(("_retry".to_string(), retry.to_string()));
        }

        // Exactly one header shape: the token for remote modes, a
        // synthetic identity for direct mode. Never both.
        let mut headers = Vec::new();
        match config.mode {
            Mode::Direct => {
                let job_id = format!("{}{}", self.id_provider.new_job_id(), DIRECT_ID_SUFFIX);
                let start = self.time_provider.now();
                headers.push((HEADER_ID.to_string(), job_id));
                headers.push((
                    HEADER_START.to_string(),
                    format!("{:.3}", start.timestamp_millis() as f64 / 1000.0),
                ));
            }
            Mode::Production | Mode::DevServer => {
                if let Some(token) = &config.token {
                    headers.push((HEADER_TOKEN.to_string(), token.clone()));
                }
            }
        }

        debug!(route = %self.route, url = %url, "dispatching enqueue request");

        let response = self
            .dispatcher
            .post(DispatchRequest {
                url: url.clone(),
                query,
                headers,
                body,
            })
            .await?;

        if response.status >= 400 {
            return Err(ClientError::Transport {
                payload: serialized,
                url,
                body: response.body,
            });
        }

        let receipt: EnqueueReceipt = serde_json::from_str(&response.body).map_err(|e| {
            ClientError::ResponseShape(format!(
                "expected {{\"id\": string}}, got {:?}: {}",
                response.body, e
            ))
        })?;

        debug!(route = %self.route, job_id = %receipt.id, "job accepted");
        Ok(receipt)
    }

    /// Handle an inbound delivery: adapter-supplied raw body and
    /// headers in, normalized `{status, body}` out. Never fails.
    pub async fn respond_to(
        &self,
        raw_body: impl Into<String>,
        raw_headers: &Headers,
    ) -> DeliveryResponse {
        self.receiver.respond_to(raw_body.into(), raw_headers).await
    }
}

/// Join the non-empty URL segments with `/`.
fn join_url<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Builder for [`Queue`]. Environment overrides are captured once, at
/// `build`.
pub struct QueueBuilder<P> {
    route: String,
    options: QueueOptions,
    handler: Option<Arc<dyn Handler<P>>>,
    serializer: Arc<dyn Serializer>,
    schema: Arc<dyn Schema<P>>,
    cipher: Option<Arc<dyn Cipher>>,
    encryptor: Option<Arc<dyn Encryptor>>,
    dispatcher: Option<Arc<dyn Dispatcher>>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    env_overrides: Option<EnvOverrides>,
}

impl<P> QueueBuilder<P>
where
    P: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            options: QueueOptions::default(),
            handler: None,
            serializer: Arc::new(JsonSerializer),
            schema: Arc::new(CastSchema::new()),
            cipher: None,
            encryptor: None,
            dispatcher: None,
            id_provider: Arc::new(UuidProvider),
            time_provider: Arc::new(SystemTimeProvider),
            env_overrides: None,
        }
    }

    pub fn options(mut self, options: QueueOptions) -> Self {
        self.options = options;
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.options.mode = Some(mode);
        self
    }

    pub fn api_url(mut self, api_url: impl Into<String>) -> Self {
        self.options.api_url = Some(api_url.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.options.base_url = Some(base_url.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.options.token = Some(token.into());
        self
    }

    pub fn env(mut self, env: impl Into<String>) -> Self {
        self.options.env = Some(env.into());
        self
    }

    pub fn delay(mut self, delay: Delay) -> Self {
        self.options.delay = Some(delay);
        self
    }

    pub fn retry(mut self, retry: crate::retry::Retry) -> Self {
        self.options.retry = Some(retry);
        self
    }

    pub fn encryption_secret(mut self, secret: impl Into<String>) -> Self {
        self.options.encryption_secret = Some(secret.into());
        self
    }

    pub fn old_secrets(mut self, secrets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.options.old_secrets = Some(secrets.into_iter().map(Into::into).collect());
        self
    }

    pub fn handler(mut self, handler: impl Handler<P> + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn schema(mut self, schema: Arc<dyn Schema<P>>) -> Self {
        self.schema = schema;
        self
    }

    /// Algorithm used by the secret keyring when an encryption secret
    /// is configured. Required in that case.
    pub fn cipher(mut self, cipher: Arc<dyn Cipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// Full encryptor override, bypassing the keyring assembly.
    pub fn encryptor(mut self, encryptor: Arc<dyn Encryptor>) -> Self {
        self.encryptor = Some(encryptor);
        self
    }

    /// Dispatch override, primarily for tests and custom wiring.
    pub fn dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn id_provider(mut self, id_provider: Arc<dyn IdProvider>) -> Self {
        self.id_provider = id_provider;
        self
    }

    pub fn time_provider(mut self, time_provider: Arc<dyn TimeProvider>) -> Self {
        self.time_provider = time_provider;
        self
    }

    /// Replace the captured process environment, primarily for tests.
    pub fn env_overrides(mut self, env: EnvOverrides) -> Self {
        self.env_overrides = Some(env);
        self
    }

    pub fn build(self) -> Result<Queue<P>> {
        let env = self.env_overrides.unwrap_or_else(EnvOverrides::capture);
        let config = resolve(&self.options, &env)?;

        let handler = self.handler.ok_or(ConfigError::MissingHandler)?;

        let encryptor: Arc<dyn Encryptor> = match (self.encryptor, &config.encryption_secret) {
            (Some(custom), _) => custom,
            (None, Some(secret)) => {
                let cipher = self.cipher.ok_or(ConfigError::MissingCipher)?;
                Arc::new(Keyring::new(
                    cipher,
                    secret.clone(),
                    config.old_secrets.clone(),
                ))
            }
            (None, None) => Arc::new(NoopEncryptor),
        };

        let receiver = Arc::new(Receiver {
            config,
            serializer: self.serializer,
            schema: self.schema,
            encryptor,
            handler,
        });

        let dispatcher: Arc<dyn Dispatcher> = match self.dispatcher {
            Some(dispatcher) => dispatcher,
            // Direct mode loops the dispatcher back onto this queue's
            // own delivery half; other modes go out over HTTP.
            None => match receiver.config.mode {
                Mode::Direct => Arc::new(LoopbackDispatcher::new(receiver.clone())),
                Mode::Production | Mode::DevServer => Arc::new(HttpDispatcher::new()),
            },
        };

        Ok(Queue {
            route: self.route,
            receiver,
            dispatcher,
            id_provider: self.id_provider,
            time_provider: self.time_provider,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::dispatcher::{DispatchError, DispatchResponse, MockDispatcher};
    use crate::port::encryptor::CryptoError;
    use crate::retry::{Backoff, Retry};
    use anyhow::anyhow;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Payload {
        foo: String,
    }

    fn payload() -> Payload {
        Payload {
            foo: "bar".to_string(),
        }
    }

    /// Records every dispatched request and answers with a canned
    /// response.
    struct RecordingDispatcher {
        requests: Mutex<Vec<DispatchRequest>>,
        status: u16,
        body: String,
    }

    impl RecordingDispatcher {
        fn ok(body: &str) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                status: 200,
                body: body.to_string(),
            })
        }

        fn status(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                status,
                body: body.to_string(),
            })
        }

        fn single_request(&self) -> DispatchRequest {
            let requests = self.requests.lock().unwrap();
            assert_eq!(requests.len(), 1, "expected exactly one POST");
            requests[0].clone()
        }
    }

    #[async_trait]
    impl Dispatcher for RecordingDispatcher {
        async fn post(
            &self,
            request: DispatchRequest,
        ) -> std::result::Result<DispatchResponse, DispatchError> {
            self.requests.lock().unwrap().push(request);
            Ok(DispatchResponse {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    struct FixedId(&'static str);

    impl IdProvider for FixedId {
        fn new_job_id(&self) -> String {
            self.0.to_string()
        }
    }

    struct FixedTime(i64);

    impl TimeProvider for FixedTime {
        fn now(&self) -> DateTime<Utc> {
            Utc.timestamp_millis_opt(self.0).unwrap()
        }
    }

    /// Secret-tagging stand-in for a real algorithm.
    struct TaggedCipher;

    impl Cipher for TaggedCipher {
        fn seal(&self, secret: &str, plaintext: &str) -> std::result::Result<String, CryptoError> {
            Ok(format!("{}::{}", secret, plaintext))
        }

        fn open(&self, secret: &str, ciphertext: &str) -> std::result::Result<String, CryptoError> {
            ciphertext
                .strip_prefix(&format!("{}::", secret))
                .map(str::to_string)
                .ok_or_else(|| CryptoError::Decrypt("wrong secret".to_string()))
        }
    }

    async fn noop_handler(_payload: Payload, _meta: JobMeta) -> anyhow::Result<()> {
        Ok(())
    }

    fn base_builder() -> QueueBuilder<Payload> {
        Queue::builder("demo")
            .handler(noop_handler)
            .env_overrides(EnvOverrides::default())
    }

    fn query_value<'a>(request: &'a DispatchRequest, key: &str) -> Option<&'a str> {
        request
            .query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn header_value<'a>(request: &'a DispatchRequest, name: &str) -> Option<&'a str> {
        request
            .headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[tokio::test]
    async fn test_enqueue_posts_serialized_payload_once() {
        let dispatcher = RecordingDispatcher::ok(r#"{"id":"job-1"}"#);
        let queue = base_builder()
            .token("secret-token")
            .dispatcher(dispatcher.clone())
            .build()
            .unwrap();

        let receipt = queue.enqueue(&payload()).await.unwrap();
        assert_eq!(receipt.id, "job-1");

        let request = dispatcher.single_request();
        assert_eq!(request.url, "https://zeplo.to/demo");
        assert_eq!(request.body, r#"{"foo":"bar"}"#);
        assert_eq!(query_value(&request, "_env"), Some("production"));
        assert_eq!(header_value(&request, HEADER_TOKEN), Some("secret-token"));
        assert!(header_value(&request, HEADER_ID).is_none());
    }

    #[tokio::test]
    async fn test_url_joins_non_empty_segments() {
        let dispatcher = RecordingDispatcher::ok(r#"{"id":"job-1"}"#);
        let queue = base_builder()
            .api_url("https://zeplo.to/")
            .base_url("api/queue")
            .dispatcher(dispatcher.clone())
            .build()
            .unwrap();

        queue.enqueue(&payload()).await.unwrap();
        assert_eq!(dispatcher.single_request().url, "https://zeplo.to/api/queue/demo");
    }

    #[tokio::test]
    async fn test_call_options_build_delay_trace_and_retry_params() {
        let dispatcher = RecordingDispatcher::ok(r#"{"id":"job-1"}"#);
        let queue = base_builder().dispatcher(dispatcher.clone()).build().unwrap();

        queue
            .enqueue_with(
                &payload(),
                CallOptions {
                    delay: Some(Delay::Seconds(10)),
                    retry: Some(Retry::with_backoff(3, Backoff::Fixed { interval: 4 })),
                    trace: Some("prior-job".to_string()),
                },
            )
            .await
            .unwrap();

        let request = dispatcher.single_request();
        assert_eq!(query_value(&request, "_delay"), Some("10"));
        assert_eq!(query_value(&request, "_retry"), Some("3|fixed|4"));
        assert_eq!(query_value(&request, "_trace"), Some("prior-job"));
        assert!(query_value(&request, "_delay_until").is_none());
    }

    #[tokio::test]
    async fn test_delay_until_uses_epoch_millis() {
        let dispatcher = RecordingDispatcher::ok(r#"{"id":"job-1"}"#);
        let queue = base_builder().dispatcher(dispatcher.clone()).build().unwrap();

        let at = Utc.timestamp_millis_opt(2_790_000).unwrap();
        queue
            .enqueue_with(
                &payload(),
                CallOptions {
                    delay: Some(Delay::Until(at)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let request = dispatcher.single_request();
        assert_eq!(query_value(&request, "_delay_until"), Some("2790000"));
        assert!(query_value(&request, "_delay").is_none());
    }

    #[tokio::test]
    async fn test_call_option_overrides_declared_default() {
        let dispatcher = RecordingDispatcher::ok(r#"{"id":"job-1"}"#);
        let queue = base_builder()
            .delay(Delay::Seconds(60))
            .retry(Retry::count(5))
            .dispatcher(dispatcher.clone())
            .build()
            .unwrap();

        queue
            .enqueue_with(
                &payload(),
                CallOptions {
                    delay: Some(Delay::Seconds(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let request = dispatcher.single_request();
        // Call-time delay wins; declared retry still applies.
        assert_eq!(query_value(&request, "_delay"), Some("1"));
        assert_eq!(query_value(&request, "_retry"), Some("5"));
    }

    #[tokio::test]
    async fn test_rejection_carries_payload_url_and_body() {
        let dispatcher = RecordingDispatcher::status(400, "res.text");
        let queue = base_builder().dispatcher(dispatcher).build().unwrap();

        let err = queue.enqueue(&payload()).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains(r#"{"foo":"bar"}"#), "message: {message}");
        assert!(message.contains("https://zeplo.to/demo"), "message: {message}");
        assert!(message.contains("res.text"), "message: {message}");
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_a_shape_error() {
        let dispatcher = RecordingDispatcher::ok(r#"{"job": "no id here"}"#);
        let queue = base_builder().dispatcher(dispatcher).build().unwrap();

        let err = queue.enqueue(&payload()).await.unwrap_err();
        assert!(matches!(err, ClientError::ResponseShape(_)));
    }

    #[tokio::test]
    async fn test_dispatch_failure_propagates_as_network_error() {
        let mut mock = MockDispatcher::new();
        mock.expect_post()
            .times(1)
            .returning(|_| Err(DispatchError::Other("connection refused".to_string())));

        let queue = base_builder().dispatcher(Arc::new(mock)).build().unwrap();

        let err = queue.enqueue(&payload()).await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_)));
    }

    #[tokio::test]
    async fn test_direct_mode_sends_identity_headers_instead_of_token() {
        let dispatcher = RecordingDispatcher::ok(r#"{"id":"fixed-iow"}"#);
        let queue = base_builder()
            .mode(Mode::Direct)
            .token("secret-token")
            .id_provider(Arc::new(FixedId("fixed")))
            .time_provider(Arc::new(FixedTime(2_790_000)))
            .dispatcher(dispatcher.clone())
            .build()
            .unwrap();

        queue.enqueue(&payload()).await.unwrap();

        let request = dispatcher.single_request();
        assert_eq!(request.url, "demo");
        assert_eq!(header_value(&request, HEADER_ID), Some("fixed-iow"));
        assert_eq!(header_value(&request, HEADER_START), Some("2790.000"));
        assert!(header_value(&request, HEADER_TOKEN).is_none());
    }

    #[tokio::test]
    async fn test_encrypted_body_is_sealed_serialized_payload() {
        let dispatcher = RecordingDispatcher::ok(r#"{"id":"job-1"}"#);
        let queue = base_builder()
            .encryption_secret("s3cret")
            .cipher(Arc::new(TaggedCipher))
            .dispatcher(dispatcher.clone())
            .build()
            .unwrap();

        queue.enqueue(&payload()).await.unwrap();
        assert_eq!(dispatcher.single_request().body, r#"s3cret::{"foo":"bar"}"#);
    }

    #[tokio::test]
    async fn test_secret_without_cipher_fails_at_build() {
        let result = base_builder().encryption_secret("s3cret").build();
        assert!(matches!(
            result,
            Err(ClientError::Config(ConfigError::MissingCipher))
        ));
    }

    #[tokio::test]
    async fn test_respond_to_round_trip() {
        let seen: Arc<Mutex<Option<(Payload, JobMeta)>>> = Arc::new(Mutex::new(None));
        let seen_in_handler = seen.clone();

        let queue = Queue::builder("demo")
            .handler(move |payload: Payload, meta: JobMeta| {
                let seen = seen_in_handler.clone();
                async move {
                    *seen.lock().unwrap() = Some((payload, meta));
                    Ok(())
                }
            })
            .env_overrides(EnvOverrides::default())
            .build()
            .unwrap();

        let headers: Headers = [(HEADER_ID, "foo"), (HEADER_START, "2790")]
            .into_iter()
            .collect();
        let response = queue.respond_to(r#"{"foo":"bar"}"#, &headers).await;

        assert_eq!(response.status, 200);
        assert_eq!(response.body, DeliveryBody::Json(json!({"id": "foo"})));

        let (seen_payload, seen_meta) = seen.lock().unwrap().take().unwrap();
        assert_eq!(seen_payload, payload());
        assert_eq!(seen_meta.id, "foo");
        assert_eq!(seen_meta.start, Utc.timestamp_millis_opt(2_790_000).unwrap());
    }

    async fn failing_handler(_payload: Payload, _meta: JobMeta) -> anyhow::Result<()> {
        Err(anyhow!("Mock Error"))
    }

    #[tokio::test]
    async fn test_handler_rejection_becomes_500() {
        let queue = Queue::builder("demo")
            .handler(failing_handler)
            .env_overrides(EnvOverrides::default())
            .build()
            .unwrap();

        let headers: Headers = [(HEADER_ID, "foo"), (HEADER_START, "2790")]
            .into_iter()
            .collect();
        let response = queue.respond_to(r#"{"foo":"bar"}"#, &headers).await;

        assert_eq!(response.status, 500);
        match response.body {
            DeliveryBody::Text(text) => assert!(text.contains("Mock Error"), "body: {text}"),
            other => panic!("expected text body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_delivery_headers_become_500() {
        let queue = base_builder().build().unwrap();

        let no_id: Headers = [(HEADER_START, "2790")].into_iter().collect();
        assert_eq!(queue.respond_to("{}", &no_id).await.status, 500);

        let no_start: Headers = [(HEADER_ID, "foo")].into_iter().collect();
        assert_eq!(queue.respond_to("{}", &no_start).await.status, 500);
    }

    #[tokio::test]
    async fn test_schema_rejection_becomes_500() {
        let queue = base_builder().build().unwrap();

        let headers: Headers = [(HEADER_ID, "foo"), (HEADER_START, "2790")]
            .into_iter()
            .collect();
        // `foo` must be a string for Payload.
        let response = queue.respond_to(r#"{"foo":42}"#, &headers).await;
        assert_eq!(response.status, 500);
    }

    #[tokio::test]
    async fn test_direct_mode_loops_back_before_enqueue_resolves() {
        let seen: Arc<Mutex<Option<JobMeta>>> = Arc::new(Mutex::new(None));
        let seen_in_handler = seen.clone();

        let queue = Queue::builder("demo")
            .mode(Mode::Direct)
            .handler(move |_payload: Payload, meta: JobMeta| {
                let seen = seen_in_handler.clone();
                async move {
                    *seen.lock().unwrap() = Some(meta);
                    Ok(())
                }
            })
            .id_provider(Arc::new(FixedId("local")))
            .time_provider(Arc::new(FixedTime(2_790_000)))
            .env_overrides(EnvOverrides::default())
            .build()
            .unwrap();

        let receipt = queue.enqueue(&payload()).await.unwrap();

        // The nested delivery completed inside the enqueue call.
        assert_eq!(receipt.id, "local-iow");
        let meta = seen.lock().unwrap().take().unwrap();
        assert_eq!(meta.id, "local-iow");
        assert_eq!(meta.start, Utc.timestamp_millis_opt(2_790_000).unwrap());
    }

    #[tokio::test]
    async fn test_direct_mode_round_trips_encryption() {
        let queue = Queue::builder("demo")
            .mode(Mode::Direct)
            .encryption_secret("s3cret")
            .cipher(Arc::new(TaggedCipher))
            .handler(noop_handler)
            .env_overrides(EnvOverrides::default())
            .build()
            .unwrap();

        let receipt = queue.enqueue(&payload()).await.unwrap();
        assert!(receipt.id.ends_with(DIRECT_ID_SUFFIX));
    }

    #[test]
    fn test_join_url_drops_empty_segments() {
        assert_eq!(join_url(["https://zeplo.to", "", "demo"]), "https://zeplo.to/demo");
        assert_eq!(join_url(["", "", "demo"]), "demo");
        assert_eq!(join_url(["https://zeplo.to/", "/api/", "demo"]), "https://zeplo.to/api/demo");
    }
}
