//! Axum adapter for zeplo-core queues.
//!
//! Thin translation layer: extracts the raw callback body and headers
//! from an axum request, feeds them to [`Queue::respond_to`], and
//! turns the normalized `{status, body}` result back into an axum
//! response.
//!
//! ```no_run
//! # use serde::{Deserialize, Serialize};
//! # use zeplo_core::{JobMeta, Queue};
//! # #[derive(Serialize, Deserialize)]
//! # struct Payload { foo: String }
//! # async fn handle(_p: Payload, _m: JobMeta) -> anyhow::Result<()> { Ok(()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = Queue::builder("email/welcome").handler(handle).build()?;
//! let app = zeplo_axum::router(queue);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Serialize;
use zeplo_core::{DeliveryBody, DeliveryResponse, Headers, Queue};

/// Convert axum's native headers into the core's case-insensitive
/// map. Non-UTF-8 header values are dropped; the wire headers the
/// core reads are always ASCII.
pub fn to_core_headers(headers: &HeaderMap) -> Headers {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str(), v.to_string()))
        })
        .collect()
}

/// Convert the core's normalized delivery result into an axum
/// response.
pub fn into_axum_response(response: DeliveryResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match response.body {
        DeliveryBody::Json(value) => (status, axum::Json(value)).into_response(),
        DeliveryBody::Text(text) => (status, text).into_response(),
    }
}

/// Mount a queue's delivery callback at `POST /<route>`.
///
/// Merge the returned router into your app with [`Router::merge`], or
/// serve it standalone.
pub fn router<P>(queue: Queue<P>) -> Router
where
    P: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let path = format!("/{}", queue.route().trim_start_matches('/'));
    Router::new()
        .route(&path, post(deliver::<P>))
        .with_state(queue)
}

async fn deliver<P>(
    State(queue): State<Queue<P>>,
    headers: HeaderMap,
    body: String,
) -> Response
where
    P: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let response = queue.respond_to(body, &to_core_headers(&headers)).await;
    into_axum_response(response)
}
