//! Zeplo Rust SDK - queue client library
//!
//! Binds an application to the Zeplo job-queueing service: enqueue a
//! typed payload over HTTP, and handle the service's delivery
//! callback by running your handler and returning a normalized
//! response. Scheduling, retries, and delivery guarantees live in the
//! remote service; this crate builds the requests and decodes the
//! callbacks.
//!
//! # Example
//!
//! ```no_run
//! use serde::{Deserialize, Serialize};
//! use zeplo_core::{JobMeta, Queue};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Welcome {
//!     user_id: String,
//! }
//!
//! async fn send_welcome(payload: Welcome, meta: JobMeta) -> anyhow::Result<()> {
//!     println!("job {} for user {}", meta.id, payload.user_id);
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Declare once; token falls back to ZEPLO_TOKEN.
//!     let queue = Queue::builder("email/welcome")
//!         .handler(send_welcome)
//!         .build()?;
//!
//!     // Enqueue from anywhere.
//!     let receipt = queue
//!         .enqueue(&Welcome {
//!             user_id: "u-1".to_string(),
//!         })
//!         .await?;
//!     println!("queued as {}", receipt.id);
//!
//!     Ok(())
//! }
//! ```
//!
//! The delivery side (`Queue::respond_to`) is wired up by a framework
//! adapter such as `zeplo-axum`, which mounts the queue's route and
//! feeds the raw callback body and headers into this crate.

pub mod config;
pub mod error;
pub mod headers;
pub mod port;
pub mod queue;
pub mod retry;

// Re-exports
pub use config::{CallOptions, Delay, EnvOverrides, Mode, QueueOptions, ResolvedConfig};
pub use error::{ClientError, ConfigError, DeliveryError, Result};
pub use headers::{Headers, HEADER_ID, HEADER_START, HEADER_TOKEN};
pub use queue::{
    DeliveryBody, DeliveryResponse, EnqueueReceipt, Handler, JobMeta, Queue, QueueBuilder,
};
pub use retry::{Backoff, Retry};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
