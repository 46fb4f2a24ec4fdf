//! Simple SDK Example
//!
//! Declares a queue in direct mode (no network, the delivery loops
//! back in-process) and enqueues one job.
//!
//! ```bash
//! cargo run --package zeplo-core --example simple
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use zeplo_core::{CallOptions, JobMeta, Mode, Queue};

#[derive(Debug, Serialize, Deserialize)]
struct Greeting {
    name: String,
}

async fn greet(payload: Greeting, meta: JobMeta) -> anyhow::Result<()> {
    println!("   handler ran: hello {} (job {})", payload.name, meta.id);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("zeplo=debug")),
        )
        .init();

    println!("Zeplo SDK - Simple Example");
    println!("==========================\n");

    // Direct mode: enqueue resolves only after the handler ran.
    let queue = Arc::new(
        Queue::builder("demo/greet")
            .mode(Mode::Direct)
            .handler(greet)
            .build()?,
    );

    println!("1. Enqueuing a job...");
    let receipt = queue
        .enqueue(&Greeting {
            name: "world".to_string(),
        })
        .await?;
    println!("   job id: {}\n", receipt.id);

    println!("2. Enqueuing a traced job...");
    let traced = queue
        .enqueue_with(
            &Greeting {
                name: "again".to_string(),
            },
            CallOptions {
                trace: Some(receipt.id.clone()),
                ..Default::default()
            },
        )
        .await?;
    println!("   job id: {}\n", traced.id);

    println!("Done.");
    Ok(())
}
