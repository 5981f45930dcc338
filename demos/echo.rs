//! Connects to an echo server, sends a few messages and reports every callback.
//!
//! Run with tracing enabled:
//! ```sh
//! RUST_LOG=debug cargo run --example echo --features tracing -- wss://echo.websocket.org demo-token
//! ```

use std::env;
use std::time::Duration;

use resilient_ws::ws::{Config, ConnectionManager, Handlers, Payload};
use serde_json::json;
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = env::args().skip(1);
    let endpoint = args
        .next()
        .unwrap_or_else(|| "wss://echo.websocket.org".to_owned());
    let token = args.next().unwrap_or_else(|| "demo-token".to_owned());

    let config = Config::builder()
        .endpoint(endpoint)
        .token(token)
        .reconnect_interval(Duration::from_secs(2))
        .build();

    let handlers = Handlers::new()
        .on_connect(|event| info!(generation = event.generation, "connected"))
        .on_disconnect(|event| warn!(code = event.code, reason = %event.reason, "disconnected"))
        .on_close(|| info!("closed"))
        .on_receive(|payload| match payload {
            Payload::Json(value) => info!(%value, "received json"),
            Payload::Raw(text) => info!(%text, "received text"),
            _ => {}
        })
        .on_error(|error, event| {
            warn!(code = ?error.code(), generation = ?event.map(|e| e.generation), %error, "error");
        });

    let connection: ConnectionManager = ConnectionManager::new(config, handlers);
    anyhow::ensure!(connection.connect(), "invalid configuration");

    for seq in 0..5 {
        sleep(Duration::from_secs(1)).await;
        info!(status = connection.status(), seq, "sending");
        connection.send(&json!({"type": "ping", "seq": seq}));
    }

    connection.close();
    Ok(())
}
