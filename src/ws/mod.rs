//! Self-reconnecting WebSocket connection.
//!
//! # Architecture
//!
//! - [`ConnectionManager`]: owns one transport at a time, dispatches its
//!   notifications to [`Handlers`] and re-dials on a fixed interval after drops
//! - [`Transport`] / [`TransportHandle`]: the socket seam; [`WebSocketTransport`]
//!   is the `tokio-tungstenite` implementation used by default
//! - [`Payload`]: inbound text normalized to JSON, or left raw when it is not JSON
//!
//! # Example
//!
//! ```rust, no_run
//! use std::time::Duration;
//!
//! use resilient_ws::ws::{Config, ConnectionManager, Handlers};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::builder()
//!         .endpoint("wss://example.com/socket")
//!         .token("opaque-token".to_owned())
//!         .reconnect_interval(Duration::from_secs(1))
//!         .build();
//!
//!     let connection: ConnectionManager = ConnectionManager::new(config, Handlers::new());
//!     connection.connect();
//!
//!     // Dropped silently unless the socket is open.
//!     connection.send(&json!({"type": "subscribe"}));
//!
//!     connection.close();
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod handlers;
pub mod payload;
pub mod traits;
pub mod transport;

pub use config::Config;
pub use connection::{ConnectionManager, InitStatus};
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
pub use event::{CloseEvent, ErrorEvent, OpenEvent, TransportEvent};
pub use handlers::Handlers;
pub use payload::Payload;
pub use traits::*;
pub use transport::WebSocketTransport;
