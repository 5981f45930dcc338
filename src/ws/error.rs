#![expect(
    clippy::module_name_repetitions,
    reason = "Error types include the module name to indicate their scope"
)]

use std::error::Error as StdError;
use std::fmt;

use crate::error::Kind;

/// WebSocket error variants.
#[non_exhaustive]
#[derive(Debug)]
pub enum WsError {
    /// Error connecting to or communicating with the WebSocket server
    Connection(tokio_tungstenite::tungstenite::Error),
    /// The composed URL does not use a WebSocket scheme
    UnsupportedScheme(String),
    /// A payload could not be encoded as JSON text
    Serialize(serde_json::Error),
    /// No open transport to write to
    NotConnected,
    /// WebSocket connection was closed
    ConnectionClosed,
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(e) => write!(f, "WebSocket connection error: {e}"),
            Self::UnsupportedScheme(scheme) => {
                write!(f, "unsupported WebSocket scheme: {scheme}")
            }
            Self::Serialize(e) => write!(f, "Failed to encode WebSocket payload: {e}"),
            Self::NotConnected => write!(f, "WebSocket is not open"),
            Self::ConnectionClosed => write!(f, "WebSocket connection closed"),
        }
    }
}

impl StdError for WsError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Connection(e) => Some(e),
            Self::Serialize(e) => Some(e),
            _ => None,
        }
    }
}

impl From<WsError> for crate::error::Error {
    fn from(e: WsError) -> Self {
        let kind = match e {
            WsError::UnsupportedScheme(_) => Kind::Connection,
            WsError::Serialize(_) => Kind::Internal,
            _ => Kind::WebSocket,
        };
        crate::error::Error::with_source(kind, e)
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for crate::error::Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        crate::error::Error::with_source(Kind::WebSocket, WsError::Connection(e))
    }
}
