//! Notifications a transport delivers for a single socket instance.

use crate::error::Error;

/// Close code used when the socket went away without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Emitted once per transport instance when the handshake completes.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenEvent {
    /// Generation of the transport instance that opened
    pub generation: u64,
}

/// Context for an error reported asynchronously by a transport instance.
///
/// Absent for failures raised synchronously by
/// [`connect`](super::ConnectionManager::connect) or
/// [`send`](super::ConnectionManager::send).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorEvent {
    /// Generation of the transport instance that errored
    pub generation: u64,
}

/// Emitted when a transport instance stops, cleanly or not.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    /// Close code from the peer's close frame, or [`ABNORMAL_CLOSURE`]
    pub code: u16,
    /// Close reason from the peer's close frame
    pub reason: String,
    /// Whether a close frame was exchanged
    pub was_clean: bool,
}

impl CloseEvent {
    #[must_use]
    pub fn new<S: Into<String>>(code: u16, reason: S) -> Self {
        Self {
            code,
            reason: reason.into(),
            was_clean: true,
        }
    }

    /// The socket dropped, failed to connect, or errored mid-stream.
    #[must_use]
    pub fn abnormal() -> Self {
        Self {
            code: ABNORMAL_CLOSURE,
            reason: String::new(),
            was_clean: false,
        }
    }
}

/// Raw notification pushed by a [`super::Transport`] into its event channel.
///
/// A transport delivers at most one [`TransportEvent::Open`] and treats
/// [`TransportEvent::Close`] as terminal for the instance.
#[non_exhaustive]
#[derive(Debug)]
pub enum TransportEvent {
    Open,
    Close(CloseEvent),
    /// Text frame, undecoded
    Message(String),
    Error(Error),
}
