//! Seams between the connection manager and the socket implementation.

use serde_repr::{Deserialize_repr, Serialize_repr};
use tokio::sync::mpsc;

use super::event::TransportEvent;

/// Channel a transport instance reports its notifications on.
pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// Ready-state of a single transport instance, numbered like the browser
/// `WebSocket.readyState` attribute.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ReadyState {
    /// Numeric ready-state code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Inverse of `self as u8`; unknown values read as [`ReadyState::Closed`].
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Factory for socket instances.
///
/// `open` must not block: it validates the URL, starts the connection attempt
/// in the background and returns immediately. The eventual outcome is reported
/// through `events`, which the transport keeps for the lifetime of the instance.
/// Errors returned from `open` itself are construction failures.
pub trait Transport: Send + Sync + 'static {
    type Handle: TransportHandle;

    fn open(&self, url: &str, events: EventSender) -> crate::Result<Self::Handle>;
}

/// A single socket instance created by a [`Transport`].
pub trait TransportHandle: Send + Sync + 'static {
    /// Live ready-state, never cached by the caller.
    fn ready_state(&self) -> ReadyState;

    /// Queues a text frame.
    fn send(&self, text: String) -> crate::Result<()>;

    /// Starts closing the socket. Must be idempotent.
    fn close(&self);
}
