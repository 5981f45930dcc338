use std::fmt;
use std::sync::Arc;

use super::event::{CloseEvent, ErrorEvent, OpenEvent};
use super::payload::Payload;
use crate::error::Error;

pub type ConnectCallback = Arc<dyn Fn(&OpenEvent) + Send + Sync>;
pub type DisconnectCallback = Arc<dyn Fn(&CloseEvent) + Send + Sync>;
pub type CloseCallback = Arc<dyn Fn() + Send + Sync>;
pub type ReceiveCallback = Arc<dyn Fn(Payload) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&Error, Option<&ErrorEvent>) + Send + Sync>;

/// User callbacks invoked on lifecycle events. Every slot is optional.
///
/// Callbacks run on the runtime's worker threads, never while the manager's
/// internal lock is held, so they may call back into the manager.
#[non_exhaustive]
#[derive(Clone, Default)]
pub struct Handlers {
    pub(crate) on_connect: Option<ConnectCallback>,
    pub(crate) on_disconnect: Option<DisconnectCallback>,
    pub(crate) on_close: Option<CloseCallback>,
    pub(crate) on_receive: Option<ReceiveCallback>,
    pub(crate) on_error: Option<ErrorCallback>,
}

impl Handlers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called when a transport instance finishes its handshake.
    #[must_use]
    pub fn on_connect<F>(mut self, f: F) -> Self
    where
        F: Fn(&OpenEvent) + Send + Sync + 'static,
    {
        self.on_connect = Some(Arc::new(f));
        self
    }

    /// Called whenever the socket goes away without [`super::ConnectionManager::close`]
    /// having been called. A reconnect is always scheduled afterwards.
    #[must_use]
    pub fn on_disconnect<F>(mut self, f: F) -> Self
    where
        F: Fn(&CloseEvent) + Send + Sync + 'static,
    {
        self.on_disconnect = Some(Arc::new(f));
        self
    }

    /// Called after an explicit [`super::ConnectionManager::close`] tore something down.
    #[must_use]
    pub fn on_close<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_close = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_receive<F>(mut self, f: F) -> Self
    where
        F: Fn(Payload) + Send + Sync + 'static,
    {
        self.on_receive = Some(Arc::new(f));
        self
    }

    /// Configuration, construction, encoding and socket errors all land here.
    ///
    /// The event is `Some` only for errors a live transport instance reported
    /// on its own; failures raised inside a manager call get `None`.
    #[must_use]
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&Error, Option<&ErrorEvent>) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_receive", &self.on_receive.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
