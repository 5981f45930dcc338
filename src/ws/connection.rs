#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;
use serde_repr::{Deserialize_repr, Serialize_repr};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use super::config::Config;
use super::error::WsError;
use super::event::{CloseEvent, ErrorEvent, OpenEvent, TransportEvent};
use super::handlers::Handlers;
use super::payload::Payload;
use super::traits::{ReadyState, Transport, TransportHandle};
use super::transport::WebSocketTransport;
use crate::Result;
use crate::error::Error;

/// Value of [`ConnectionManager::status`] while no transport exists.
pub const NO_TRANSPORT: i32 = -1;

/// Whether the manager has ever completed a handshake.
///
/// Only an open notification moves this to [`InitStatus::Connected`] and only a
/// transport construction failure moves it to [`InitStatus::Failed`]. Dropped
/// connections leave it untouched.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i8)]
pub enum InitStatus {
    #[default]
    Uninitialized = 0,
    Connected = 1,
    Failed = -1,
}

/// The transport instance currently owned by the manager, with its listener.
struct Active<H: TransportHandle> {
    generation: u64,
    handle: H,
    listener: JoinHandle<()>,
}

impl<H: TransportHandle> Drop for Active<H> {
    fn drop(&mut self) {
        self.listener.abort();
        self.handle.close();
    }
}

struct State<H: TransportHandle> {
    init_status: InitStatus,
    /// Last generation handed out; every transport instance gets a fresh one
    generation: u64,
    active: Option<Active<H>>,
    /// `Some` iff a reconnect loop is armed
    reconnect_timer: Option<JoinHandle<()>>,
    /// Bumped every time a loop is armed, so a disarmed loop can tell it lost its slot
    timer_epoch: u64,
}

impl<H: TransportHandle> State<H> {
    fn is_current(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.generation == generation)
    }

    fn is_open(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.handle.ready_state() == ReadyState::Open)
    }

    /// Cancels the reconnect loop, returning whether one was armed.
    fn disarm(&mut self) -> bool {
        match self.reconnect_timer.take() {
            Some(timer) => {
                timer.abort();
                true
            }
            None => false,
        }
    }
}

impl<H: TransportHandle> Drop for State<H> {
    fn drop(&mut self) {
        self.disarm();
    }
}

struct Inner<T: Transport> {
    config: Config,
    handlers: Handlers,
    transport: T,
    state: Mutex<State<T::Handle>>,
}

/// Keeps a single WebSocket connection alive and reports its lifecycle
/// through [`Handlers`].
///
/// - [`connect`](Self::connect) opens a transport and attaches listeners to it
/// - a close notification arms a fixed-interval reconnect loop that retries
///   until a handshake succeeds or [`close`](Self::close) is called
/// - notifications from superseded transport instances are discarded
///
/// All methods report failures through the error callback or their return
/// value; none of them panic on network conditions. A tokio runtime must be
/// running when [`connect`](Self::connect) is called.
///
/// # Example
///
/// ```rust, no_run
/// use resilient_ws::ws::{Config, ConnectionManager, Handlers};
///
/// #[tokio::main]
/// async fn main() {
///     let config = Config::builder()
///         .endpoint("wss://example.com/socket")
///         .token("opaque-token".to_owned())
///         .build();
///     let handlers = Handlers::new()
///         .on_connect(|_| println!("connected"))
///         .on_receive(|payload| println!("{payload:?}"));
///
///     let connection: ConnectionManager = ConnectionManager::new(config, handlers);
///     assert!(connection.connect());
/// }
/// ```
pub struct ConnectionManager<T: Transport = WebSocketTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for ConnectionManager<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> fmt::Debug for ConnectionManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("endpoint", &self.inner.config.endpoint)
            .field("init_status", &self.init_status())
            .field("status", &self.status())
            .field("reconnecting", &self.is_reconnecting())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> ConnectionManager<T> {
    /// Create a manager using the transport's default construction.
    ///
    /// Nothing is opened until [`connect`](Self::connect) is called.
    #[must_use]
    pub fn new(config: Config, handlers: Handlers) -> Self
    where
        T: Default,
    {
        Self::with_transport(config, handlers, T::default())
    }

    /// Create a manager that opens sockets through `transport`.
    #[must_use]
    pub fn with_transport(config: Config, handlers: Handlers, transport: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                handlers,
                transport,
                state: Mutex::new(State {
                    init_status: InitStatus::Uninitialized,
                    generation: 0,
                    active: None,
                    reconnect_timer: None,
                    timer_epoch: 0,
                }),
            }),
        }
    }

    /// Settings this manager was created with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Open a new transport to `<endpoint>?token=<token>`.
    ///
    /// Returns `false` when the configuration is invalid or the transport could
    /// not be constructed; both cases are also reported to the error callback.
    /// Returns `true` once the connection attempt is underway. The handshake
    /// outcome arrives later through the connect/disconnect callbacks.
    ///
    /// A previously held transport is detached and closed first.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn connect(&self) -> bool {
        self.connect_with(true)
    }

    /// Same as [`connect`](Self::connect).
    ///
    /// `bind_events` is accepted for callers written against listener-binding
    /// APIs, but listeners are attached on every call: each attempt creates a
    /// new transport instance, and an unbound instance could never report that
    /// it opened.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self), fields(endpoint = %self.inner.config.endpoint))
    )]
    pub fn connect_with(&self, bind_events: bool) -> bool {
        if let Err(e) = self.inner.config.validate() {
            self.emit_error(&e, None);
            return false;
        }

        #[cfg(feature = "tracing")]
        {
            if !bind_events {
                tracing::debug!("Listeners are attached on every connect, ignoring bind_events = false");
            }
        }
        #[cfg(not(feature = "tracing"))]
        let _: bool = bind_events;

        let opened = self.replace_transport(&mut self.state());
        self.report_dial(opened)
    }

    /// Detach the current transport and open a new one, all under the caller's lock.
    fn replace_transport(&self, state: &mut State<T::Handle>) -> Result<u64> {
        drop(state.active.take());

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        match self
            .inner
            .transport
            .open(&self.inner.config.composed_url(), events_tx)
        {
            Ok(handle) => {
                state.generation += 1;
                let generation = state.generation;
                let listener = tokio::spawn(Self::listen(
                    Arc::downgrade(&self.inner),
                    generation,
                    events_rx,
                ));
                state.active = Some(Active {
                    generation,
                    handle,
                    listener,
                });
                Ok(generation)
            }
            Err(e) => {
                state.init_status = InitStatus::Failed;
                Err(e)
            }
        }
    }

    fn report_dial(&self, opened: Result<u64>) -> bool {
        match opened {
            Ok(generation) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(generation, "WebSocket connection requested");
                #[cfg(not(feature = "tracing"))]
                let _: u64 = generation;
                true
            }
            Err(e) => {
                self.emit_error(&e, None);
                false
            }
        }
    }

    /// Live ready-state code of the current transport, or [`NO_TRANSPORT`].
    ///
    /// `0` connecting, `1` open, `2` closing, `3` closed.
    #[must_use]
    pub fn status(&self) -> i32 {
        self.ready_state().map_or(NO_TRANSPORT, ReadyState::code)
    }

    #[must_use]
    pub fn ready_state(&self) -> Option<ReadyState> {
        self.state()
            .active
            .as_ref()
            .map(|active| active.handle.ready_state())
    }

    #[must_use]
    pub fn init_status(&self) -> InitStatus {
        self.state().init_status
    }

    /// Whether a reconnect loop is currently armed.
    #[must_use]
    pub fn is_reconnecting(&self) -> bool {
        self.state().reconnect_timer.is_some()
    }

    /// Send `payload` as JSON text if the connection is open.
    ///
    /// Messages sent while not open are dropped silently; there is no queue.
    /// Encoding failures go to the error callback.
    pub fn send<P: Serialize + ?Sized>(&self, payload: &P) {
        match self.try_send(payload) {
            Ok(()) => {}
            Err(e) if matches!(e.downcast_ref::<WsError>(), Some(WsError::NotConnected)) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Dropping outbound message, WebSocket is not open");
            }
            Err(e) => self.emit_error(&e, None),
        }
    }

    /// Like [`send`](Self::send) but reports [`WsError::NotConnected`] instead
    /// of dropping the message.
    pub fn try_send<P: Serialize + ?Sized>(&self, payload: &P) -> Result<()> {
        let state = self.state();
        let handle = state
            .active
            .as_ref()
            .map(|active| &active.handle)
            .filter(|handle| handle.ready_state() == ReadyState::Open)
            .ok_or(WsError::NotConnected)?;

        let text = serde_json::to_string(payload).map_err(WsError::Serialize)?;
        handle.send(text)
    }

    /// Tear down the reconnect loop and the current transport.
    ///
    /// Listeners are detached before the transport is closed, so nothing it
    /// reports afterwards reaches the callbacks. Safe to call repeatedly; the
    /// manager can be connected again afterwards.
    pub fn close(&self) {
        let (was_reconnecting, active) = {
            let mut state = self.state();
            (state.disarm(), state.active.take())
        };

        let had_transport = active.is_some();
        drop(active);

        if !was_reconnecting && !had_transport {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::info!(endpoint = %self.inner.config.endpoint, "WebSocket closed");

        if let Some(on_close) = &self.inner.handlers.on_close {
            on_close();
        }
    }

    /// Forward notifications of one transport instance until it stops reporting.
    async fn listen(
        inner: Weak<Inner<T>>,
        generation: u64,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
    ) {
        while let Some(event) = events.recv().await {
            let Some(inner) = inner.upgrade() else {
                break;
            };
            Self { inner }.dispatch(generation, event);
        }
    }

    fn dispatch(&self, generation: u64, event: TransportEvent) {
        match event {
            TransportEvent::Open => self.handle_open(generation),
            TransportEvent::Close(event) => self.handle_close(generation, &event),
            TransportEvent::Message(text) => self.handle_message(generation, text),
            TransportEvent::Error(error) => self.handle_error(generation, &error),
        }
    }

    fn handle_open(&self, generation: u64) {
        {
            let mut state = self.state();
            if !state.is_current(generation) {
                return;
            }
            state.init_status = InitStatus::Connected;
            if state.disarm() {
                #[cfg(feature = "tracing")]
                tracing::debug!(generation, "Connection restored, reconnect timer disarmed");
            }
        }

        #[cfg(feature = "tracing")]
        tracing::info!(endpoint = %self.inner.config.endpoint, generation, "WebSocket connected");

        if let Some(on_connect) = &self.inner.handlers.on_connect {
            on_connect(&OpenEvent { generation });
        }
    }

    fn handle_close(&self, generation: u64, event: &CloseEvent) {
        let status = {
            let state = self.state();
            if !state.is_current(generation) {
                return;
            }
            state.init_status
        };

        #[cfg(feature = "tracing")]
        {
            let phase = match status {
                InitStatus::Connected => "connection dropped",
                InitStatus::Uninitialized | InitStatus::Failed => "failed to initialize",
            };
            tracing::warn!(
                code = event.code,
                reason = %event.reason,
                "WebSocket {phase}, reconnecting"
            );
        }
        #[cfg(not(feature = "tracing"))]
        let _: InitStatus = status;

        if let Some(on_disconnect) = &self.inner.handlers.on_disconnect {
            on_disconnect(event);
        }

        self.reconnect(generation);
    }

    fn handle_message(&self, generation: u64, text: String) {
        if !self.state().is_current(generation) {
            return;
        }

        let payload = Payload::decode(text);
        if let Some(on_receive) = &self.inner.handlers.on_receive {
            on_receive(payload);
        }
    }

    fn handle_error(&self, generation: u64, error: &Error) {
        if !self.state().is_current(generation) {
            return;
        }

        self.emit_error(error, Some(&ErrorEvent { generation }));
    }

    fn emit_error(&self, error: &Error, event: Option<&ErrorEvent>) {
        #[cfg(feature = "tracing")]
        tracing::error!(
            code = ?error.code(),
            generation = event.map(|event| event.generation),
            %error,
            "WebSocket error"
        );

        if let Some(on_error) = &self.inner.handlers.on_error {
            on_error(error, event);
        }
    }

    /// Arm the reconnect loop on behalf of transport `generation`.
    ///
    /// Does nothing if the instance was closed or superseded while callbacks
    /// ran, or if a loop is already armed.
    fn reconnect(&self, generation: u64) {
        let mut state = self.state();
        if !state.is_current(generation) || state.reconnect_timer.is_some() {
            return;
        }

        state.timer_epoch += 1;
        let epoch = state.timer_epoch;
        let period = self.inner.config.reconnect_interval;
        let inner = Arc::downgrade(&self.inner);

        let first_tick = Instant::now() + period;

        state.reconnect_timer = Some(tokio::spawn(async move {
            let mut ticker = interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let Some(inner) = inner.upgrade() else {
                    break;
                };
                let connection = Self { inner };
                if !connection.retry(epoch) {
                    break;
                }
            }
        }));

        #[cfg(feature = "tracing")]
        tracing::debug!(interval = ?period, "Reconnect timer armed");
    }

    /// One reconnect tick of loop `epoch`. Returns `false` once the loop should stop.
    ///
    /// The checks and the transport replacement share one lock acquisition, so
    /// an open notification handled concurrently either lands first and stops
    /// this tick, or arrives for an already superseded instance.
    fn retry(&self, epoch: u64) -> bool {
        let opened = {
            let mut state = self.state();
            if state.timer_epoch != epoch || state.reconnect_timer.is_none() {
                // Disarmed while this tick was pending.
                return false;
            }
            if state.is_open() {
                // Still owned by this task, so detach instead of aborting.
                state.reconnect_timer = None;
                return false;
            }

            #[cfg(feature = "tracing")]
            tracing::info!(endpoint = %self.inner.config.endpoint, "Attempting to reconnect");

            self.replace_transport(&mut state)
        };

        self.report_dial(opened);
        true
    }

    fn state(&self) -> MutexGuard<'_, State<T::Handle>> {
        // Critical sections never run user code, so a poisoned lock still holds consistent data.
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
