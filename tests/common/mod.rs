#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]
#![allow(
    unused,
    reason = "Each test binary uses a different subset of these helpers"
)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use resilient_ws::error::{Error, Kind, Validation};
use resilient_ws::ws::{
    CloseEvent, Config, ConnectionManager, EventSender, Handlers, Payload, ReadyState, Transport,
    TransportEvent, TransportHandle, WsError,
};

pub const ENDPOINT: &str = "wss://x";
pub const TOKEN: &str = "t";

#[must_use]
pub fn config(reconnect_interval_ms: u64) -> Config {
    Config::builder()
        .endpoint(ENDPOINT)
        .token(TOKEN.to_owned())
        .reconnect_interval(Duration::from_millis(reconnect_interval_ms))
        .build()
}

#[must_use]
pub fn manager(
    config: Config,
    transport: &MockTransport,
    recorder: &Recorder,
) -> ConnectionManager<MockTransport> {
    ConnectionManager::with_transport(config, recorder.handlers(), transport.clone())
}

/// Let spawned listener and timer tasks drain without moving the clock.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// One socket created by [`MockTransport`], scripted by the test.
#[derive(Clone)]
pub struct MockSocket {
    pub url: String,
    events: EventSender,
    ready: Arc<AtomicU8>,
    sent: Arc<Mutex<Vec<String>>>,
    close_calls: Arc<AtomicUsize>,
}

impl MockSocket {
    fn set_ready(&self, state: ReadyState) {
        self.ready.store(state as u8, Ordering::SeqCst);
    }

    /// Finish the handshake.
    pub fn open(&self) {
        self.set_ready(ReadyState::Open);
        drop(self.events.send(TransportEvent::Open));
    }

    /// Peer went away without a close frame.
    pub fn drop_connection(&self) {
        self.set_ready(ReadyState::Closed);
        drop(self.events.send(TransportEvent::Close(CloseEvent::abnormal())));
    }

    pub fn message(&self, text: &str) {
        drop(self.events.send(TransportEvent::Message(text.to_owned())));
    }

    pub fn error(&self) {
        let error = Error::with_source(Kind::WebSocket, WsError::ConnectionClosed);
        drop(self.events.send(TransportEvent::Error(error)));
    }

    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        ReadyState::from_u8(self.ready.load(Ordering::SeqCst))
    }
}

pub struct MockHandle(MockSocket);

impl TransportHandle for MockHandle {
    fn ready_state(&self) -> ReadyState {
        self.0.ready_state()
    }

    fn send(&self, text: String) -> resilient_ws::Result<()> {
        self.0.sent.lock().unwrap().push(text);
        Ok(())
    }

    fn close(&self) {
        self.0.close_calls.fetch_add(1, Ordering::SeqCst);
        self.0.set_ready(ReadyState::Closed);
    }
}

/// Records every socket it opens; construction failures can be queued.
#[derive(Clone, Default)]
pub struct MockTransport {
    sockets: Arc<Mutex<Vec<MockSocket>>>,
    failures: Arc<Mutex<VecDeque<String>>>,
}

impl MockTransport {
    pub fn fail_next(&self, reason: &str) {
        self.failures.lock().unwrap().push_back(reason.to_owned());
    }

    #[must_use]
    pub fn opened(&self) -> usize {
        self.sockets.lock().unwrap().len()
    }

    #[must_use]
    pub fn socket(&self, index: usize) -> MockSocket {
        self.sockets.lock().unwrap()[index].clone()
    }

    #[must_use]
    pub fn last(&self) -> MockSocket {
        self.sockets.lock().unwrap().last().cloned().unwrap()
    }
}

impl Transport for MockTransport {
    type Handle = MockHandle;

    fn open(&self, url: &str, events: EventSender) -> resilient_ws::Result<MockHandle> {
        if let Some(reason) = self.failures.lock().unwrap().pop_front() {
            return Err(Error::connection(reason));
        }

        let socket = MockSocket {
            url: url.to_owned(),
            events,
            ready: Arc::new(AtomicU8::new(ReadyState::Connecting as u8)),
            sent: Arc::default(),
            close_calls: Arc::default(),
        };
        self.sockets.lock().unwrap().push(socket.clone());
        Ok(MockHandle(socket))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedError {
    /// Generation from the error event, `None` for synchronous failures
    pub generation: Option<u64>,
    pub code: Option<i32>,
    pub kind: Kind,
    pub message: String,
}

/// Captures every callback invocation.
#[derive(Clone, Default)]
pub struct Recorder {
    connects: Arc<Mutex<Vec<u64>>>,
    disconnects: Arc<Mutex<Vec<CloseEvent>>>,
    closes: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<Payload>>>,
    errors: Arc<Mutex<Vec<RecordedError>>>,
}

impl Recorder {
    #[must_use]
    pub fn handlers(&self) -> Handlers {
        let connects = Arc::clone(&self.connects);
        let disconnects = Arc::clone(&self.disconnects);
        let closes = Arc::clone(&self.closes);
        let received = Arc::clone(&self.received);
        let errors = Arc::clone(&self.errors);

        Handlers::new()
            .on_connect(move |event| connects.lock().unwrap().push(event.generation))
            .on_disconnect(move |event| disconnects.lock().unwrap().push(event.clone()))
            .on_close(move || {
                closes.fetch_add(1, Ordering::SeqCst);
            })
            .on_receive(move |payload| received.lock().unwrap().push(payload))
            .on_error(move |error, event| {
                let message = error
                    .downcast_ref::<Validation>()
                    .map_or_else(|| error.to_string(), |v| v.reason.clone());
                errors.lock().unwrap().push(RecordedError {
                    generation: event.map(|event| event.generation),
                    code: error.code(),
                    kind: error.kind(),
                    message,
                });
            })
    }

    /// Generations reported to the connect callback, in order.
    #[must_use]
    pub fn connects(&self) -> Vec<u64> {
        self.connects.lock().unwrap().clone()
    }

    #[must_use]
    pub fn disconnects(&self) -> Vec<CloseEvent> {
        self.disconnects.lock().unwrap().clone()
    }

    #[must_use]
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn received(&self) -> Vec<Payload> {
        self.received.lock().unwrap().clone()
    }

    #[must_use]
    pub fn errors(&self) -> Vec<RecordedError> {
        self.errors.lock().unwrap().clone()
    }
}
