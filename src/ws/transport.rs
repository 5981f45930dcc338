//! Default [`Transport`] backed by `tokio-tungstenite`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use futures::{SinkExt as _, StreamExt as _};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest as _;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::error::WsError;
use super::event::{CloseEvent, TransportEvent};
use super::traits::{EventSender, ReadyState, Transport, TransportHandle};
use crate::Result;
use crate::error::{Error, Kind};

/// Opens real WebSocket connections. Requires a running tokio runtime.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl Transport for WebSocketTransport {
    type Handle = WebSocketHandle;

    fn open(&self, url: &str, events: EventSender) -> Result<WebSocketHandle> {
        let parsed = Url::parse(url)?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(WsError::UnsupportedScheme(parsed.scheme().to_owned()).into());
        }
        let request = url
            .into_client_request()
            .map_err(|e| Error::with_source(Kind::Connection, WsError::Connection(e)))?;

        let ready_state = Arc::new(AtomicU8::new(ReadyState::Connecting as u8));
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        tokio::spawn(run_socket(
            request,
            Arc::clone(&ready_state),
            outbound_rx,
            events,
            shutdown.clone(),
        ));

        Ok(WebSocketHandle {
            ready_state,
            outbound_tx,
            shutdown,
        })
    }
}

/// One socket spawned by [`WebSocketTransport`]. Dropping it closes the socket.
#[derive(Debug)]
pub struct WebSocketHandle {
    ready_state: Arc<AtomicU8>,
    outbound_tx: mpsc::UnboundedSender<String>,
    shutdown: CancellationToken,
}

impl TransportHandle for WebSocketHandle {
    fn ready_state(&self) -> ReadyState {
        ReadyState::from_u8(self.ready_state.load(Ordering::Acquire))
    }

    fn send(&self, text: String) -> Result<()> {
        self.outbound_tx
            .send(text)
            .map_err(|_e| WsError::ConnectionClosed)?;
        Ok(())
    }

    fn close(&self) {
        if matches!(self.ready_state(), ReadyState::Connecting | ReadyState::Open) {
            self.ready_state
                .store(ReadyState::Closing as u8, Ordering::Release);
        }
        self.shutdown.cancel();
    }
}

impl Drop for WebSocketHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Drives one socket from handshake to close, reporting on `events`.
async fn run_socket(
    request: Request,
    ready_state: Arc<AtomicU8>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    events: EventSender,
    shutdown: CancellationToken,
) {
    let set_state = |state: ReadyState| ready_state.store(state as u8, Ordering::Release);

    let connected = tokio::select! {
        biased;

        () = shutdown.cancelled() => {
            set_state(ReadyState::Closed);
            return;
        }
        result = connect_async(request) => result,
    };

    let ws_stream = match connected {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(error = %e, "WebSocket handshake failed");
            set_state(ReadyState::Closed);
            _ = events.send(TransportEvent::Error(e.into()));
            _ = events.send(TransportEvent::Close(CloseEvent::abnormal()));
            return;
        }
    };

    set_state(ReadyState::Open);
    _ = events.send(TransportEvent::Open);

    let (mut write, mut read) = ws_stream.split();

    let close_event = loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                set_state(ReadyState::Closing);
                _ = write.send(Message::Close(None)).await;
                break CloseEvent::new(1000, "closed by client");
            }

            Some(text) = outbound_rx.recv() => {
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    _ = events.send(TransportEvent::Error(e.into()));
                    break CloseEvent::abnormal();
                }
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        #[cfg(feature = "tracing")]
                        tracing::trace!(%text, "Received WebSocket text message");
                        _ = events.send(TransportEvent::Message(text.to_string()));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break frame.map_or_else(
                            || CloseEvent::new(1005, ""),
                            |frame| CloseEvent::new(u16::from(frame.code), frame.reason.as_str().to_owned()),
                        );
                    }
                    Some(Err(e)) => {
                        _ = events.send(TransportEvent::Error(e.into()));
                        break CloseEvent::abnormal();
                    }
                    None => break CloseEvent::abnormal(),
                    Some(Ok(_)) => {
                        // Binary frames are not part of the contract; ping/pong is handled by tungstenite.
                    }
                }
            }
        }
    };

    set_state(ReadyState::Closed);
    _ = events.send(TransportEvent::Close(close_event));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unparseable_url_without_spawning() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let error = WebSocketTransport.open("::not a url::", tx).unwrap_err();

        assert_eq!(error.kind(), Kind::Connection);
        assert_eq!(error.code(), Some(-1));
    }

    #[test]
    fn rejects_non_websocket_scheme() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let error = WebSocketTransport
            .open("https://example.com?token=t", tx)
            .unwrap_err();

        assert!(matches!(
            error.downcast_ref::<WsError>(),
            Some(WsError::UnsupportedScheme(scheme)) if scheme == "https"
        ));
    }

    #[tokio::test]
    async fn refused_connection_reports_error_then_close() {
        // Nothing listens on the loopback discard port.
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = WebSocketTransport
            .open("ws://127.0.0.1:9/?token=t", tx)
            .unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(TransportEvent::Error(e)) if e.kind() == Kind::WebSocket
        ));
        assert!(matches!(
            rx.recv().await,
            Some(TransportEvent::Close(event)) if !event.was_clean
        ));
        assert_eq!(handle.ready_state(), ReadyState::Closed);
    }

    #[tokio::test]
    async fn close_before_handshake_goes_straight_to_closed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = WebSocketTransport
            .open("ws://10.255.255.1:81/?token=t", tx)
            .unwrap();

        handle.close();
        assert_eq!(handle.ready_state(), ReadyState::Closing);

        // The socket task exits without reporting anything once cancelled.
        assert!(rx.recv().await.is_none(), "no events after cancellation");
        assert_eq!(handle.ready_state(), ReadyState::Closed);
        assert!(handle.send("{}".to_owned()).is_err(), "writer is gone");
    }
}
