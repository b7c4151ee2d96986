//! WebSocket gateways.
//!
//! A [`Gateway`] speaks JSON event frames over text messages:
//!
//! ```text
//! → {"event": "message", "data": "ping"}
//! ← {"event": "message", "data": "Received: ping"}
//! ```
//!
//! Incoming frames are routed by `event` to the handler registered with
//! [`Gateway::on`]. A handler returning `Some(data)` replies to the sender
//! under the same event name. [`Gateway::broadcast`] pushes a frame to every
//! connected client.
//!
//! The HTTP upgrade itself is done by the server for requests whose path has
//! a gateway registered via [`Router::gateway`](crate::Router::gateway). On
//! shutdown the server sends every open session a close frame and waits for
//! it to end.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use http::StatusCode;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::protocol::Role;
use tracing::{debug, info, warn};

use crate::response::Response;

/// Frames a slow client may fall behind before it starts missing broadcasts.
const BROADCAST_CAPACITY: usize = 64;

/// One JSON frame on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WsEvent {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

type EventHandler = Arc<dyn Fn(Value) -> Option<Value> + Send + Sync>;

pub struct Gateway {
    handlers: HashMap<String, EventHandler>,
    clients: broadcast::Sender<String>,
}

impl Gateway {
    pub fn new() -> Self {
        let (clients, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { handlers: HashMap::new(), clients }
    }

    /// Handle frames whose `event` is `event`.
    pub fn on<F>(mut self, event: &str, handler: F) -> Self
    where
        F: Fn(Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.handlers.insert(event.to_owned(), Arc::new(handler));
        self
    }

    /// Number of currently connected clients.
    pub fn clients(&self) -> usize {
        self.clients.receiver_count()
    }

    /// Sends `{"event": event, "data": data}` to every connected client.
    /// Returns how many clients it was queued for.
    pub fn broadcast(&self, event: &str, data: Value) -> usize {
        let frame = WsEvent { event: event.to_owned(), data };
        match serde_json::to_string(&frame) {
            Ok(text) => self.clients.send(text).unwrap_or(0),
            Err(e) => {
                warn!(event, error = %e, "failed to encode broadcast frame");
                0
            }
        }
    }

    /// Routes one incoming text frame; returns the reply frame, if any.
    pub fn handle_text(&self, text: &str) -> Option<String> {
        let frame: WsEvent = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "malformed websocket frame");
                return None;
            }
        };
        let Some(handler) = self.handlers.get(&frame.event) else {
            debug!(event = %frame.event, "no handler for websocket event");
            return None;
        };
        let data = handler(frame.data)?;
        let reply = WsEvent { event: frame.event, data };
        serde_json::to_string(&reply).ok()
    }

    /// Runs one client session until either side closes or `stop` fires.
    pub(crate) async fn serve<S>(self: Arc<Self>, ws: WebSocketStream<S>, mut stop: watch::Receiver<bool>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut outgoing = self.clients.subscribe();
        let (mut sink, mut stream) = ws.split();
        info!(clients = self.clients(), "websocket client connected");

        loop {
            tokio::select! {
                incoming = stream.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = self.handle_text(&text) {
                            if sink.send(Message::Text(reply)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket read failed");
                        break;
                    }
                },
                frame = outgoing.recv() => match frame {
                    Ok(text) => {
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "websocket client lagging, broadcasts dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = stop.changed() => {
                    debug!("closing websocket session for shutdown");
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }

        info!("websocket client disconnected");
    }
}

impl Default for Gateway {
    fn default() -> Self { Self::new() }
}

/// Open gateway sessions of one server.
#[derive(Clone)]
pub(crate) struct Sessions {
    stop: watch::Receiver<bool>,
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl Sessions {
    pub(crate) fn new(stop: watch::Receiver<bool>) -> Self {
        Self { stop, tasks: Arc::new(Mutex::new(JoinSet::new())) }
    }

    fn spawn<F>(&self, session: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(session);
    }

    /// Waits for every session spawned so far to end.
    pub(crate) async fn drain(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock());
        debug!(sessions = tasks.len(), "draining websocket sessions");
        while tasks.join_next().await.is_some() {}
    }
}

/// `Upgrade: websocket` with `Connection: upgrade`.
pub(crate) fn is_upgrade_request<B>(req: &hyper::Request<B>) -> bool {
    let has_token = |name: http::header::HeaderName, token: &str| {
        req.headers()
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|v| v.trim().eq_ignore_ascii_case(token))
    };
    has_token(http::header::UPGRADE, "websocket") && has_token(http::header::CONNECTION, "upgrade")
}

/// Answers the handshake and hands the upgraded connection to `gateway`.
pub(crate) fn accept<B>(gateway: Arc<Gateway>, req: &mut hyper::Request<B>, sessions: &Sessions) -> Response {
    let Some(key) = req.headers().get(http::header::SEC_WEBSOCKET_KEY) else {
        return Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .text("missing sec-websocket-key");
    };
    let accept_key = derive_accept_key(key.as_bytes());
    let on_upgrade = hyper::upgrade::on(req);
    let stop = sessions.stop.clone();

    sessions.spawn(async move {
        match on_upgrade.await {
            Ok(upgraded) => {
                let ws = WebSocketStream::from_raw_socket(TokioIo::new(upgraded), Role::Server, None).await;
                gateway.serve(ws, stop).await;
            }
            Err(e) => warn!(error = %e, "websocket upgrade failed"),
        }
    });

    Response::builder()
        .status(StatusCode::SWITCHING_PROTOCOLS)
        .header("connection", "upgrade")
        .header("upgrade", "websocket")
        .header("sec-websocket-accept", &accept_key)
        .no_body()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn echo() -> Gateway {
        Gateway::new().on("echo", Some)
    }

    #[test]
    fn replies_under_the_same_event() {
        let reply = echo().handle_text(r#"{"event":"echo","data":{"a":1}}"#).unwrap();
        let reply: WsEvent = serde_json::from_str(&reply).unwrap();
        assert_eq!(reply, WsEvent { event: "echo".into(), data: json!({ "a": 1 }) });
    }

    #[test]
    fn unknown_and_malformed_frames_are_ignored() {
        let gateway = echo();
        assert!(gateway.handle_text(r#"{"event":"other","data":1}"#).is_none());
        assert!(gateway.handle_text("not json").is_none());
    }

    #[test]
    fn handlers_may_stay_silent() {
        let gateway = Gateway::new().on("quiet", |_| None);
        assert!(gateway.handle_text(r#"{"event":"quiet"}"#).is_none());
    }

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let gateway = Gateway::new();
        assert_eq!(gateway.broadcast("catEvent", json!("nobody")), 0);

        let mut a = gateway.clients.subscribe();
        let mut b = gateway.clients.subscribe();
        assert_eq!(gateway.broadcast("catEvent", json!({ "name": "Tom" })), 2);

        let expected = r#"{"event":"catEvent","data":{"name":"Tom"}}"#;
        assert_eq!(a.recv().await.unwrap(), expected);
        assert_eq!(b.recv().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn drain_waits_for_open_sessions() {
        let (stop_tx, stop_rx) = watch::channel(false);
        let sessions = Sessions::new(stop_rx);
        let mut stop = sessions.stop.clone();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        sessions.spawn(async move {
            let _ = stop.changed().await;
            let _ = done_tx.send(());
        });

        stop_tx.send(true).unwrap();
        sessions.drain().await;
        assert!(done_rx.await.is_ok());
    }

    #[test]
    fn upgrade_detection() {
        let req = hyper::Request::builder()
            .header("upgrade", "WebSocket")
            .header("connection", "keep-alive, Upgrade")
            .body(())
            .unwrap();
        assert!(is_upgrade_request(&req));

        let plain = hyper::Request::builder().body(()).unwrap();
        assert!(!is_upgrade_request(&plain));
    }
}
