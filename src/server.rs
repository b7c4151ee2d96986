//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown
//!
//! On **SIGTERM** or **Ctrl-C** (or whatever future is passed to
//! [`Server::serve_with_shutdown`]) the server:
//! 1. Immediately stops `listener.accept()`; no new connections are made.
//! 2. Asks every open connection to finish its in-flight request and close,
//!    idle keep-alive connections included.
//! 3. Sends every WebSocket session a close frame.
//! 4. Returns once all of them ended, so the caller can stop schedules and
//!    run teardown hooks.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::ws::{self, Sessions};

/// Largest request body read by default, in bytes.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

enum Listen {
    Addr(SocketAddr),
    Listener(TcpListener),
}

/// The HTTP server.
pub struct Server {
    listen: Listen,
    body_limit: usize,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust
    /// use catnip::Server;
    /// let server = Server::bind("0.0.0.0:3000").unwrap();
    /// assert!(Server::bind("not an address").is_err());
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let parsed = addr.parse().map_err(|source| Error::InvalidAddress {
            addr: addr.to_owned(),
            source,
        })?;
        Ok(Self::bind_addr(parsed))
    }

    pub fn bind_addr(addr: SocketAddr) -> Self {
        Self { listen: Listen::Addr(addr), body_limit: DEFAULT_BODY_LIMIT }
    }

    /// Serves on an already bound listener (e.g. port `0` in tests).
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { listen: Listen::Listener(listener), body_limit: DEFAULT_BODY_LIMIT }
    }

    /// Requests with a larger body get `413 Payload Too Large`.
    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Accepts connections until SIGTERM or Ctrl-C, then drains.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Accepts connections until `signal` resolves, then drains.
    ///
    /// Returns only after every connection and WebSocket session closed.
    pub async fn serve_with_shutdown<F>(self, router: Router, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()> + Send,
    {
        let Server { listen, body_limit } = self;
        let listener = match listen {
            Listen::Addr(addr) => TcpListener::bind(addr).await?,
            Listen::Listener(listener) => listener,
        };
        let addr = listener.local_addr()?;

        let (stop_tx, stop_rx) = watch::channel(false);

        // Shared by every connection task.
        let ctx = Arc::new(Context {
            router,
            sessions: Sessions::new(stop_rx.clone()),
            body_limit,
        });

        info!(%addr, "catnip listening");

        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting immediately,
                // even if more connections are queued.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    let _ = stop_tx.send(true);
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let ctx = Arc::clone(&ctx);
                    let mut stop = stop_rx.clone();
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let ctx = Arc::clone(&ctx);
                            async move { dispatch(ctx, req, remote_addr).await }
                        });

                        // HTTP/1.1 or HTTP/2, whatever the client negotiates;
                        // upgrades are kept enabled for WebSocket gateways.
                        let builder = ConnBuilder::new(TokioExecutor::new());
                        let conn = builder.serve_connection_with_upgrades(io, svc);
                        tokio::pin!(conn);

                        let mut closing = false;
                        loop {
                            tokio::select! {
                                res = conn.as_mut() => {
                                    if let Err(e) = res {
                                        error!(peer = %remote_addr, "connection error: {e}");
                                    }
                                    break;
                                }
                                _ = stop.changed(), if !closing => {
                                    debug!(peer = %remote_addr, "closing connection for shutdown");
                                    closing = true;
                                    conn.as_mut().graceful_shutdown();
                                }
                            }
                        }
                    });
                }

                // Reap finished connection tasks so the set does not grow
                // without bound.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}
        // Every upgrade was answered by now, so no session can start later.
        ctx.sessions.drain().await;

        info!("catnip stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

struct Context {
    router: Router,
    sessions: Sessions,
    body_limit: usize,
}

/// Converts one hyper request, routes it, converts the response back.
///
/// Infallible: every failure is a response.
async fn dispatch(
    ctx: Arc<Context>,
    mut req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_owned();

    if ws::is_upgrade_request(&req) {
        if let Some(gateway) = ctx.router.gateway_at(&path) {
            return Ok(ws::accept(gateway, &mut req, &ctx.sessions).into_hyper());
        }
    }

    let (parts, body) = req.into_parts();
    let body = match Limited::new(body, ctx.body_limit).collect().await {
        Ok(collected) => collected.to_bytes().to_vec(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            warn!(peer = %remote_addr, limit = ctx.body_limit, "request body too large");
            return Ok(Response::status(StatusCode::PAYLOAD_TOO_LARGE).into_hyper());
        }
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_hyper());
        }
    };
    let headers = parts.headers.iter()
        .filter_map(|(name, value)| {
            value.to_str().ok().map(|v| (name.as_str().to_owned(), v.to_owned()))
        })
        .collect();

    let request = Request::from_parts(parts.method, path, headers, body);
    Ok(ctx.router.dispatch(request).await.into_hyper())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or Ctrl-C the process receives.
///
/// If a handler cannot be installed, that signal source is treated as never
/// firing and a warning is logged.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => { signal.recv().await; }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
