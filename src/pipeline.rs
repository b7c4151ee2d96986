//! Route definitions and the per-request pipeline.
//!
//! A [`Route`] is a handler plus the policy attached to it: guards, pipes,
//! interceptors, filters, and descriptive metadata. Nothing is discovered by
//! reflection; whatever the route needs is passed to [`Route`] explicitly.
//!
//! # Order
//!
//! For one request the stages always run in this order, regardless of the
//! order the builder methods were called in:
//!
//! ```text
//! middleware ─▶ guards ─▶ interceptors (before) ─▶ pipes ─▶ handler
//!                                                              │
//!  filters ◀── interceptors (after, reverse order) ◀───────────┘
//! ```
//!
//! Within one category, registration order is kept: router-wide stages first,
//! then controller stages, then route stages.

use std::sync::Arc;

use http::Method;
use tracing::debug;

use crate::exception::{Failure, HttpException, Outcome};
use crate::filter::ExceptionFilter;
use crate::guard::Guard;
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::interceptor::Interceptor;
use crate::middleware::Middleware;
use crate::pipe::Pipe;
use crate::request::Request;

/// Descriptive metadata of a registered route.
///
/// Available to guards through [`Request::route`] and listed by the
/// generated API documentation.
#[derive(Clone, Debug)]
pub struct RouteMeta {
    pub method: Method,
    pub path: String,
    pub summary: Option<String>,
    pub roles: Vec<String>,
}

/// What a pipe operates on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipeTarget {
    /// The JSON request body.
    Body,
    /// A named path parameter.
    Param(String),
}

/// Guards, interceptors, pipes and filters of one scope (router, controller
/// or route).
#[derive(Clone, Default)]
pub(crate) struct Layers {
    pub(crate) guards: Vec<Arc<dyn Guard>>,
    pub(crate) interceptors: Vec<Arc<dyn Interceptor>>,
    pub(crate) pipes: Vec<(PipeTarget, Arc<dyn Pipe>)>,
    pub(crate) filters: Vec<Arc<dyn ExceptionFilter>>,
}

impl Layers {
    /// Outer scope's layers first, then `inner`'s.
    pub(crate) fn merged(&self, inner: &Layers) -> Layers {
        Layers {
            guards: self.guards.iter().chain(&inner.guards).cloned().collect(),
            interceptors: self.interceptors.iter().chain(&inner.interceptors).cloned().collect(),
            pipes: self.pipes.iter().chain(&inner.pipes).cloned().collect(),
            filters: self.filters.iter().chain(&inner.filters).cloned().collect(),
        }
    }
}

/// A handler with its policy.
///
/// ```rust
/// use catnip::{Method, Request, Route, Router};
/// use catnip::guard::RolesGuard;
/// use catnip::pipe::ValidationPipe;
///
/// async fn create(_req: Request) -> &'static str { "created" }
///
/// let router = Router::new().route(
///     Method::POST,
///     "/cats",
///     Route::new(create)
///         .summary("Create cat")
///         .roles(["admin"])
///         .guard(RolesGuard::from_route())
///         .pipe(ValidationPipe),
/// );
/// ```
pub struct Route {
    pub(crate) handler: BoxedHandler,
    pub(crate) layers: Layers,
    pub(crate) summary: Option<String>,
    pub(crate) roles: Vec<String>,
}

impl Route {
    pub fn new(handler: impl Handler) -> Self {
        Self {
            handler: handler.into_boxed_handler(),
            layers: Layers::default(),
            summary: None,
            roles: Vec::new(),
        }
    }

    /// One-line description shown in the generated API documentation.
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Roles this route requires. Read by [`RolesGuard::from_route`](crate::guard::RolesGuard::from_route).
    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn guard(mut self, guard: impl Guard) -> Self {
        self.layers.guards.push(Arc::new(guard));
        self
    }

    pub fn interceptor(mut self, interceptor: impl Interceptor) -> Self {
        self.layers.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Adds a pipe over the JSON body.
    pub fn pipe(mut self, pipe: impl Pipe) -> Self {
        self.layers.pipes.push((PipeTarget::Body, Arc::new(pipe)));
        self
    }

    /// Adds a pipe over one path parameter.
    pub fn param_pipe(mut self, name: &str, pipe: impl Pipe) -> Self {
        self.layers.pipes.push((PipeTarget::Param(name.to_owned()), Arc::new(pipe)));
        self
    }

    pub fn filter(mut self, filter: impl ExceptionFilter) -> Self {
        self.layers.filters.push(Arc::new(filter));
        self
    }
}

// ── Execution ─────────────────────────────────────────────────────────────────

pub(crate) enum Stage {
    Middleware(Arc<dyn Middleware>),
    Guard(Arc<dyn Guard>),
    Interceptor(Arc<dyn Interceptor>),
    Pipe(PipeTarget, Arc<dyn Pipe>),
}

/// The flattened stages of one request, built by the router at dispatch time.
pub(crate) struct Chain {
    stages: Vec<Stage>,
    handler: BoxedHandler,
}

impl Chain {
    pub(crate) fn new(
        middleware: &[Arc<dyn Middleware>],
        layers: &Layers,
        handler: &BoxedHandler,
    ) -> Self {
        let stages = middleware.iter().cloned().map(Stage::Middleware)
            .chain(layers.guards.iter().cloned().map(Stage::Guard))
            .chain(layers.interceptors.iter().cloned().map(Stage::Interceptor))
            .chain(layers.pipes.iter().cloned().map(|(target, pipe)| Stage::Pipe(target, pipe)))
            .collect();
        Self { stages, handler: Arc::clone(handler) }
    }
}

/// The rest of the pipeline, handed to middleware and interceptors.
///
/// Call [`Next::run`] exactly once to continue, or return without calling it
/// to short-circuit.
pub struct Next {
    chain: Arc<Chain>,
    index: usize,
}

impl Next {
    pub(crate) fn start(chain: Chain) -> Self {
        Self { chain: Arc::new(chain), index: 0 }
    }

    /// Runs every remaining stage and the handler.
    pub fn run(self, mut req: Request) -> BoxFuture<Outcome> {
        let Next { chain, mut index } = self;
        loop {
            let Some(stage) = chain.stages.get(index) else {
                return chain.handler.call(req);
            };
            index += 1;
            match stage {
                Stage::Middleware(middleware) => {
                    let middleware = Arc::clone(middleware);
                    return middleware.handle(req, Next { chain, index });
                }
                Stage::Interceptor(interceptor) => {
                    let interceptor = Arc::clone(interceptor);
                    return interceptor.intercept(req, Next { chain, index });
                }
                Stage::Guard(guard) => {
                    if !guard.can_activate(&req) {
                        debug!(method = %req.method, path = %req.path, "guard rejected request");
                        return rejected(HttpException::forbidden("Forbidden resource"));
                    }
                }
                Stage::Pipe(target, pipe) => {
                    if let Err(e) = apply_pipe(&mut req, target, pipe.as_ref()) {
                        debug!(method = %req.method, path = %req.path, reason = %e.message(), "pipe rejected request");
                        return rejected(e);
                    }
                }
            }
        }
    }
}

fn rejected(e: HttpException) -> BoxFuture<Outcome> {
    Box::pin(std::future::ready(Err(Failure::Http(e))))
}

fn apply_pipe(req: &mut Request, target: &PipeTarget, pipe: &dyn Pipe) -> Result<(), HttpException> {
    match target {
        PipeTarget::Body => {
            let value = match req.body_value.take() {
                Some(value) => value,
                None => req.body_json()?,
            };
            req.body_value = Some(pipe.transform(value)?);
        }
        PipeTarget::Param(name) => {
            let value = match req.param_values.remove(name) {
                Some(value) => value,
                None => serde_json::Value::String(req.param(name).unwrap_or_default().to_owned()),
            };
            req.param_values.insert(name.clone(), pipe.transform(value)?);
        }
    }
    Ok(())
}
