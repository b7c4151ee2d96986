//! Middleware layer.
//!
//! Middleware runs first, before any guard, and is the right place for
//! cross-cutting concerns that do not depend on the route's policy: request
//! logging, request-id injection, header inspection. It is registered on the
//! [`Router`](crate::Router) and applies to every route.

mod logger;

pub use logger::RequestLogger;

use crate::exception::Outcome;
use crate::handler::BoxFuture;
use crate::pipeline::Next;
use crate::request::Request;

pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, req: Request, next: Next) -> BoxFuture<Outcome>;
}
