use tracing::info;

use super::Middleware;
use crate::exception::Outcome;
use crate::handler::BoxFuture;
use crate::pipeline::Next;
use crate::request::Request;

/// Logs method and path of every request before it proceeds.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestLogger;

impl Middleware for RequestLogger {
    fn handle(&self, req: Request, next: Next) -> BoxFuture<Outcome> {
        info!(method = %req.method(), path = %req.path(), "Request...");
        next.run(req)
    }
}
