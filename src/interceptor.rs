//! Interceptors wrap the handler: code before [`Next::run`] runs after the
//! guards passed, code after it sees the handler's outcome.

use std::time::Instant;

use tracing::info;

use crate::exception::Outcome;
use crate::handler::BoxFuture;
use crate::pipeline::Next;
use crate::request::Request;

pub trait Interceptor: Send + Sync + 'static {
    fn intercept(&self, req: Request, next: Next) -> BoxFuture<Outcome>;
}

/// Logs `Before...` before the handler and `After... Nms` once its outcome
/// resolved. The outcome passes through untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingInterceptor;

impl Interceptor for LoggingInterceptor {
    fn intercept(&self, req: Request, next: Next) -> BoxFuture<Outcome> {
        Box::pin(async move {
            info!("Before...");
            let started = Instant::now();
            let outcome = next.run(req).await;
            info!("After... {}ms", started.elapsed().as_millis());
            outcome
        })
    }
}
