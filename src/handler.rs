//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router holds handlers of *different* types in a single radix tree per
//! method, so each one is hidden behind the `dyn ErasedHandler` interface:
//!
//! ```text
//! async fn list(req: Request) -> Json<Vec<Cat>> { … }   ← user writes this
//!        ↓ Route::new(list)
//! list.into_boxed_handler()                           ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(list))                           ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(req)  after the last pipeline stage    ← one vtable dispatch
//!        ↓
//! Box::pin(async { list(req).await.into_outcome() })  ← BoxFuture<Outcome>
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::exception::Outcome;
use crate::request::Request;
use crate::response::IntoOutcome;

/// A heap-allocated, type-erased future.
///
/// `Send + 'static` let tokio move the future across worker threads. Also the
/// return type of [`Middleware`](crate::Middleware) and
/// [`Interceptor`](crate::Interceptor) implementations.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` because it appears in the return type of the public
/// `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture<Outcome>;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// Automatically satisfied for any function or closure with the shape:
///
/// ```text
/// Fn(Request) -> impl Future<Output = impl IntoOutcome>
/// ```
///
/// Closures are how handlers reach shared services:
///
/// ```rust
/// use std::sync::Arc;
/// use catnip::{Method, Request, Route, Router};
///
/// let greeting = Arc::new(String::from("meow"));
/// let router = Router::new().route(Method::GET, "/greet", Route::new(move |_req: Request| {
///     let greeting = Arc::clone(&greeting);
///     async move { greeting.to_string() }
/// }));
/// ```
///
/// The trait is sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Bridges a concrete handler `F` to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<Outcome> {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_outcome() })
    }
}
