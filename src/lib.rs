//! # catnip
//!
//! A small HTTP framework where every cross-cutting concern is an explicit
//! value attached to a route: middleware, guards, pipes, interceptors and
//! exception filters. No container, no reflection, no annotations. Plus the
//! pieces a service usually grows next to its routes: scheduled jobs,
//! WebSocket gateways, lifecycle hooks and generated API docs.
//!
//! The [`cats`] module is a complete demo service built on it.
//!
//! ## The pipeline
//!
//! ```text
//! middleware ─▶ guards ─▶ interceptors ─▶ pipes ─▶ handler
//!                 403          ↕           400        │
//! exception filter ◀──────────────────────────────────┘
//! ```
//!
//! The order is fixed; see [`pipeline`] for the details.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use catnip::{Controller, HttpException, Json, Method, Request, Route, Router, Server};
//! use catnip::filter::HttpExceptionFilter;
//! use catnip::guard::RolesGuard;
//! use catnip::middleware::RequestLogger;
//! use catnip::pipe::ValidationPipe;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), catnip::Error> {
//!     let users = Controller::new("/users")
//!         .guard(RolesGuard::from_route())
//!         .route(Method::GET, "/{id}", Route::new(get_user))
//!         .route(Method::POST, "", Route::new(create_user).roles(["admin"]).pipe(ValidationPipe));
//!
//!     let app = Router::new()
//!         .middleware(RequestLogger)
//!         .filter(HttpExceptionFilter)
//!         .controller(users);
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! async fn get_user(req: Request) -> String {
//!     format!("user {}", req.param("id").unwrap_or("unknown"))
//! }
//!
//! async fn create_user(req: Request) -> Result<Json<serde_json::Value>, HttpException> {
//!     // Already checked by ValidationPipe: an object with a string `name`.
//!     Ok(Json(req.json()?))
//! }
//! ```

mod error;
mod exception;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod app;
pub mod cats;
pub mod config;
pub mod docs;
pub mod filter;
pub mod guard;
pub mod health;
pub mod interceptor;
pub mod middleware;
pub mod pipe;
pub mod pipeline;
pub mod schedule;
pub mod ws;

pub use app::{App, Lifecycle};
pub use error::Error;
pub use exception::{Failure, HttpException, Outcome};
pub use handler::{BoxFuture, Handler};
pub use http::{Method, StatusCode};
pub use middleware::Middleware;
pub use interceptor::Interceptor;
pub use pipeline::{Next, Route};
pub use request::{Caller, ROLES_HEADER, Request};
pub use response::{ContentType, IntoOutcome, IntoResponse, Json, Response, ResponseBuilder};
pub use router::{Controller, Router};
pub use server::{DEFAULT_BODY_LIMIT, Server, shutdown_signal};
