//! The cats demo service.
//!
//! An append-only in-memory list of cats behind the full pipeline: request
//! logging, a role guard, body validation, a timing interceptor and a JSON
//! exception filter. Next to it run a WebSocket gateway, three scheduled jobs
//! and the generated API documentation.

mod controller;
mod dto;
mod gateway;
mod service;
pub mod tasks;

pub use controller::controller;
pub use dto::{Cat, CreateCatDto};
pub use gateway::{CAT_EVENT, CatsGateway, MESSAGE_EVENT};
pub use service::CatsService;

use std::sync::Arc;

use http::Method;

use crate::app::App;
use crate::config::Config;
use crate::docs::ApiInfo;
use crate::error::Error;
use crate::filter::HttpExceptionFilter;
use crate::health;
use crate::middleware::RequestLogger;
use crate::router::Router;

/// Every HTTP and WebSocket route of the demo.
pub fn router(service: Arc<CatsService>, gateway: &CatsGateway, config: &Config) -> Router {
    Router::new()
        .middleware(RequestLogger)
        .filter(HttpExceptionFilter)
        .controller(controller(service))
        .on(Method::GET, "/healthz", health::liveness)
        .on(Method::GET, "/readyz", health::readiness)
        .gateway(&config.ws_path, gateway.gateway())
        .docs(
            &config.docs_path,
            ApiInfo::new("Cats example", "The cats API description", "1.0"),
        )
}

/// The demo application: routes, jobs and lifecycle hooks.
pub fn app(config: &Config) -> Result<App, Error> {
    let service = Arc::new(CatsService::new());
    let gateway = CatsGateway::new();
    let router = router(Arc::clone(&service), &gateway, config);

    Ok(App::new(router)
        .scheduler(tasks::scheduler()?)
        .hook(service))
}
