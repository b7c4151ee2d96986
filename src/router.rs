//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup. Each leaf holds an
//! endpoint: the handler plus the guards, interceptors, pipes and filters
//! registered for it. Router-wide layers are merged in at dispatch time, so
//! they may be registered before or after the routes.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;
use tracing::{debug, error};

use crate::docs::{self, ApiInfo};
use crate::exception::Failure;
use crate::filter::{ExceptionFilter, RequestHead};
use crate::guard::Guard;
use crate::handler::{BoxedHandler, Handler};
use crate::interceptor::Interceptor;
use crate::middleware::Middleware;
use crate::pipe::Pipe;
use crate::pipeline::{Chain, Layers, Next, PipeTarget, Route, RouteMeta};
use crate::request::Request;
use crate::response::{Json, Response};
use crate::ws::Gateway;

pub(crate) struct Endpoint {
    meta: Arc<RouteMeta>,
    layers: Layers,
    handler: BoxedHandler,
}

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Every builder method returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Arc<Endpoint>>>,
    table: Vec<Arc<RouteMeta>>,
    middleware: Vec<Arc<dyn Middleware>>,
    layers: Layers,
    gateways: HashMap<String, Arc<Gateway>>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            table: Vec::new(),
            middleware: Vec::new(),
            layers: Layers::default(),
            gateways: HashMap::new(),
        }
    }

    /// Register a bare handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.route(method, path, Route::new(handler))
    }

    /// Register a handler together with its policy.
    pub fn route(self, method: Method, path: &str, route: Route) -> Self {
        self.add(method, path.to_owned(), route, &Layers::default())
    }

    /// Register every route of a controller under its prefix.
    pub fn controller(mut self, controller: Controller) -> Self {
        for (method, path, route) in controller.routes {
            let full = join_path(&controller.prefix, &path);
            self = self.add(method, full, route, &controller.layers);
        }
        self
    }

    /// Middleware for every route. Runs before any guard.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Guard for every route.
    pub fn guard(mut self, guard: impl Guard) -> Self {
        self.layers.guards.push(Arc::new(guard));
        self
    }

    /// Interceptor for every route, outermost.
    pub fn interceptor(mut self, interceptor: impl Interceptor) -> Self {
        self.layers.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Body pipe for every route. Runs before the route's own pipes.
    pub fn pipe(mut self, pipe: impl Pipe) -> Self {
        self.layers.pipes.push((PipeTarget::Body, Arc::new(pipe)));
        self
    }

    /// Fallback exception filter for routes without one of their own.
    pub fn filter(mut self, filter: impl ExceptionFilter) -> Self {
        self.layers.filters.push(Arc::new(filter));
        self
    }

    /// Serve a WebSocket gateway at `path`. Only upgrade requests reach it.
    pub fn gateway(mut self, path: &str, gateway: Arc<Gateway>) -> Self {
        self.gateways.insert(path.to_owned(), gateway);
        self
    }

    /// Serve the generated API documentation at `path`.
    ///
    /// Lists the routes registered so far, so call it last.
    pub fn docs(self, path: &str, info: ApiInfo) -> Self {
        let document = docs::document(&info, &self.table);
        let path = path.to_owned();
        let mut router = self.on(Method::GET, &path, move |_req: Request| {
            let document = document.clone();
            async move { Json(document) }
        });
        router.table.retain(|meta| !(meta.method == Method::GET && meta.path == path));
        router
    }

    /// Every registered route, in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &RouteMeta> {
        self.table.iter().map(Arc::as_ref)
    }

    /// Routes one request through its pipeline and produces one response.
    ///
    /// Never fails: unknown routes are `404`, tagged failures go to the most
    /// specific exception filter (or the default rendering), untagged ones
    /// become `500`.
    pub async fn dispatch(&self, mut req: Request) -> Response {
        let Some((endpoint, params)) = self.lookup(&req.method, &req.path) else {
            debug!(method = %req.method, path = %req.path, "no route");
            return Response::status(StatusCode::NOT_FOUND);
        };
        req.params = params;
        req.route = Some(Arc::clone(&endpoint.meta));

        let head = RequestHead { method: req.method.clone(), path: req.path.clone() };
        let layers = self.layers.merged(&endpoint.layers);
        let chain = Chain::new(&self.middleware, &layers, &endpoint.handler);

        match Next::start(chain).run(req).await {
            Ok(response) => response,
            Err(Failure::Http(exception)) => match layers.filters.last() {
                Some(filter) => filter.catch(exception, &head),
                None => exception.into_default_response(),
            },
            Err(failure) => {
                error!(method = %head.method, path = %head.path, error = %failure, "unhandled failure");
                failure.into_default_response()
            }
        }
    }

    pub(crate) fn gateway_at(&self, path: &str) -> Option<Arc<Gateway>> {
        self.gateways.get(path).cloned()
    }

    fn add(mut self, method: Method, path: String, route: Route, outer: &Layers) -> Self {
        let meta = Arc::new(RouteMeta {
            method: method.clone(),
            path: path.clone(),
            summary: route.summary,
            roles: route.roles,
        });
        let endpoint = Endpoint {
            meta: Arc::clone(&meta),
            layers: outer.merged(&route.layers),
            handler: route.handler,
        };
        self.routes
            .entry(method)
            .or_default()
            .insert(path.as_str(), Arc::new(endpoint))
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self.table.push(meta);
        self
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(Arc<Endpoint>, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let endpoint = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((endpoint, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

/// A group of routes sharing a path prefix and policy.
///
/// Controller guards run before route guards, controller interceptors wrap
/// route interceptors.
///
/// ```rust
/// use catnip::{Controller, Method, Request, Route, Router};
/// use catnip::guard::RolesGuard;
///
/// async fn list(_req: Request) -> &'static str { "[]" }
/// async fn create(_req: Request) -> &'static str { "created" }
///
/// let cats = Controller::new("/cats")
///     .guard(RolesGuard::from_route())
///     .route(Method::GET, "", Route::new(list))
///     .route(Method::POST, "", Route::new(create).roles(["admin"]));
///
/// let router = Router::new().controller(cats);
/// assert_eq!(router.routes().count(), 2);
/// ```
pub struct Controller {
    prefix: String,
    layers: Layers,
    routes: Vec<(Method, String, Route)>,
}

impl Controller {
    pub fn new(prefix: &str) -> Self {
        Self { prefix: prefix.to_owned(), layers: Layers::default(), routes: Vec::new() }
    }

    pub fn guard(mut self, guard: impl Guard) -> Self {
        self.layers.guards.push(Arc::new(guard));
        self
    }

    pub fn interceptor(mut self, interceptor: impl Interceptor) -> Self {
        self.layers.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn filter(mut self, filter: impl ExceptionFilter) -> Self {
        self.layers.filters.push(Arc::new(filter));
        self
    }

    /// Register a route relative to the controller prefix (`""` is the prefix itself).
    pub fn route(mut self, method: Method, path: &str, route: Route) -> Self {
        self.routes.push((method, path.to_owned(), route));
        self
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, true) => "/".to_owned(),
        (_, true) => prefix.to_owned(),
        (true, false) => format!("/{path}"),
        (false, false) => format!("{prefix}/{path}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::HttpException;
    use crate::filter::HttpExceptionFilter;

    #[test]
    fn join_path_normalizes_slashes() {
        assert_eq!(join_path("/cats", ""), "/cats");
        assert_eq!(join_path("/cats/", "/{id}"), "/cats/{id}");
        assert_eq!(join_path("/cats", "validation-pipe"), "/cats/validation-pipe");
        assert_eq!(join_path("", ""), "/");
        assert_eq!(join_path("/", "healthz"), "/healthz");
    }

    #[tokio::test]
    async fn unknown_route_is_bare_404() {
        let router = Router::new().filter(HttpExceptionFilter);
        let response = router.dispatch(Request::new(Method::GET, "/nope")).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn path_params_reach_the_handler() {
        let router = Router::new().on(Method::GET, "/cats/{id}", |req: Request| async move {
            format!("cat {}", req.param("id").unwrap_or("?"))
        });
        let response = router.dispatch(Request::new(Method::GET, "/cats/7")).await;
        assert_eq!(response.body(), b"cat 7");
    }

    #[tokio::test]
    async fn route_filter_beats_router_filter() {
        struct Teapot;
        impl ExceptionFilter for Teapot {
            fn catch(&self, _: HttpException, _: &RequestHead) -> Response {
                Response::status(StatusCode::IM_A_TEAPOT)
            }
        }

        let failing = |_req: Request| async { Err::<String, _>(HttpException::bad_request("bad")) };
        let router = Router::new()
            .filter(HttpExceptionFilter)
            .route(Method::GET, "/a", Route::new(failing).filter(Teapot))
            .on(Method::GET, "/b", failing);

        let a = router.dispatch(Request::new(Method::GET, "/a")).await;
        assert_eq!(a.status_code(), StatusCode::IM_A_TEAPOT);
        let b = router.dispatch(Request::new(Method::GET, "/b")).await;
        assert_eq!(b.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(b.header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn untagged_failures_skip_filters() {
        let router = Router::new()
            .filter(HttpExceptionFilter)
            .on(Method::GET, "/boom", |_req: Request| async { Failure::unhandled("disk on fire") });
        let response = router.dispatch(Request::new(Method::GET, "/boom")).await;
        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body(), b"Internal Server Error");
    }

    #[tokio::test]
    async fn docs_route_lists_routes_but_not_itself() {
        let router = Router::new()
            .route(Method::GET, "/cats", Route::new(|_req: Request| async { "[]" }).summary("List cats"))
            .docs("/api", ApiInfo::new("Cats", "Cats API", "1.0"));
        assert_eq!(router.routes().count(), 1);

        let response = router.dispatch(Request::new(Method::GET, "/api")).await;
        let doc: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(doc["paths"]["/cats"]["get"]["summary"], "List cats");
        assert!(doc["paths"].get("/api").is_none());
    }
}
