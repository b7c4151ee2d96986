use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use catnip::filter::HttpExceptionFilter;
use catnip::interceptor::LoggingInterceptor;
use catnip::middleware::RequestLogger;
use catnip::pipe::Pipe;
use catnip::{HttpException, Method, Request, Route, Router, StatusCode};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Collects the message of every event emitted while installed.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<String>>>);

impl Capture {
    fn messages(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    fn position(&self, prefix: &str) -> usize {
        self.messages()
            .iter()
            .position(|m| m.starts_with(prefix))
            .unwrap_or_else(|| panic!("no `{prefix}` in {:?}", self.messages()))
    }
}

struct MessageVisitor(Option<String>);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S: Subscriber> Layer<S> for Capture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(None);
        event.record(&mut visitor);
        if let Some(message) = visitor.0 {
            self.0.lock().push(message);
        }
    }
}

struct LoggedPipe;

impl Pipe for LoggedPipe {
    fn transform(&self, value: Value) -> Result<Value, HttpException> {
        tracing::info!("pipe");
        Ok(value)
    }
}

fn router(allow: bool) -> Router {
    Router::new()
        .middleware(RequestLogger)
        .filter(HttpExceptionFilter)
        .route(
            Method::POST,
            "/cats",
            Route::new(|_req: Request| async {
                tracing::info!("handler started");
                tokio::time::sleep(Duration::from_millis(5)).await;
                tracing::info!("handler finished");
                "done"
            })
            // Registered before the guard on purpose: the order is fixed.
            .pipe(LoggedPipe)
            .interceptor(LoggingInterceptor)
            .guard(move |_req: &Request| {
                tracing::info!("guard");
                allow
            }),
        )
}

#[tokio::test]
async fn stages_run_in_fixed_order() {
    let capture = Capture::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.clone()));

    let response = router(true)
        .dispatch(Request::new(Method::POST, "/cats").with_body(b"{}".to_vec()))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.body(), b"done");

    let order = [
        capture.position("Request..."),
        capture.position("guard"),
        capture.position("Before..."),
        capture.position("pipe"),
        capture.position("handler started"),
        capture.position("handler finished"),
        capture.position("After..."),
    ];
    assert!(order.windows(2).all(|w| w[0] < w[1]), "{:?}", capture.messages());
}

#[tokio::test]
async fn rejected_guard_skips_the_rest() {
    let capture = Capture::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.clone()));

    let response = router(false)
        .dispatch(Request::new(Method::POST, "/cats").with_body(b"{}".to_vec()))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let messages = capture.messages();
    assert!(messages.iter().any(|m| m == "Request..."));
    for skipped in ["Before...", "pipe", "handler started", "After..."] {
        assert!(!messages.iter().any(|m| m.starts_with(skipped)), "{skipped} ran: {messages:?}");
    }
}
