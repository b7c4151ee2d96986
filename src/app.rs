//! Composition root: router, schedules and lifecycle hooks run together.
//!
//! ```text
//! on_init hooks ─▶ scheduler armed ─▶ server accepts … signal … drained
//!                                      ─▶ scheduler disarmed ─▶ on_destroy hooks
//! ```

use std::future::Future;
use std::sync::Arc;

use tracing::info;

use crate::error::Error;
use crate::router::Router;
use crate::schedule::Scheduler;
use crate::server::{Server, shutdown_signal};

/// Startup and teardown callbacks.
///
/// Both default to doing nothing. Hooks run in registration order on init
/// and in reverse order on destroy.
pub trait Lifecycle: Send + Sync + 'static {
    fn on_init(&self) {}
    fn on_destroy(&self) {}
}

pub struct App {
    router: Router,
    scheduler: Scheduler,
    hooks: Vec<Arc<dyn Lifecycle>>,
}

impl App {
    pub fn new(router: Router) -> Self {
        Self { router, scheduler: Scheduler::new(), hooks: Vec::new() }
    }

    pub fn scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn hook(mut self, hook: Arc<dyn Lifecycle>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Runs until SIGTERM or Ctrl-C.
    pub async fn run(self, server: Server) -> Result<(), Error> {
        self.run_with_shutdown(server, shutdown_signal()).await
    }

    /// Runs until `signal` resolves and in-flight requests drained.
    pub async fn run_with_shutdown<F>(self, server: Server, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()> + Send,
    {
        let Self { router, scheduler, hooks } = self;

        for hook in &hooks {
            hook.on_init();
        }
        let jobs = scheduler.start();
        info!(hooks = hooks.len(), "application started");

        let result = server.serve_with_shutdown(router, signal).await;

        jobs.shutdown();
        for hook in hooks.iter().rev() {
            hook.on_destroy();
        }
        info!("application stopped");
        result
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use tokio::net::TcpListener;

    use super::*;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Lifecycle for Recorder {
        fn on_init(&self) {
            self.log.lock().push(format!("init {}", self.name));
        }
        fn on_destroy(&self) {
            self.log.lock().push(format!("destroy {}", self.name));
        }
    }

    #[tokio::test]
    async fn hooks_wrap_the_server_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        App::new(Router::new())
            .hook(Arc::new(Recorder { name: "a", log: Arc::clone(&log) }))
            .hook(Arc::new(Recorder { name: "b", log: Arc::clone(&log) }))
            .run_with_shutdown(Server::from_listener(listener), async {})
            .await
            .unwrap();

        assert_eq!(*log.lock(), ["init a", "init b", "destroy b", "destroy a"]);
    }
}
