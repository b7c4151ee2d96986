//! Time-based job triggers.
//!
//! | Trigger | Fires |
//! |---|---|
//! | [`Trigger::Cron`] | whenever UTC wall-clock time matches a 6-field cron expression |
//! | [`Trigger::Interval`] | every period, first time one period after start |
//! | [`Trigger::Timeout`] | once, after the delay |
//!
//! Jobs take nothing and return nothing. Every firing runs as its own task:
//! a slow job neither delays nor skips the next firing, and firings of the
//! same job may overlap. There is no retry. Triggers are fixed once
//! [`Scheduler::start`] runs; the only way to stop them is
//! [`SchedulerHandle::shutdown`].
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use catnip::schedule::{Scheduler, Trigger};
//!
//! # async fn run() -> Result<(), catnip::Error> {
//! let handle = Scheduler::new()
//!     .add("heartbeat", Trigger::Interval(Duration::from_secs(10)), || async {
//!         tracing::debug!("still here");
//!     })
//!     .add("on-the-45th", Trigger::cron("45 * * * * *")?, || async {})
//!     .start();
//! # handle.shutdown();
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at, sleep};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::handler::BoxFuture;

/// When a job fires.
#[derive(Clone, Debug)]
pub enum Trigger {
    Cron(cron::Schedule),
    Interval(Duration),
    Timeout(Duration),
}

impl Trigger {
    /// Parses a 6-field (`sec min hour day-of-month month day-of-week`) or
    /// 7-field (with year) cron expression.
    pub fn cron(expr: &str) -> Result<Self, Error> {
        cron::Schedule::from_str(expr)
            .map(Self::Cron)
            .map_err(|e| Error::Config(format!("invalid cron expression `{expr}`: {e}")))
    }
}

type Job = Arc<dyn Fn() -> BoxFuture<()> + Send + Sync>;

struct Entry {
    name: String,
    trigger: Trigger,
    job: Job,
}

/// A set of jobs and their triggers, not yet running.
#[derive(Default)]
pub struct Scheduler {
    entries: Vec<Entry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F, Fut>(mut self, name: &str, trigger: Trigger, job: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let job: Job = Arc::new(move || -> BoxFuture<()> { Box::pin(job()) });
        self.entries.push(Entry { name: name.to_owned(), trigger, job });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Arms every trigger. Must be called inside a tokio runtime.
    pub fn start(self) -> SchedulerHandle {
        let tasks = self.entries.into_iter()
            .map(|entry| {
                info!(job = %entry.name, trigger = ?entry.trigger, "scheduling job");
                tokio::spawn(run_trigger(entry))
            })
            .collect();
        SchedulerHandle { tasks }
    }
}

/// Running triggers.
pub struct SchedulerHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Disarms every trigger. Firings already in progress run to completion.
    pub fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        debug!(triggers = self.tasks.len(), "scheduler stopped");
    }
}

async fn run_trigger(entry: Entry) {
    let Entry { name, trigger, job } = entry;
    match trigger {
        Trigger::Timeout(delay) => {
            sleep(delay).await;
            fire(&name, &job);
        }
        Trigger::Interval(period) => {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                fire(&name, &job);
            }
        }
        Trigger::Cron(schedule) => {
            let mut after = Utc::now();
            loop {
                let Some((at, delay)) = next_fire(&schedule, after, Utc::now()) else {
                    warn!(job = %name, "cron schedule has no upcoming time, giving up");
                    return;
                };
                sleep(delay).await;
                fire(&name, &job);
                after = at;
            }
        }
    }
}

/// First match strictly after both the previous match and `now`, and how long
/// to wait for it.
///
/// The previous match keeps an early wake-up from firing the same instant
/// twice; `now` keeps a forward clock jump from replaying the matches it
/// skipped.
fn next_fire(
    schedule: &cron::Schedule,
    after: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<(DateTime<Utc>, Duration)> {
    let at = schedule.after(&after.max(now)).next()?;
    let delay = (at - now).to_std().unwrap_or(Duration::ZERO);
    Some((at, delay))
}

fn fire(name: &str, job: &Job) {
    debug!(job = name, "trigger fired");
    tokio::spawn(job());
}
