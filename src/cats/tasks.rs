use std::time::Duration;

use tracing::debug;

use crate::error::Error;
use crate::schedule::{Scheduler, Trigger};

pub const CRON_EXPR: &str = "45 * * * * *";
pub const INTERVAL: Duration = Duration::from_secs(10);
pub const TIMEOUT: Duration = Duration::from_secs(5);

/// The demo's three background jobs.
pub fn scheduler() -> Result<Scheduler, Error> {
    Ok(Scheduler::new()
        .add("second-45", Trigger::cron(CRON_EXPR)?, || async {
            debug!("Called when the current second is 45");
        })
        .add("every-10-seconds", Trigger::Interval(INTERVAL), || async {
            debug!("Called every 10 seconds");
        })
        .add("once-after-5-seconds", Trigger::Timeout(TIMEOUT), || async {
            debug!("Called once after 5 seconds");
        }))
}
