//! Idle-timeout timer (boundary case): self-terminates the
//! process if no coordinator contact occurs within `idle_timeout`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::pool::TaskPool;

/// Shared last-contact clock, reset by every handler on a successful verb
/// read ("Every handler resets the idle timer on successful verb
/// read.").
#[derive(Default)]
pub struct IdleClock {
    last_contact: Mutex<Option<Instant>>,
}

impl IdleClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { last_contact: Mutex::new(Some(Instant::now())) })
    }

    pub fn touch(&self) {
        *self.last_contact.lock() = Some(Instant::now());
    }

    fn elapsed(&self) -> Duration {
        self.last_contact.lock().map(|t| t.elapsed()).unwrap_or(Duration::ZERO)
    }
}

/// Runs until the process exits. Exits 1 when idle beyond `idle_timeout`
/// with an empty, idle pool ("process exits 1 only if its pool is
/// empty and no workers are active; otherwise timer is reset and retry").
pub async fn run(clock: Arc<IdleClock>, pool: Arc<TaskPool>, idle_timeout: Duration) -> ! {
    let poll_interval = (idle_timeout / 4).clamp(Duration::from_millis(50), Duration::from_secs(1));
    loop {
        tokio::time::sleep(poll_interval).await;

        if clock.elapsed() < idle_timeout {
            continue;
        }

        if pool.in_flight() == 0 {
            warn!(?idle_timeout, "idle timeout elapsed with an empty pool, exiting");
            std::process::exit(1);
        }

        info!("idle timeout elapsed but pool is not empty, resetting timer");
        clock.touch();
    }
}
