/// Fixed-period scheduling with cooperative shutdown.
///
/// Two states: Running, and Stopped once the shutdown flag is observed.
/// The flag is set from a signal handler and checked only between cycles
/// and while idle-waiting for the next tick — an interrupt during a
/// blocking read lets that read complete, so hardware is never abandoned
/// mid-transaction.
///
/// The schedule is drift-tolerant without catch-up: each tick is computed
/// from the previous tick's nominal time, and when a cycle overruns its
/// period the missed ticks are skipped and the schedule re-anchors to now
/// instead of queueing a burst of back-to-back cycles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::info;

/// How often the idle wait re-checks the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

pub struct Scheduler {
    period: Duration,
    shutdown: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(period: Duration, shutdown: Arc<AtomicBool>) -> Self {
        Self { period, shutdown }
    }

    /// Runs `tick` once per period until shutdown is requested. The first
    /// tick fires one full period after the call, matching the original
    /// deployment's warm-up pause before the first reading.
    pub fn run<F: FnMut()>(&self, mut tick: F) {
        let mut next_tick = Instant::now() + self.period;
        loop {
            while Instant::now() < next_tick {
                if self.stopped() {
                    return;
                }
                let remaining = next_tick.saturating_duration_since(Instant::now());
                thread::sleep(remaining.min(SHUTDOWN_POLL));
            }
            if self.stopped() {
                return;
            }

            tick();

            next_tick += self.period;
            let now = Instant::now();
            if next_tick < now {
                // Overrun: skip missed ticks rather than bursting.
                next_tick = now;
            }
        }
    }

    fn stopped(&self) -> bool {
        if self.shutdown.load(Ordering::SeqCst) {
            info!("shutdown requested, stopping scheduler");
            return true;
        }
        false
    }
}
