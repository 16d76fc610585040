// Author: Dustin Pilgrim
// License: MIT

use std::sync::Mutex;

use tokio::sync::Notify;
use tokio::time::{Duration, Instant};

use crate::core::timer::{TimerHandle, TimerService, WakeTime};

// Same horizon tokio uses for sleeps that would otherwise overflow.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Timer table driven by the daemon loop.
///
/// Time is seconds since the reactor was created. The reactor never runs
/// callbacks itself: the daemon asks for the earliest due timer, sleeps until
/// then, calls the owner and writes the returned wake time back.
#[derive(Debug)]
pub struct Reactor {
    start: Instant,
    timers: Mutex<Vec<WakeTime>>,
    changed: Notify,
}

impl Default for Reactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Reactor {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            timers: Mutex::new(Vec::new()),
            changed: Notify::new(),
        }
    }

    /// Earliest finite wake time across all timers.
    pub fn next_due(&self) -> Option<(TimerHandle, f64)> {
        let timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());

        timers
            .iter()
            .enumerate()
            .filter_map(|(i, w)| w.at().map(|t| (TimerHandle(i), t)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Tokio instant corresponding to a reactor timestamp. Timestamps too
    /// large for an `Instant` saturate to a far-future deadline.
    pub fn instant_at(&self, t: f64) -> Instant {
        Duration::try_from_secs_f64(t.max(0.0))
            .ok()
            .and_then(|d| self.start.checked_add(d))
            .unwrap_or_else(|| self.start + FAR_FUTURE)
    }

    /// Resolves after any timer was registered or moved.
    pub async fn changed(&self) {
        self.changed.notified().await;
    }
}

impl TimerService for Reactor {
    fn monotonic(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn register_timer(&self, waketime: WakeTime) -> TimerHandle {
        let handle = {
            let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
            timers.push(waketime);
            TimerHandle(timers.len() - 1)
        };
        self.changed.notify_one();
        handle
    }

    fn update_timer(&self, handle: TimerHandle, waketime: WakeTime) {
        {
            let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
            match timers.get_mut(handle.0) {
                Some(slot) => *slot = waketime,
                None => {
                    crate::qwarn!("Reactor", "update for unknown timer {:?}", handle);
                    return;
                }
            }
        }
        self.changed.notify_one();
    }
}
