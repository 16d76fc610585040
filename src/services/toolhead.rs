// Author: Dustin Pilgrim
// License: MIT

use std::sync::Mutex;

use crate::core::oracle::{BusyStatus, MotionOracle};

pub const DEFAULT_LOOKAHEAD_FLUSH: f64 = 0.25;

/// Print-session start as reported by the motion planner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionStart {
    pub current_time: f64,
    pub print_time: f64,
    pub busy_until: f64,
}

#[derive(Debug, Default)]
struct Planner {
    // Durations of moves still in the look-ahead queue.
    lookahead: Vec<f64>,
    flush_at: Option<f64>,
    busy_until: f64,
    last_move_time: f64,
}

impl Planner {
    fn flush_due(&mut self, now: f64) {
        let Some(flush_at) = self.flush_at else { return };
        if flush_at > now {
            return;
        }

        let mut end = self.busy_until.max(flush_at);
        for d in self.lookahead.drain(..) {
            end += d;
        }

        self.busy_until = end;
        self.last_move_time = end;
        self.flush_at = None;
    }
}

/// Stand-in motion planner: moves are plain durations. The print clock is
/// the reactor's monotonic clock.
#[derive(Debug)]
pub struct SimulatedToolhead {
    planner: Mutex<Planner>,
    lookahead_flush: f64,
}

impl SimulatedToolhead {
    pub fn new(lookahead_flush: f64) -> Self {
        Self {
            planner: Mutex::new(Planner::default()),
            lookahead_flush: lookahead_flush.max(0.0),
        }
    }

    /// Queue a move lasting `seconds`. Returns the session start when the
    /// planner was fully drained before this move.
    pub fn queue_move(&self, now: f64, seconds: f64) -> Option<SessionStart> {
        let mut p = self.planner.lock().unwrap_or_else(|e| e.into_inner());
        p.flush_due(now);

        let was_idle = p.lookahead.is_empty() && p.busy_until <= now;

        p.lookahead.push(seconds.max(0.0));
        if p.flush_at.is_none() {
            p.flush_at = Some(now + self.lookahead_flush);
        }

        if !was_idle {
            return None;
        }

        let queued: f64 = p.lookahead.iter().sum();
        Some(SessionStart {
            current_time: now,
            print_time: now,
            busy_until: now + self.lookahead_flush + queued,
        })
    }

    /// Emergency stop: drop everything queued.
    pub fn halt(&self, now: f64) {
        let mut p = self.planner.lock().unwrap_or_else(|e| e.into_inner());
        p.lookahead.clear();
        p.flush_at = None;
        p.busy_until = p.busy_until.min(now);
    }
}

impl Default for SimulatedToolhead {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKAHEAD_FLUSH)
    }
}

impl MotionOracle for SimulatedToolhead {
    fn check_busy(&self, now: f64) -> BusyStatus {
        let mut p = self.planner.lock().unwrap_or_else(|e| e.into_inner());
        p.flush_due(now);

        BusyStatus {
            print_time: now,
            busy_until: p.busy_until,
            lookahead_empty: p.lookahead.is_empty(),
        }
    }

    fn last_move_time(&self) -> f64 {
        let p = self.planner.lock().unwrap_or_else(|e| e.into_inner());
        p.last_move_time
    }

    fn queue_lock_held(&self) -> bool {
        self.planner.try_lock().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_move_after_drain_starts_session() {
        let th = SimulatedToolhead::new(0.25);

        let s = th.queue_move(10.0, 5.0).expect("session start");
        assert_eq!(s.current_time, 10.0);
        assert_eq!(s.busy_until, 15.25);

        // still queued: no new session
        assert_eq!(th.queue_move(10.1, 1.0), None);
    }

    #[test]
    fn lookahead_flushes_into_busy_horizon() {
        let th = SimulatedToolhead::new(0.25);
        th.queue_move(0.0, 2.0);
        th.queue_move(0.1, 3.0);

        let before = th.check_busy(0.2);
        assert!(!before.lookahead_empty);

        let after = th.check_busy(0.25);
        assert!(after.lookahead_empty);
        assert_eq!(after.busy_until, 5.25);
        assert_eq!(th.last_move_time(), 5.25);
        assert!(after.busy_remaining() > 0.0);

        let done = th.check_busy(6.0);
        assert!(done.busy_remaining() < 0.0);
        assert_eq!(done.idle_time(), 0.75);
    }

    #[test]
    fn move_after_motion_finished_is_new_session() {
        let th = SimulatedToolhead::new(0.0);
        th.queue_move(0.0, 1.0);
        assert!(th.check_busy(0.5).busy_remaining() > 0.0);

        assert!(th.queue_move(0.5, 1.0).is_none());
        assert!(th.queue_move(3.0, 1.0).is_some());
    }

    #[test]
    fn halt_drops_pending_motion() {
        let th = SimulatedToolhead::new(0.25);
        th.queue_move(0.0, 100.0);
        th.check_busy(1.0);

        th.halt(2.0);

        let st = th.check_busy(2.0);
        assert!(st.lookahead_empty);
        assert_eq!(st.busy_until, 2.0);
        assert!(!th.queue_lock_held());
    }
}
