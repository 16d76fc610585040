// Author: Dustin Pilgrim
// License: MIT

/// Snapshot of the motion queue at a given system time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusyStatus {
    /// Current position of the print clock.
    pub print_time: f64,
    /// Print time at which all planned motion is expected to have finished.
    pub busy_until: f64,
    /// True when no moves are waiting in the look-ahead queue.
    pub lookahead_empty: bool,
}

impl BusyStatus {
    /// Seconds of planned motion still ahead (negative once finished).
    pub fn busy_remaining(&self) -> f64 {
        self.busy_until - self.print_time
    }

    /// Seconds since the last planned motion finished (negative while busy).
    pub fn idle_time(&self) -> f64 {
        self.print_time - self.busy_until
    }
}

/// Read-only view of the motion planner.
pub trait MotionOracle: Send + Sync {
    fn check_busy(&self, now: f64) -> BusyStatus;

    /// Print time of the end of the last queued move.
    fn last_move_time(&self) -> f64;

    /// Non-blocking check: true while move data is being prepared.
    fn queue_lock_held(&self) -> bool;
}
