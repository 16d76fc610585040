// Author: Dustin Pilgrim
// License: MIT

/// When a timer callback wants to run next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WakeTime {
    /// Monotonic timestamp in seconds.
    At(f64),
    Never,
}

impl WakeTime {
    pub fn at(&self) -> Option<f64> {
        match self {
            WakeTime::At(t) => Some(*t),
            WakeTime::Never => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub usize);

/// Monotonic scheduler the controller registers its re-check timer with.
///
/// The dispatcher owns the callbacks: when a timer comes due it invokes the
/// owner, and the owner's return value is written back with `update_timer`.
pub trait TimerService: Send + Sync {
    fn monotonic(&self) -> f64;

    fn register_timer(&self, waketime: WakeTime) -> TimerHandle;

    fn update_timer(&self, handle: TimerHandle, waketime: WakeTime);
}
