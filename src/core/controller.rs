// Author: Dustin Pilgrim
// License: MIT

use std::sync::Arc;

use crate::core::{
    config::{IdleConfig, validate_timeout},
    error::Error,
    events::{EventBus, IdleEvent},
    info::IdleStatus,
    oracle::{BusyStatus, MotionOracle},
    script::{ScriptContext, ScriptExecutor, ScriptTemplate},
    state::IdleState,
    timer::{TimerHandle, TimerService, WakeTime},
};
use crate::{qdebug, qerror, qinfo, qwarn};

/// Short re-check margin used while motion is winding down.
pub const READY_TIMEOUT: f64 = 0.5;
/// Upper bound on how far ahead the busy-but-draining path may sleep.
pub const BUSY_CHECK_CEILING: f64 = 2.0;
/// Offset added to print times handed to event subscribers.
pub const PIN_MIN_TIME: f64 = 0.1;
/// Delay before retrying a failed shutdown script.
pub const SCRIPT_RETRY_DELAY: f64 = 0.5;

/// Shared handles to the collaborators the controller consults.
#[derive(Clone)]
pub struct Collaborators {
    pub oracle: Arc<dyn MotionOracle>,
    pub scripts: Arc<dyn ScriptExecutor>,
    pub timers: Arc<dyn TimerService>,
    pub events: Arc<EventBus>,
}

pub struct IdleController {
    state: IdleState,
    idle_timeout: f64,
    last_print_start_time: f64,
    pending_wake_time: WakeTime,
    shutdown_template: ScriptTemplate,

    // True once the shutdown script succeeded for the current idle period.
    shutdown_confirmed: bool,
    host_shutdown: bool,
    timer: Option<TimerHandle>,

    deps: Collaborators,
}

impl IdleController {
    pub fn new(cfg: IdleConfig, deps: Collaborators) -> Result<Self, Error> {
        cfg.validate()?;

        Ok(Self {
            state: IdleState::Idle,
            idle_timeout: cfg.idle_timeout,
            last_print_start_time: 0.0,
            pending_wake_time: WakeTime::Never,
            shutdown_template: cfg.gcode,
            shutdown_confirmed: false,
            host_shutdown: false,
            timer: None,
            deps,
        })
    }

    // ---------------- accessors ----------------

    pub fn state(&self) -> IdleState {
        self.state
    }

    pub fn idle_timeout(&self) -> f64 {
        self.idle_timeout
    }

    pub fn pending_wake_time(&self) -> WakeTime {
        self.pending_wake_time
    }

    pub fn timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    pub fn status(&self, now: f64) -> IdleStatus {
        let printing_time = if self.state == IdleState::Printing {
            now - self.last_print_start_time
        } else {
            0.0
        };

        IdleStatus {
            state: self.state,
            printing_time,
            idle_timeout: self.idle_timeout,
        }
    }

    // ---------------- inbound notifications ----------------

    /// Host finished starting up: register the re-check timer, due now.
    pub fn on_ready(&mut self, now: f64) {
        if self.timer.is_some() {
            qwarn!("Idle", "ready notification received twice; ignoring");
            return;
        }

        let handle = self.deps.timers.register_timer(WakeTime::At(now));
        self.timer = Some(handle);
        self.pending_wake_time = WakeTime::At(now);

        qinfo!("Idle", "monitoring started (timeout {:.2}s)", self.idle_timeout);
    }

    /// Motion planner started a new run of moves.
    pub fn on_print_session_start(&mut self, current_time: f64, print_time: f64, busy_until: f64) {
        let Some(handle) = self.timer else {
            qdebug!("Idle", "print session before ready; ignoring");
            return;
        };

        if self.state == IdleState::Printing {
            return;
        }

        self.state = IdleState::Printing;
        self.last_print_start_time = current_time;
        self.shutdown_confirmed = false;

        let check_time = current_time + self.idle_timeout.max(busy_until - print_time);
        self.reschedule(handle, WakeTime::At(check_time));

        qinfo!("Idle", "printing (next check at {:.3})", check_time);
        self.deps.events.publish(&IdleEvent::Printing {
            print_time: busy_until + PIN_MIN_TIME,
        });
    }

    /// Host entered its fatal shutdown path; stop ticking for good.
    pub fn handle_host_shutdown(&mut self) {
        self.host_shutdown = true;

        if let Some(handle) = self.timer {
            self.reschedule(handle, WakeTime::Never);
        }

        qwarn!("Idle", "host shutdown; idle monitoring stopped");
    }

    // ---------------- commands ----------------

    /// Runs the shutdown script now, whatever the state. An emergency stop
    /// calls this before latching so heaters are not left on.
    pub fn power_down(&mut self) -> Result<(), Error> {
        if self.host_shutdown {
            return Ok(());
        }
        self.enter_idle()
    }

    /// `SET_IDLE_TIMEOUT`: returns the confirmation message for the caller.
    pub fn set_timeout(&mut self, now: f64, seconds: f64) -> Result<String, Error> {
        let seconds = validate_timeout(seconds)?;
        self.idle_timeout = seconds;

        match (self.state, self.timer) {
            (IdleState::Idle, Some(handle)) => {
                self.shutdown_confirmed = false;
                self.reschedule(handle, WakeTime::At(now + seconds));
            }
            (IdleState::Ready, Some(handle)) => {
                self.reschedule(handle, WakeTime::At(now));
            }
            _ => {}
        }

        qinfo!("Idle", "timeout set to {:.2}s", seconds);
        Ok(format!("idle_timeout: Timeout set to {:.2} s", seconds))
    }

    // ---------------- timer callback ----------------

    /// Timer callback. The returned wake time must be handed back to the
    /// timer service by the dispatcher.
    pub fn tick(&mut self, now: f64) -> WakeTime {
        let next = if self.host_shutdown {
            WakeTime::Never
        } else {
            match self.state {
                IdleState::Idle => self.check_idle_maintenance(now),
                IdleState::Printing => self.check_printing(now),
                IdleState::Ready => self.check_idle_timeout(now),
            }
        };

        self.pending_wake_time = next;
        next
    }

    fn check_idle_maintenance(&mut self, now: f64) -> WakeTime {
        if self.shutdown_confirmed {
            return WakeTime::Never;
        }
        self.check_idle_timeout(now)
    }

    fn check_printing(&mut self, now: f64) -> WakeTime {
        let status = self.deps.oracle.check_busy(now);

        if !status.lookahead_empty {
            return WakeTime::At(now + self.idle_timeout);
        }

        let remaining = status.busy_remaining();
        if remaining > -READY_TIMEOUT {
            return self.draining_recheck(now, remaining);
        }

        if self.deps.oracle.queue_lock_held() {
            return WakeTime::At(now + READY_TIMEOUT);
        }

        self.state = IdleState::Ready;
        qinfo!("Idle", "ready");
        self.deps.events.publish(&IdleEvent::Ready {
            print_time: status.busy_until + PIN_MIN_TIME,
        });

        self.evaluate_ready(now, &status)
    }

    fn check_idle_timeout(&mut self, now: f64) -> WakeTime {
        let status = self.deps.oracle.check_busy(now);
        self.evaluate_ready(now, &status)
    }

    fn evaluate_ready(&mut self, now: f64, status: &BusyStatus) -> WakeTime {
        if !status.lookahead_empty {
            return WakeTime::At(now + self.idle_timeout);
        }

        let remaining = status.busy_remaining();
        if remaining > 0.0 {
            return self.draining_recheck(now, remaining);
        }

        let idle_time = status.idle_time();
        if idle_time < self.idle_timeout {
            return WakeTime::At(now + self.idle_timeout - idle_time);
        }

        if self.deps.oracle.queue_lock_held() {
            return WakeTime::At(now + READY_TIMEOUT);
        }

        self.transition_to_idle(now)
    }

    // Motion is about to finish: look again soon, but never later than a
    // full timeout from now.
    fn draining_recheck(&self, now: f64, remaining: f64) -> WakeTime {
        let margin = READY_TIMEOUT + remaining.min(BUSY_CHECK_CEILING);
        WakeTime::At(now + margin.min(self.idle_timeout))
    }

    fn transition_to_idle(&mut self, now: f64) -> WakeTime {
        if let Err(e) = self.enter_idle() {
            qerror!("Idle", "idle timeout script failed: {}", e);
            self.state = IdleState::Ready;
            return WakeTime::At(now + SCRIPT_RETRY_DELAY);
        }
        WakeTime::Never
    }

    fn enter_idle(&mut self) -> Result<(), Error> {
        self.run_shutdown_script()?;

        let print_time = self.deps.oracle.last_move_time();
        self.state = IdleState::Idle;
        self.shutdown_confirmed = true;

        qinfo!("Idle", "idle (shutdown script complete)");
        self.deps.events.publish(&IdleEvent::Idle { print_time });
        Ok(())
    }

    fn run_shutdown_script(&self) -> Result<(), Error> {
        let ctx = ScriptContext::new()
            .with("idle_timeout", format!("{:.2}", self.idle_timeout))
            .with("last_move_time", format!("{:.3}", self.deps.oracle.last_move_time()));

        let script = self.shutdown_template.render(&ctx)?;
        qdebug!("Idle", "running shutdown script:\n{}", script);

        self.deps.scripts.execute(&script)?;
        Ok(())
    }

    fn reschedule(&mut self, handle: TimerHandle, waketime: WakeTime) {
        self.pending_wake_time = waketime;
        self.deps.timers.update_timer(handle, waketime);
    }
}

impl std::fmt::Debug for IdleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleController")
            .field("state", &self.state)
            .field("idle_timeout", &self.idle_timeout)
            .field("last_print_start_time", &self.last_print_start_time)
            .field("pending_wake_time", &self.pending_wake_time)
            .field("shutdown_confirmed", &self.shutdown_confirmed)
            .field("host_shutdown", &self.host_shutdown)
            .field("timer", &self.timer)
            .finish()
    }
}
