// Author: Dustin Pilgrim
// License: MIT

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::core::config::IdleConfig;
use crate::core::controller::{Collaborators, IdleController, READY_TIMEOUT};
use crate::core::error::{Error, ScriptError};
use crate::core::events::{EventBus, IdleEvent};
use crate::core::oracle::{BusyStatus, MotionOracle};
use crate::core::script::{ScriptExecutor, ScriptTemplate};
use crate::core::state::IdleState;
use crate::core::timer::{TimerHandle, TimerService, WakeTime};

// ---------------- fakes ----------------

type StatusFn = Box<dyn Fn(f64) -> BusyStatus + Send + Sync>;

struct FakeOracle {
    status: Mutex<StatusFn>,
    lock_held: AtomicBool,
    last_move: Mutex<f64>,
}

impl FakeOracle {
    fn new(f: impl Fn(f64) -> BusyStatus + Send + Sync + 'static) -> Self {
        Self {
            status: Mutex::new(Box::new(f)),
            lock_held: AtomicBool::new(false),
            last_move: Mutex::new(0.0),
        }
    }

    fn set(&self, f: impl Fn(f64) -> BusyStatus + Send + Sync + 'static) {
        *self.status.lock().unwrap() = Box::new(f);
    }
}

impl MotionOracle for FakeOracle {
    fn check_busy(&self, now: f64) -> BusyStatus {
        let f = self.status.lock().unwrap();
        (*f)(now)
    }

    fn last_move_time(&self) -> f64 {
        *self.last_move.lock().unwrap()
    }

    fn queue_lock_held(&self) -> bool {
        self.lock_held.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct FakeScripts {
    ran: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl ScriptExecutor for FakeScripts {
    fn execute(&self, script: &str) -> Result<(), ScriptError> {
        self.ran.lock().unwrap().push(script.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(ScriptError::Failed {
                code: Some(1),
                stderr: "heater busy".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeTimers {
    timers: Mutex<HashMap<usize, WakeTime>>,
}

impl FakeTimers {
    fn get(&self, h: TimerHandle) -> WakeTime {
        self.timers.lock().unwrap()[&h.0]
    }
}

impl TimerService for FakeTimers {
    fn monotonic(&self) -> f64 {
        0.0
    }

    fn register_timer(&self, waketime: WakeTime) -> TimerHandle {
        let mut t = self.timers.lock().unwrap();
        let id = t.len();
        t.insert(id, waketime);
        TimerHandle(id)
    }

    fn update_timer(&self, handle: TimerHandle, waketime: WakeTime) {
        self.timers.lock().unwrap().insert(handle.0, waketime);
    }
}

// ---------------- harness ----------------

struct Harness {
    ctl: IdleController,
    oracle: Arc<FakeOracle>,
    scripts: Arc<FakeScripts>,
    timers: Arc<FakeTimers>,
    events: Arc<Mutex<Vec<IdleEvent>>>,
    // Tick times at which the shutdown script ran.
    script_times: Vec<f64>,
}

fn idle_since(t0: f64) -> impl Fn(f64) -> BusyStatus + Send + Sync {
    move |now| BusyStatus {
        print_time: now,
        busy_until: t0,
        lookahead_empty: true,
    }
}

fn streaming(now: f64) -> BusyStatus {
    BusyStatus {
        print_time: now,
        busy_until: now + 30.0,
        lookahead_empty: false,
    }
}

fn harness(timeout: f64) -> Harness {
    let oracle = Arc::new(FakeOracle::new(idle_since(0.0)));
    let scripts = Arc::new(FakeScripts::default());
    let timers = Arc::new(FakeTimers::default());
    let bus = Arc::new(EventBus::new());

    let events = Arc::new(Mutex::new(Vec::new()));
    for name in [IdleEvent::PRINTING, IdleEvent::READY, IdleEvent::IDLE] {
        let sink = Arc::clone(&events);
        bus.subscribe(name, move |ev| sink.lock().unwrap().push(*ev));
    }

    let cfg = IdleConfig {
        idle_timeout: timeout,
        gcode: ScriptTemplate::default(),
    };

    let deps = Collaborators {
        oracle: oracle.clone(),
        scripts: scripts.clone(),
        timers: timers.clone(),
        events: bus,
    };

    Harness {
        ctl: IdleController::new(cfg, deps).unwrap(),
        oracle,
        scripts,
        timers,
        events,
        script_times: Vec::new(),
    }
}

impl Harness {
    fn handle(&self) -> TimerHandle {
        self.ctl.timer().expect("timer registered")
    }

    fn scheduled(&self) -> WakeTime {
        self.timers.get(self.handle())
    }

    /// Fire the controller timer until it is past `end` or parked at Never,
    /// the way the daemon dispatcher does.
    fn run_until(&mut self, end: f64) {
        for _ in 0..10_000 {
            let WakeTime::At(t) = self.scheduled() else { return };
            if t > end {
                return;
            }

            let before = self.scripts.ran.lock().unwrap().len();
            let next = self.ctl.tick(t);
            if self.scripts.ran.lock().unwrap().len() > before {
                self.script_times.push(t);
            }

            self.timers.update_timer(self.handle(), next);
        }
        panic!("timer never settled");
    }
}

// ---------------- tests ----------------

#[test]
fn construction_rejects_non_positive_timeout() {
    let h = harness(10.0);
    let deps = Collaborators {
        oracle: h.oracle.clone(),
        scripts: h.scripts.clone(),
        timers: h.timers.clone(),
        events: Arc::new(EventBus::new()),
    };

    let cfg = IdleConfig {
        idle_timeout: 0.0,
        gcode: ScriptTemplate::default(),
    };
    assert!(matches!(IdleController::new(cfg, deps), Err(Error::InvalidConfig(_))));
}

#[test]
fn ready_schedules_first_tick_now() {
    let mut h = harness(600.0);
    assert_eq!(h.ctl.state(), IdleState::Idle);

    h.ctl.on_ready(5.0);
    assert_eq!(h.scheduled(), WakeTime::At(5.0));

    // second ready is ignored; no extra timer
    h.ctl.on_ready(9.0);
    assert_eq!(h.timers.timers.lock().unwrap().len(), 1);
}

#[test]
fn boot_idle_runs_script_once_after_timeout() {
    let mut h = harness(60.0);
    h.ctl.on_ready(0.0);

    h.run_until(1000.0);

    assert_eq!(h.script_times, vec![60.0]);
    assert_eq!(h.ctl.state(), IdleState::Idle);
    assert_eq!(h.scheduled(), WakeTime::Never);
}

#[test]
fn liveness_idle_oracle_reaches_idle_exactly_at_timeout() {
    let mut h = harness(60.0);
    h.ctl.on_ready(0.0);
    h.ctl.on_print_session_start(0.0, 0.0, 0.0);
    assert_eq!(h.ctl.state(), IdleState::Printing);

    h.run_until(59.999);
    assert!(h.script_times.is_empty());

    h.run_until(1000.0);
    assert_eq!(h.script_times, vec![60.0]);
    assert_eq!(h.ctl.state(), IdleState::Idle);
}

#[test]
fn print_session_start_is_idempotent() {
    let mut h = harness(600.0);
    h.ctl.on_ready(0.0);

    h.ctl.on_print_session_start(10.0, 10.0, 12.0);
    h.ctl.on_print_session_start(50.0, 50.0, 80.0);

    assert_eq!(h.ctl.state(), IdleState::Printing);
    assert_eq!(h.ctl.status(70.0).printing_time, 60.0);
    assert_eq!(h.scheduled(), WakeTime::At(610.0));

    let printing = h
        .events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, IdleEvent::Printing { .. }))
        .count();
    assert_eq!(printing, 1);
}

#[test]
fn print_session_waits_for_long_lookahead() {
    let mut h = harness(60.0);
    h.ctl.on_ready(0.0);

    // 300s of motion already planned
    h.ctl.on_print_session_start(10.0, 10.0, 310.0);

    assert_eq!(h.scheduled(), WakeTime::At(310.0));
    assert_eq!(
        h.events.lock().unwrap().first().copied(),
        Some(IdleEvent::Printing { print_time: 310.0 + 0.1 })
    );
}

#[test]
fn print_session_before_ready_is_ignored() {
    let mut h = harness(60.0);
    h.ctl.on_print_session_start(1.0, 1.0, 2.0);

    assert_eq!(h.ctl.state(), IdleState::Idle);
    assert!(h.events.lock().unwrap().is_empty());
}

#[test]
fn never_runs_script_while_lookahead_full() {
    let mut h = harness(30.0);
    h.oracle.set(streaming);
    h.ctl.on_ready(0.0);
    h.ctl.on_print_session_start(0.0, 0.0, 30.0);

    h.run_until(10_000.0);

    assert!(h.scripts.ran.lock().unwrap().is_empty());
    assert_eq!(h.ctl.state(), IdleState::Printing);
}

#[test]
fn busy_with_empty_lookahead_rechecks_soon() {
    let mut h = harness(600.0);
    h.ctl.on_ready(0.0);
    h.ctl.on_print_session_start(0.0, 0.0, 100.0);

    // all moves planned, 100s still to run
    h.oracle.set(|now| BusyStatus {
        print_time: now,
        busy_until: 100.0,
        lookahead_empty: true,
    });

    assert_eq!(h.ctl.tick(50.0), WakeTime::At(50.0 + READY_TIMEOUT + 2.0));
    assert_eq!(h.ctl.tick(99.75), WakeTime::At(100.5));
    assert_eq!(h.ctl.state(), IdleState::Printing);
}

#[test]
fn draining_recheck_never_exceeds_timeout() {
    let mut h = harness(1.0);
    h.ctl.on_ready(0.0);
    h.ctl.on_print_session_start(0.0, 0.0, 100.0);
    h.oracle.set(|now| BusyStatus {
        print_time: now,
        busy_until: 100.0,
        lookahead_empty: true,
    });

    assert_eq!(h.ctl.tick(10.0), WakeTime::At(11.0));
}

#[test]
fn queue_lock_defers_transitions() {
    let mut h = harness(60.0);
    h.ctl.on_ready(0.0);
    h.ctl.on_print_session_start(0.0, 0.0, 0.0);
    h.oracle.lock_held.store(true, Ordering::SeqCst);

    assert_eq!(h.ctl.tick(5.0), WakeTime::At(5.0 + READY_TIMEOUT));
    assert_eq!(h.ctl.state(), IdleState::Printing);

    h.oracle.lock_held.store(false, Ordering::SeqCst);
    assert_eq!(h.ctl.tick(5.5), WakeTime::At(60.0));
    assert_eq!(h.ctl.state(), IdleState::Ready);

    h.oracle.lock_held.store(true, Ordering::SeqCst);
    assert_eq!(h.ctl.tick(60.0), WakeTime::At(60.0 + READY_TIMEOUT));
    assert!(h.scripts.ran.lock().unwrap().is_empty());
}

#[test]
fn printing_to_ready_publishes_ready_event() {
    let mut h = harness(60.0);
    h.ctl.on_ready(0.0);
    h.ctl.on_print_session_start(0.0, 0.0, 4.0);
    h.oracle.set(idle_since(4.0));

    assert_eq!(h.ctl.tick(10.0), WakeTime::At(10.0 + 60.0 - 6.0));
    assert_eq!(h.ctl.state(), IdleState::Ready);
    assert_eq!(h.ctl.status(10.0).printing_time, 0.0);

    let events = h.events.lock().unwrap().clone();
    assert_eq!(events.last(), Some(&IdleEvent::Ready { print_time: 4.0 + 0.1 }));
}

#[test]
fn script_failure_demotes_to_ready_and_retries() {
    let mut h = harness(60.0);
    h.scripts.fail.store(true, Ordering::SeqCst);
    h.ctl.on_ready(0.0);
    h.ctl.on_print_session_start(0.0, 0.0, 0.0);

    h.run_until(60.0);

    assert_eq!(h.ctl.status(60.0).state, IdleState::Ready);
    let WakeTime::At(retry) = h.scheduled() else { panic!("retry not scheduled") };
    assert!(retry > 60.0 && retry - 60.0 < 1.0);

    // recovers once the executor works again
    h.scripts.fail.store(false, Ordering::SeqCst);
    h.run_until(100.0);
    assert_eq!(h.ctl.state(), IdleState::Idle);
    assert_eq!(h.script_times, vec![60.0, retry]);
}

#[test]
fn bad_template_is_treated_as_script_failure() {
    let oracle = Arc::new(FakeOracle::new(idle_since(0.0)));
    let scripts = Arc::new(FakeScripts::default());
    let timers = Arc::new(FakeTimers::default());

    let cfg = IdleConfig {
        idle_timeout: 5.0,
        gcode: ScriptTemplate::new("SET_HEATER_TEMPERATURE HEATER={heater} TARGET=0"),
    };
    let deps = Collaborators {
        oracle,
        scripts: scripts.clone(),
        timers,
        events: Arc::new(EventBus::new()),
    };

    let mut ctl = IdleController::new(cfg, deps).unwrap();
    ctl.on_ready(0.0);
    ctl.tick(0.0);

    assert_eq!(ctl.tick(5.0), WakeTime::At(5.5));
    assert_eq!(ctl.state(), IdleState::Ready);
    assert!(scripts.ran.lock().unwrap().is_empty());
}

#[test]
fn idle_event_carries_last_move_time() {
    let mut h = harness(10.0);
    *h.oracle.last_move.lock().unwrap() = 42.25;
    h.ctl.on_ready(0.0);

    h.run_until(100.0);

    assert_eq!(
        h.events.lock().unwrap().last(),
        Some(&IdleEvent::Idle { print_time: 42.25 })
    );
}

#[test]
fn set_timeout_while_idle_rearms_monitoring() {
    let mut h = harness(60.0);
    h.ctl.on_ready(0.0);
    h.run_until(100.0);
    assert_eq!(h.ctl.state(), IdleState::Idle);
    assert_eq!(h.scheduled(), WakeTime::Never);

    let msg = h.ctl.set_timeout(100.0, 30.0).unwrap();
    assert_eq!(msg, "idle_timeout: Timeout set to 30.00 s");
    assert_eq!(h.scheduled(), WakeTime::At(130.0));

    // re-armed: the script runs again at the new deadline
    h.run_until(200.0);
    assert_eq!(h.script_times, vec![60.0, 130.0]);
}

#[test]
fn set_timeout_round_trip_uses_new_threshold() {
    let mut h = harness(600.0);
    h.ctl.on_ready(0.0);
    h.ctl.on_print_session_start(0.0, 0.0, 0.0);
    h.ctl.tick(1.0);
    assert_eq!(h.ctl.state(), IdleState::Ready);

    h.ctl.set_timeout(30.0, 45.0).unwrap();
    assert_eq!(h.ctl.status(30.0).state, IdleState::Ready);
    assert_eq!(h.ctl.status(30.0).idle_timeout, 45.0);

    // Ready recomputes immediately against the new value
    assert_eq!(h.scheduled(), WakeTime::At(30.0));
    assert_eq!(h.ctl.tick(30.0), WakeTime::At(45.0));

    h.run_until(1000.0);
    assert_eq!(h.script_times, vec![45.0]);
}

#[test]
fn set_timeout_rejects_invalid_and_keeps_value() {
    let mut h = harness(600.0);
    h.ctl.on_ready(0.0);

    for bad in [0.0, -5.0, f64::NAN] {
        let err = h.ctl.set_timeout(1.0, bad).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    assert_eq!(h.ctl.idle_timeout(), 600.0);
    assert_eq!(h.scheduled(), WakeTime::At(0.0));
}

#[test]
fn set_timeout_while_printing_does_not_reschedule() {
    let mut h = harness(600.0);
    h.ctl.on_ready(0.0);
    h.ctl.on_print_session_start(0.0, 0.0, 10.0);

    h.ctl.set_timeout(5.0, 120.0).unwrap();

    assert_eq!(h.scheduled(), WakeTime::At(600.0));
    assert_eq!(h.ctl.state(), IdleState::Printing);
}

#[test]
fn new_session_after_idle_starts_printing_again() {
    let mut h = harness(10.0);
    h.ctl.on_ready(0.0);
    h.run_until(50.0);
    assert_eq!(h.ctl.state(), IdleState::Idle);

    h.ctl.on_print_session_start(200.0, 200.0, 205.0);
    assert_eq!(h.ctl.state(), IdleState::Printing);
    assert_eq!(h.ctl.status(203.0).printing_time, 3.0);

    h.oracle.set(idle_since(205.0));
    h.run_until(1000.0);
    assert_eq!(h.script_times, vec![10.0, 215.0]);
}

#[test]
fn host_shutdown_stops_ticking() {
    let mut h = harness(10.0);
    h.ctl.on_ready(0.0);
    h.ctl.on_print_session_start(0.0, 0.0, 0.0);

    h.ctl.handle_host_shutdown();

    assert_eq!(h.scheduled(), WakeTime::Never);
    assert_eq!(h.ctl.tick(50.0), WakeTime::Never);
    assert!(h.scripts.ran.lock().unwrap().is_empty());
}

#[test]
fn power_down_runs_script_before_latching() {
    let mut h = harness(600.0);
    h.ctl.on_ready(0.0);
    h.ctl.on_print_session_start(0.0, 0.0, 5.0);

    h.ctl.power_down().unwrap();
    h.ctl.handle_host_shutdown();

    assert_eq!(h.scripts.ran.lock().unwrap().len(), 1);
    assert_eq!(h.ctl.state(), IdleState::Idle);
    assert_eq!(h.scheduled(), WakeTime::Never);
    assert!(matches!(h.events.lock().unwrap().last(), Some(IdleEvent::Idle { .. })));

    // latched: a second power down does nothing
    h.ctl.power_down().unwrap();
    assert_eq!(h.scripts.ran.lock().unwrap().len(), 1);
}

#[test]
fn power_down_reports_script_failure() {
    let mut h = harness(600.0);
    h.scripts.fail.store(true, Ordering::SeqCst);
    h.ctl.on_ready(0.0);

    assert!(matches!(h.ctl.power_down(), Err(Error::Script(_))));
    assert_eq!(h.ctl.state(), IdleState::Idle);
}

#[test]
fn tick_records_pending_wake_time() {
    let mut h = harness(60.0);
    h.ctl.on_ready(0.0);

    let next = h.ctl.tick(0.0);
    assert_eq!(h.ctl.pending_wake_time(), next);
    assert_eq!(next, WakeTime::At(60.0));
}
