// Author: Dustin Pilgrim
// License: MIT

mod run;

use std::sync::Arc;
use std::time::Duration;

use crate::config::QuiesceConfig;
use crate::core::{
    controller::{Collaborators, IdleController},
    error::Error,
    events::{EventBus, IdleEvent},
    host_msg::HostMsg,
    timer::TimerService,
};
use crate::services::{gcode::ShellScriptExecutor, reactor::Reactor, toolhead::SimulatedToolhead};
use crate::{qdebug, qerror, qinfo};

type AnyError = Box<dyn std::error::Error + Send + Sync>;

/// What the loop should do after a message was handled.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

pub struct Daemon {
    controller: IdleController,
    reactor: Arc<Reactor>,
    toolhead: Arc<SimulatedToolhead>,
    events: Arc<EventBus>,
}

impl Daemon {
    pub fn new(cfg: QuiesceConfig) -> Result<Self, Error> {
        let reactor = Arc::new(Reactor::new());
        let toolhead = Arc::new(SimulatedToolhead::new(cfg.lookahead_flush));
        let events = Arc::new(EventBus::new());

        for name in [IdleEvent::PRINTING, IdleEvent::READY, IdleEvent::IDLE] {
            events.subscribe(name, |ev| {
                qinfo!("Events", "{} (print time {:.3})", ev.name(), ev.print_time());
            });
        }

        let deps = Collaborators {
            oracle: toolhead.clone(),
            scripts: Arc::new(
                ShellScriptExecutor::new(cfg.script_command)
                    .with_timeout(
                        Duration::try_from_secs_f64(cfg.script_timeout).unwrap_or(Duration::MAX),
                    ),
            ),
            timers: reactor.clone(),
            events: events.clone(),
        };

        Ok(Self {
            controller: IdleController::new(cfg.idle, deps)?,
            reactor,
            toolhead,
            events,
        })
    }

    fn now(&self) -> f64 {
        self.reactor.monotonic()
    }

    /// Runs every timer whose wake time has passed.
    fn dispatch_due_timers(&mut self) {
        let now = self.now();

        while let Some((handle, at)) = self.reactor.next_due() {
            if at > now {
                break;
            }

            if self.controller.timer() != Some(handle) {
                qdebug!("Daemon", "dropping orphan timer {:?}", handle);
                self.reactor.update_timer(handle, crate::core::timer::WakeTime::Never);
                continue;
            }

            // The shutdown script blocks until the executor exits.
            let next = tokio::task::block_in_place(|| self.controller.tick(now));
            self.reactor.update_timer(handle, next);
            qdebug!(
                "Daemon",
                "idle check at {:.3}: {:?} (timeout {:.2}s), next {:?}",
                now,
                self.controller.state(),
                self.controller.idle_timeout(),
                self.controller.pending_wake_time()
            );
        }
    }

    fn handle_msg(&mut self, msg: HostMsg) -> Flow {
        let now = self.now();

        match msg {
            HostMsg::Ready => self.controller.on_ready(now),

            HostMsg::PrintSessionStart { current_time, print_time, busy_until } => {
                self.controller.on_print_session_start(current_time, print_time, busy_until);
            }

            HostMsg::HostShutdown => self.controller.handle_host_shutdown(),

            HostMsg::GetStatus { reply } => {
                let _ = reply.send(self.controller.status(now));
            }

            HostMsg::SetTimeout { seconds, reply } => {
                let out = self.controller.set_timeout(now, seconds).map_err(|e| e.to_string());
                let _ = reply.send(out);
            }

            HostMsg::QueueMove { seconds, reply } => {
                let _ = reply.send(self.queue_move(now, seconds));
            }

            HostMsg::Halt { reply } => {
                self.toolhead.halt(now);
                let powered = tokio::task::block_in_place(|| self.controller.power_down());
                self.controller.handle_host_shutdown();

                let out = match powered {
                    Ok(()) => Ok("Motion halted; idle monitoring stopped".to_string()),
                    Err(e) => {
                        qerror!("Daemon", "halt: shutdown script failed: {}", e);
                        Err(format!("Motion halted but shutdown script failed: {e}"))
                    }
                };
                let _ = reply.send(out);
            }

            HostMsg::StopDaemon { reply } => {
                qinfo!("Daemon", "daemon stopping (stop requested via IPC)");
                let _ = reply.send(Ok("Stopping quiesce daemon".to_string()));
                return Flow::Stop;
            }
        }

        Flow::Continue
    }

    fn queue_move(&mut self, now: f64, seconds: f64) -> Result<String, String> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(format!("move duration must be a non-negative number (got {seconds})"));
        }

        if let Some(start) = self.toolhead.queue_move(now, seconds) {
            self.handle_msg(HostMsg::PrintSessionStart {
                current_time: start.current_time,
                print_time: start.print_time,
                busy_until: start.busy_until,
            });
        }

        Ok(format!("Queued {:.2} s move", seconds))
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("controller", &self.controller)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
