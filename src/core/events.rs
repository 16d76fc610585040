// Author: Dustin Pilgrim
// License: MIT

use std::collections::HashMap;
use std::sync::Mutex;

/// Notifications published by the idle controller.
///
/// Each carries a print-clock timestamp: the time from which subscribers
/// (heater and stepper owners) may act on the new state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IdleEvent {
    Printing { print_time: f64 },
    Ready { print_time: f64 },
    Idle { print_time: f64 },
}

impl IdleEvent {
    pub const PRINTING: &'static str = "idle_timeout:printing";
    pub const READY: &'static str = "idle_timeout:ready";
    pub const IDLE: &'static str = "idle_timeout:idle";

    pub fn name(&self) -> &'static str {
        match self {
            IdleEvent::Printing { .. } => Self::PRINTING,
            IdleEvent::Ready { .. } => Self::READY,
            IdleEvent::Idle { .. } => Self::IDLE,
        }
    }

    pub fn print_time(&self) -> f64 {
        match self {
            IdleEvent::Printing { print_time }
            | IdleEvent::Ready { print_time }
            | IdleEvent::Idle { print_time } => *print_time,
        }
    }
}

type Handler = Box<dyn Fn(&IdleEvent) + Send + Sync>;

/// Name-keyed callback registry.
#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<HashMap<&'static str, Vec<Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, name: &'static str, handler: F)
    where
        F: Fn(&IdleEvent) + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        handlers.entry(name).or_default().push(Box::new(handler));
    }

    /// Runs every handler subscribed to the event's name, in subscription
    /// order. Returns how many ran.
    ///
    /// Handlers run with the registry locked and must not subscribe.
    pub fn publish(&self, event: &IdleEvent) -> usize {
        let handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        match handlers.get(event.name()) {
            Some(list) => {
                for h in list {
                    h(event);
                }
                list.len()
            }
            None => 0,
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<_> = handlers.keys().copied().collect();
        names.sort_unstable();
        f.debug_struct("EventBus").field("events", &names).finish()
    }
}
