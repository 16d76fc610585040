// Author: Dustin Pilgrim
// License: MIT

use tokio::sync::oneshot;

use crate::core::info::IdleStatus;

/// Everything the daemon task serializes onto the controller.
#[derive(Debug)]
pub enum HostMsg {
    /// Host finished starting up.
    Ready,

    /// Motion planner began a new run of moves.
    PrintSessionStart {
        current_time: f64,
        print_time: f64,
        busy_until: f64,
    },

    /// Host entered its fatal shutdown path.
    HostShutdown,

    GetStatus { reply: oneshot::Sender<IdleStatus> },

    SetTimeout {
        seconds: f64,
        reply: oneshot::Sender<Result<String, String>>,
    },

    QueueMove {
        seconds: f64,
        reply: oneshot::Sender<Result<String, String>>,
    },

    /// Emergency stop requested over IPC: drop queued motion, then latch the
    /// host shutdown.
    Halt {
        reply: oneshot::Sender<Result<String, String>>,
    },

    StopDaemon {
        reply: oneshot::Sender<Result<String, String>>,
    },
}
