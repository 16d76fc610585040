// Author: Dustin Pilgrim
// License: MIT

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleState {
    /// Motion recently observed.
    Printing,
    /// No session running; heaters and motors may still be on.
    Ready,
    /// Shutdown script has run (or is due to run at boot).
    Idle,
}

impl IdleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdleState::Printing => "Printing",
            IdleState::Ready => "Ready",
            IdleState::Idle => "Idle",
        }
    }
}

impl fmt::Display for IdleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
