// Author: Dustin Pilgrim
// License: MIT

use serde::Serialize;

use crate::core::state::IdleState;

/// Snapshot returned from the controller for `quiesce status`.
///
/// The JSON form is the stable contract; `pretty_text` is CLI-facing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdleStatus {
    #[serde(serialize_with = "serialize_state")]
    pub state: IdleState,
    pub printing_time: f64,
    pub idle_timeout: f64,
}

fn serialize_state<S: serde::Serializer>(state: &IdleState, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(state.as_str())
}

impl IdleStatus {
    pub fn pretty_text(&self) -> String {
        let mut out = String::new();

        out.push_str("◆ STATUS\n");
        out.push_str(&format!("State: {}\n", self.state));
        if self.state == IdleState::Printing {
            out.push_str(&format!("Printing For: {}\n", format_seconds(self.printing_time)));
        }
        out.push_str(&format!("Idle Timeout: {}", format_seconds(self.idle_timeout)));

        out
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

pub fn format_seconds(secs: f64) -> String {
    let whole = secs.max(0.0).round() as u64;

    if whole < 60 {
        format!("{:.1}s", secs.max(0.0))
    } else if whole < 3600 {
        format!("{}m {}s", whole / 60, whole % 60)
    } else {
        format!("{}h {}m", whole / 3600, (whole % 3600) / 60)
    }
}
