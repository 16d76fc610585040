// Author: Dustin Pilgrim
// License: MIT

use tokio::sync::mpsc;

use super::handlers::{motion, status, stop, timeout};
use crate::core::host_msg::HostMsg;
use crate::qwarn;

/// Splits `cmd` into its verb and the remaining argument text.
fn split_verb(cmd: &str) -> (&str, &str) {
    match cmd.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (cmd, ""),
    }
}

/// Routes one IPC request line to its handler.
pub async fn route_command(cmd: &str, tx: &mpsc::Sender<HostMsg>) -> String {
    let (verb, args) = split_verb(cmd.trim());

    match verb {
        "status" => status::handle_status(tx, args.contains("--json")).await,
        "set-timeout" | "set_timeout" => timeout::handle_set_timeout(tx, args).await,
        "move" => motion::handle_move(tx, args).await,
        "halt" => motion::handle_halt(tx).await,
        "stop" => stop::handle_stop(tx).await,

        _ => {
            qwarn!("Router", "unknown IPC command: {}", cmd);
            format!("ERROR: Unknown command '{}'", cmd)
        }
    }
}
