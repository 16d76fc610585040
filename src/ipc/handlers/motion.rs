// Author: Dustin Pilgrim
// License: MIT

use tokio::sync::mpsc;

use crate::core::host_msg::HostMsg;

pub async fn handle_move(tx: &mpsc::Sender<HostMsg>, args: &str) -> String {
    let seconds = match super::parse_seconds(args, "move <SECONDS>") {
        Ok(s) => s,
        Err(e) => return e,
    };

    super::request(tx, |reply| HostMsg::QueueMove { seconds, reply }).await
}

/// Emergency stop. Idle monitoring stays off until the daemon restarts.
pub async fn handle_halt(tx: &mpsc::Sender<HostMsg>) -> String {
    super::request(tx, |reply| HostMsg::Halt { reply }).await
}
