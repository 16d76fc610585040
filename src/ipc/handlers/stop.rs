// Author: Dustin Pilgrim
// License: MIT

use tokio::sync::mpsc;

use crate::core::host_msg::HostMsg;

/// Handle `quiesce stop`: the daemon acknowledges, then leaves its loop.
pub async fn handle_stop(tx: &mpsc::Sender<HostMsg>) -> String {
    super::request(tx, |reply| HostMsg::StopDaemon { reply }).await
}
