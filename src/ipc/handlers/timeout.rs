// Author: Dustin Pilgrim
// License: MIT

use tokio::sync::mpsc;

use crate::core::host_msg::HostMsg;

pub async fn handle_set_timeout(tx: &mpsc::Sender<HostMsg>, args: &str) -> String {
    let seconds = match super::parse_seconds(args, "set-timeout <SECONDS>") {
        Ok(s) => s,
        Err(e) => return e,
    };

    super::request(tx, |reply| HostMsg::SetTimeout { seconds, reply }).await
}
