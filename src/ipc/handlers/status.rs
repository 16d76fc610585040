// Author: Dustin Pilgrim
// License: MIT

use tokio::sync::{mpsc, oneshot};

use crate::core::host_msg::HostMsg;

pub async fn handle_status(tx: &mpsc::Sender<HostMsg>, as_json: bool) -> String {
    let (reply_tx, reply_rx) = oneshot::channel();

    if tx.send(HostMsg::GetStatus { reply: reply_tx }).await.is_err() {
        return "ERROR: quiesce daemon not running".to_string();
    }

    match reply_rx.await {
        Ok(status) if as_json => status.to_json(),
        Ok(status) => status.pretty_text(),
        Err(_) => "ERROR: No response from daemon".to_string(),
    }
}
