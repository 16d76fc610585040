// Author: Dustin Pilgrim
// License: MIT

pub mod motion;
pub mod status;
pub mod stop;
pub mod timeout;

use tokio::sync::{mpsc, oneshot};

use crate::core::host_msg::HostMsg;

type Reply = oneshot::Sender<Result<String, String>>;

/// Sends a request to the daemon task and renders its reply for the client.
pub(crate) async fn request<F>(tx: &mpsc::Sender<HostMsg>, make: F) -> String
where
    F: FnOnce(Reply) -> HostMsg,
{
    let (reply_tx, reply_rx) = oneshot::channel();

    if tx.send(make(reply_tx)).await.is_err() {
        return "ERROR: quiesce daemon not running".to_string();
    }

    match reply_rx.await {
        Ok(Ok(msg)) => msg,
        Ok(Err(e)) => {
            let out = e.trim_end();
            if out.is_empty() {
                "ERROR: request failed".to_string()
            } else {
                format!("ERROR: {out}")
            }
        }
        Err(_) => "ERROR: No response from daemon".to_string(),
    }
}

/// Parses the single numeric argument of `set-timeout` and `move`.
pub(crate) fn parse_seconds(args: &str, usage: &str) -> Result<f64, String> {
    let mut parts = args.split_whitespace();

    let (Some(raw), None) = (parts.next(), parts.next()) else {
        return Err(format!("ERROR: usage: {usage}"));
    };

    raw.parse::<f64>()
        .map_err(|_| format!("ERROR: '{raw}' is not a number of seconds"))
}
