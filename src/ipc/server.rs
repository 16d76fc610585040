// Author: Dustin Pilgrim
// License: MIT

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
    sync::mpsc,
    time::{Duration, timeout},
};

use super::router::route_command;
use crate::core::host_msg::HostMsg;
use crate::{qdebug, qerror, qinfo};

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Binds the control socket (replacing a stale one) and starts serving it.
pub async fn spawn_ipc_server(tx: mpsc::Sender<HostMsg>) -> Result<(), String> {
    let path = super::socket_path()?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
    }

    // Only one daemon holds the instance lock, so an existing socket is stale.
    if path.exists() {
        let _ = std::fs::remove_file(&path);
    }

    let listener = UnixListener::bind(&path)
        .map_err(|e| format!("failed to bind {}: {e}", path.display()))?;

    qinfo!("Ipc", "listening on {}", path.display());
    spawn_with_listener(listener, tx);
    Ok(())
}

pub fn spawn_with_listener(listener: UnixListener, tx: mpsc::Sender<HostMsg>) {
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut stream, _addr)) => {
                    let tx = tx.clone();

                    tokio::spawn(async move {
                        let result = timeout(CONNECTION_TIMEOUT, async {
                            if let Err(e) = handle_connection(&mut stream, &tx).await {
                                qerror!("Ipc", "error handling IPC connection: {}", e);
                            }
                        })
                        .await;

                        if result.is_err() {
                            qerror!("Ipc", "IPC connection timed out after 10 seconds");
                        }

                        let _ = stream.shutdown().await;
                    });
                }
                Err(e) => qerror!("Ipc", "failed to accept IPC connection: {}", e),
            }
        }
    });
}

async fn handle_connection(
    stream: &mut UnixStream,
    tx: &mpsc::Sender<HostMsg>,
) -> std::io::Result<()> {
    let mut buf = vec![0u8; 256];
    let n = stream.read(&mut buf).await?;

    if n == 0 {
        return Ok(());
    }

    let cmd = String::from_utf8_lossy(&buf[..n]).trim().to_string();

    // status is polled; keep it out of the debug log
    if !cmd.starts_with("status") {
        qdebug!("Ipc", "received IPC command: {}", cmd);
    }

    let response = route_command(&cmd, tx).await;

    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::info::IdleStatus;
    use crate::core::state::IdleState;

    #[tokio::test]
    async fn status_round_trip_over_socket() {
        let dir = std::env::temp_dir().join(format!("quiesce-ipc-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.sock");
        let _ = std::fs::remove_file(&path);

        let listener = UnixListener::bind(&path).unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        spawn_with_listener(listener, tx);

        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let HostMsg::GetStatus { reply } = msg {
                    let _ = reply.send(IdleStatus {
                        state: IdleState::Ready,
                        printing_time: 0.0,
                        idle_timeout: 600.0,
                    });
                }
            }
        });

        let resp = crate::ipc::client::send_to(&path, "status --json").await.unwrap();
        assert_eq!(resp, r#"{"state":"Ready","printing_time":0.0,"idle_timeout":600.0}"#);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
