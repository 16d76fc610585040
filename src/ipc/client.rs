// Author: Dustin Pilgrim
// License: MIT

use std::future::Future;
use std::path::Path;

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::UnixStream,
    time::{Duration, timeout},
};

const STEP_TIMEOUT: Duration = Duration::from_secs(2);

async fn step<T, F>(what: &str, fut: F) -> Result<T, String>
where
    F: Future<Output = std::io::Result<T>>,
{
    timeout(STEP_TIMEOUT, fut)
        .await
        .map_err(|_| format!("timeout {what}"))?
        .map_err(|e| format!("{what} failed: {e}"))
}

/// One request, one reply: write the command, half-close, read to EOF.
pub async fn send_to(path: &Path, cmd: &str) -> Result<String, String> {
    if !path.exists() {
        return Err("quiesce daemon not running".to_string());
    }

    let mut stream = step("connecting to daemon", UnixStream::connect(path))
        .await
        .map_err(|e| format!("{e} ({})", path.display()))?;

    step("writing request", stream.write_all(cmd.as_bytes())).await?;
    step("finalizing request", stream.shutdown()).await?;

    let mut resp = Vec::new();
    step("reading response", stream.read_to_end(&mut resp)).await?;

    Ok(String::from_utf8_lossy(&resp).to_string())
}

pub async fn send_raw(cmd: &str) -> Result<String, String> {
    let path = crate::ipc::socket_path()?;
    send_to(&path, cmd).await
}
