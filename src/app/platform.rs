// Author: Dustin Pilgrim
// License: MIT

use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;

pub fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join("quiesce").join("quiesce.log"))
}

// ---------------- single-instance lock ----------------

fn lock_path() -> Result<PathBuf, String> {
    Ok(crate::ipc::runtime_dir()?.join("quiesce").join("quiesce.lock"))
}

/// Holding the returned listener keeps other daemons out. A stale socket
/// left by a crashed daemon is removed and re-bound.
pub fn acquire_single_instance_lock() -> Result<UnixListener, String> {
    let path = lock_path()?;
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    match UnixListener::bind(&path) {
        Ok(l) => Ok(l),
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => match UnixStream::connect(&path) {
            Ok(_) => Err(format!(
                "quiesce is already running (another instance holds {})",
                path.display()
            )),
            Err(_) => {
                let _ = std::fs::remove_file(&path);
                UnixListener::bind(&path)
                    .map_err(|e| format!("failed to bind instance lock {}: {e}", path.display()))
            }
        },
        Err(e) => Err(format!("failed to bind instance lock {}: {e}", path.display())),
    }
}
