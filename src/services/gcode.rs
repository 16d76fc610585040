// Author: Dustin Pilgrim
// License: MIT

use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::core::error::ScriptError;
use crate::core::script::ScriptExecutor;
use crate::qdebug;

pub const DEFAULT_SCRIPT_COMMAND: &str = "cat > /dev/null";
pub const DEFAULT_SCRIPT_TIMEOUT: f64 = 30.0;
const POLL_INTERVAL: Duration = Duration::from_millis(10);
const STDERR_GRACE: Duration = Duration::from_millis(200);

/// Hands the rendered script to a shell command on stdin, e.g. a pipe into
/// the printer's G-code port.
#[derive(Debug, Clone)]
pub struct ShellScriptExecutor {
    command: String,
    timeout: Duration,
}

impl ShellScriptExecutor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: Duration::from_secs_f64(DEFAULT_SCRIPT_TIMEOUT),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ShellScriptExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_SCRIPT_COMMAND)
    }
}

impl ScriptExecutor for ShellScriptExecutor {
    fn execute(&self, script: &str) -> Result<(), ScriptError> {
        qdebug!("Gcode", "piping {} byte script into: {}", script.len(), self.command);

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ScriptError::Spawn(e.to_string()))?;

        // Both pipes are serviced off this thread so a command that never
        // reads stdin (or floods stderr) cannot outlive the deadline.
        if let Some(mut stdin) = child.stdin.take() {
            let mut body = script.to_string();
            if !body.ends_with('\n') {
                body.push('\n');
            }
            thread::spawn(move || {
                // A command that ignores stdin closes the pipe early; its
                // exit status decides success.
                let _ = stdin.write_all(body.as_bytes());
            });
        }

        let (err_tx, err_rx) = mpsc::channel();
        if let Some(mut pipe) = child.stderr.take() {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf);
                let _ = err_tx.send(buf);
            });
        }

        let deadline = Instant::now().checked_add(self.timeout);
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if deadline.is_some_and(|d| Instant::now() >= d) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ScriptError::Failed {
                        code: None,
                        stderr: format!("timed out after {:.1}s", self.timeout.as_secs_f64()),
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(ScriptError::Spawn(e.to_string())),
            }
        };

        if status.success() {
            return Ok(());
        }

        // A background process of the command may still hold stderr open.
        let stderr = err_rx.recv_timeout(STDERR_GRACE).unwrap_or_default();

        Err(ScriptError::Failed {
            code: status.code(),
            stderr: stderr.trim().to_string(),
        })
    }
}
