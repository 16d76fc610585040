// Author: Dustin Pilgrim
// License: MIT

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Size-capped daemon log with numbered backups (`quiesce.log.1` is newest).
#[derive(Debug, Clone)]
pub struct LogFile {
    path: PathBuf,
    max_bytes: u64,
    keep_backups: u32,
}

impl LogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_bytes: 4 * 1024 * 1024,
            keep_backups: 3,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rotates an oversized log, then marks the start of this run.
    ///
    /// Runs appended to an existing log are separated by a blank line.
    pub fn begin_run(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let len = match fs::metadata(&self.path) {
            Ok(m) => m.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e),
        };

        let mut header = String::new();
        if len >= self.max_bytes {
            self.rotate();
        } else if len > 0 {
            header.push('\n');
        }

        header.push_str(&format!(
            "---- quiesce {} started (pid {}) ----\n",
            env!("CARGO_PKG_VERSION"),
            std::process::id()
        ));

        let mut f = OpenOptions::new().create(true).append(true).open(&self.path)?;
        f.write_all(header.as_bytes())?;
        f.flush()
    }

    fn backup(&self, n: u32) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }

    fn rotate(&self) {
        if self.keep_backups == 0 {
            let _ = fs::remove_file(&self.path);
            return;
        }

        for n in (1..self.keep_backups).rev() {
            let from = self.backup(n);
            if from.exists() {
                let _ = fs::rename(&from, self.backup(n + 1));
            }
        }
        let _ = fs::rename(&self.path, self.backup(1));
    }
}
