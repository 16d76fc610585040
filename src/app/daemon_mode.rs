// Author: Dustin Pilgrim
// License: MIT

use std::io;

use crate::cli::Args;
use crate::daemon::Daemon;
use crate::log::{self, LogLevel};
use crate::{qdebug, qerror, qinfo};

type AnyError = Box<dyn std::error::Error + Send + Sync>;

fn init_logging(verbose: bool) {
    if verbose {
        log::enable_console_output(true);
        log::set_log_level(LogLevel::Debug);
        qdebug!("Quiesce", "debug logging enabled");
    } else {
        log::enable_console_output(false);
        log::set_log_level(LogLevel::Info);
    }

    let Some(path) = crate::app::platform::default_log_path() else {
        return;
    };

    let file = crate::log_file::LogFile::new(&path);
    if let Err(e) = file.begin_run() {
        qerror!("Quiesce", "failed to prepare log file {}: {}", path.display(), e);
        return;
    }

    if let Err(e) = log::enable_file_output(file.path()) {
        qerror!("Quiesce", "failed to enable file logging: {}", e);
        return;
    }

    qinfo!("Quiesce", "file logging enabled: {}", path.display());
}

pub async fn run(args: Args) -> Result<(), AnyError> {
    // single-instance
    let _instance_lock = crate::app::platform::acquire_single_instance_lock().map_err(|e| {
        eprintln!("quiesce: {e}");
        io::Error::new(io::ErrorKind::AlreadyExists, e)
    })?;

    init_logging(args.verbose);
    qinfo!("Quiesce", "quiesce starting");

    let cfg = crate::config::load_config(args.config.as_deref()).map_err(|e| {
        qerror!("Quiesce", "{:#}", e);
        io::Error::new(io::ErrorKind::InvalidData, format!("{e:#}"))
    })?;

    qdebug!(
        "Quiesce",
        "config: timeout={:.2}s, gcode={:?}, script_command={:?}, lookahead_flush={:.3}s",
        cfg.idle.idle_timeout,
        cfg.idle.gcode.source(),
        cfg.script_command,
        cfg.lookahead_flush
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let mut daemon = Daemon::new(cfg).map_err(|e| {
        qerror!("Quiesce", "{}", e);
        Box::new(e) as AnyError
    })?;

    let mut daemon_task = tokio::spawn({
        let shutdown_tx = shutdown_tx.clone();
        async move { daemon.run(shutdown_rx, shutdown_tx).await }
    });

    tokio::select! {
        res = &mut daemon_task => {
            match res {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e),
                Err(join_err) => Err(Box::new(join_err) as AnyError),
            }
        }

        _ = tokio::signal::ctrl_c() => {
            qinfo!("Quiesce", "received Ctrl+C, shutting down");
            let _ = shutdown_tx.send(true);

            match daemon_task.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e),
                Err(join_err) => Err(Box::new(join_err)),
            }
        }
    }
}
