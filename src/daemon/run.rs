// Author: Dustin Pilgrim
// License: MIT

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::core::host_msg::HostMsg;
use crate::{qinfo, qwarn};

use super::{AnyError, Daemon, Flow};

impl Daemon {
    pub async fn run(
        &mut self,
        mut shutdown: watch::Receiver<bool>,
        shutdown_tx: watch::Sender<bool>,
    ) -> Result<(), AnyError> {
        qinfo!("Daemon", "daemon starting");

        let (tx, mut rx) = mpsc::channel::<HostMsg>(256);

        if let Err(e) = crate::ipc::server::spawn_ipc_server(tx.clone()).await {
            qwarn!("Daemon", "ipc: failed to start: {}", e);
        }

        // Startup is complete once the control socket is up.
        self.handle_msg(HostMsg::Ready);

        let reactor = Arc::clone(&self.reactor);

        loop {
            let due = reactor.next_due().map(|(_, at)| reactor.instant_at(at));

            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        qinfo!("Daemon", "daemon stopping (shutdown requested)");
                        break;
                    }
                }

                maybe = rx.recv() => {
                    let Some(msg) = maybe else {
                        qinfo!("Daemon", "daemon stopping (message channel closed)");
                        break;
                    };

                    if self.handle_msg(msg) == Flow::Stop {
                        let _ = shutdown_tx.send(true);
                        break;
                    }
                }

                // A timer moved; recompute the deadline.
                _ = reactor.changed() => {}

                _ = async {
                    match due {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                } => {
                    self.dispatch_due_timers();
                }
            }
        }

        // Whatever ended the loop, no idle check may fire past this point.
        self.handle_msg(HostMsg::HostShutdown);

        crate::ipc::remove_socket();
        Ok(())
    }
}
