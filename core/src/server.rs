//! Start/stop of the bridge server.
//!
//! # Design
//! `BridgeServer` is the single owner of everything the bridge runs: the
//! bound listener, the running flag and the loop thread. Binding happens in
//! `start`, on the caller's thread, so a port conflict comes back as an
//! error instead of a log line. `stop` never blocks longer than the join
//! timeout; a loop thread stuck in a slow request is detached.

use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::connection::{self, ServerStats, Shared};
use crate::error::ServerError;
use crate::host::DebugHost;

const THREAD_NAME: &str = "dbgbridge-server";

/// How a `stop` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The loop thread exited and was joined.
    Stopped,
    /// The loop thread did not exit within the join timeout and was left
    /// running detached.
    Abandoned,
}

impl StopOutcome {
    pub fn is_stopped(self) -> bool {
        self == StopOutcome::Stopped
    }
}

/// Signals loop exit when dropped, including on unwind.
///
/// A loop that ends while still marked running did not exit through `stop`;
/// the flag is cleared and the listener closed so clients are refused
/// instead of queuing unanswered.
struct ExitSignal {
    shared: Arc<Shared>,
    exited: Sender<()>,
}

impl Drop for ExitSignal {
    fn drop(&mut self) {
        if self.shared.running.swap(false, Ordering::AcqRel) {
            error!("accept loop ended unexpectedly, server is no longer running");
            self.shared.close_listener();
        }
        let _ = self.exited.send(());
    }
}

/// A running bridge. Dropping it stops the server.
pub struct BridgeServer {
    shared: Arc<Shared>,
    local_addr: SocketAddr,
    thread: Option<JoinHandle<()>>,
    exited: Option<Receiver<()>>,
}

impl BridgeServer {
    /// Bind `127.0.0.1:<port>` and start serving `host` on a new thread.
    pub fn start(config: ServerConfig, host: Arc<dyn DebugHost>) -> Result<Self, ServerError> {
        config.validate()?;

        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, config.port));
        let listener =
            TcpListener::bind(addr).map_err(|source| ServerError::Bind { addr, source })?;
        listener.set_nonblocking(true).map_err(ServerError::Listener)?;
        let local_addr = listener.local_addr().map_err(ServerError::Listener)?;

        let shared = Arc::new(Shared::new(config, host, listener));
        shared.running.store(true, Ordering::Release);

        let (exit_tx, exit_rx) = mpsc::channel();
        let loop_state = Arc::clone(&shared);
        let spawned = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                let signal = ExitSignal {
                    shared: loop_state,
                    exited: exit_tx,
                };
                connection::run_loop(&signal.shared);
            });
        let thread = match spawned {
            Ok(thread) => thread,
            Err(err) => {
                shared.running.store(false, Ordering::Release);
                shared.close_listener();
                return Err(ServerError::Spawn(err));
            }
        };

        info!(addr = %local_addr, "bridge server listening");
        Ok(Self {
            shared,
            local_addr,
            thread: Some(thread),
            exited: Some(exit_rx),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The bound port; differs from the configured one when that was `0`.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_some() && self.shared.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> ServerStats {
        self.shared.stats()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    /// Stop accepting, close the listener and wait for the loop thread.
    ///
    /// A request already being served is allowed to finish. Calling `stop`
    /// again is a no-op that reports `Stopped`.
    pub fn stop(&mut self) -> StopOutcome {
        let Some(thread) = self.thread.take() else {
            return StopOutcome::Stopped;
        };
        self.shared.running.store(false, Ordering::Release);
        self.shared.close_listener();

        let timeout = self.shared.config.join_timeout();
        let exited = match self.exited.take() {
            Some(rx) => !matches!(rx.recv_timeout(timeout), Err(RecvTimeoutError::Timeout)),
            None => true,
        };

        if exited {
            if thread.join().is_err() {
                warn!("bridge server thread panicked");
            }
            info!(addr = %self.local_addr, "bridge server stopped");
            StopOutcome::Stopped
        } else {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "bridge server thread did not exit in time, detaching"
            );
            StopOutcome::Abandoned
        }
    }
}

impl Drop for BridgeServer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for BridgeServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeServer")
            .field("local_addr", &self.local_addr)
            .field("running", &self.is_running())
            .finish()
    }
}
