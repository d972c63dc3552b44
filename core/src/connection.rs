//! The accept loop and per-connection request handling.
//!
//! # Design
//! One thread, one connection at a time. The listener is non-blocking so the
//! loop can notice a stop request between accept attempts; accepted sockets
//! are switched back to blocking I/O bounded by the configured timeout. Each
//! connection carries exactly one request and is closed after the response.
//! The receive buffer is allocated once per loop and reused for every
//! connection.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use tracing::{debug, trace, warn};

use crate::config::ServerConfig;
use crate::host::DebugHost;
use crate::http::Request;
use crate::router::Router;

/// Counters since the server started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStats {
    pub connections_accepted: u64,
    pub requests_dispatched: u64,
    /// Connections closed without a response because the request line was
    /// unreadable.
    pub malformed_dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicU64,
    dispatched: AtomicU64,
    malformed: AtomicU64,
}

/// State shared between the owning `BridgeServer` and the loop thread.
pub(crate) struct Shared {
    pub(crate) running: AtomicBool,
    pub(crate) listener: Mutex<Option<TcpListener>>,
    pub(crate) config: ServerConfig,
    router: Router,
    host: Arc<dyn DebugHost>,
    counters: Counters,
}

impl Shared {
    pub(crate) fn new(config: ServerConfig, host: Arc<dyn DebugHost>, listener: TcpListener) -> Self {
        Self {
            running: AtomicBool::new(false),
            listener: Mutex::new(Some(listener)),
            config,
            router: Router::new(),
            host,
            counters: Counters::default(),
        }
    }

    pub(crate) fn stats(&self) -> ServerStats {
        ServerStats {
            connections_accepted: self.counters.accepted.load(Ordering::Relaxed),
            requests_dispatched: self.counters.dispatched.load(Ordering::Relaxed),
            malformed_dropped: self.counters.malformed.load(Ordering::Relaxed),
        }
    }

    /// Close the listening socket. Later accept attempts see no listener.
    pub(crate) fn close_listener(&self) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(listener);
    }
}

/// Serve connections until the running flag is cleared.
pub(crate) fn run_loop(shared: &Shared) {
    let idle = shared.config.poll_interval();
    let mut buffer = vec![0u8; shared.config.max_request_size];
    while shared.running.load(Ordering::Acquire) {
        match accept(shared) {
            Ok(Some((stream, peer))) => {
                shared.counters.accepted.fetch_add(1, Ordering::Relaxed);
                trace!(%peer, "accepted");
                if let Err(err) = serve_connection(shared, stream, &mut buffer) {
                    debug!(%peer, error = %err, "connection failed");
                }
            }
            Ok(None) => thread::sleep(idle),
            Err(err) => {
                warn!(error = %err, "accept failed");
                thread::sleep(idle);
            }
        }
    }
    debug!("accept loop exited");
}

/// One non-blocking accept; the listener lock is released before returning.
fn accept(shared: &Shared) -> io::Result<Option<(TcpStream, SocketAddr)>> {
    let guard = shared
        .listener
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let Some(listener) = guard.as_ref() else {
        return Ok(None);
    };
    match listener.accept() {
        Ok(pair) => Ok(Some(pair)),
        Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(None),
        Err(err) => Err(err),
    }
}

/// Read one request, dispatch it and write the response.
///
/// A request whose line cannot be parsed gets no response at all; the
/// socket is simply closed.
fn serve_connection(shared: &Shared, mut stream: TcpStream, buffer: &mut [u8]) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    let timeout = shared.config.read_timeout();
    stream.set_read_timeout(timeout)?;
    stream.set_write_timeout(timeout)?;

    // a single receive; anything beyond the buffer is ignored
    let len = stream.read(buffer)?;

    let Some(request) = Request::parse(&buffer[..len]) else {
        shared.counters.malformed.fetch_add(1, Ordering::Relaxed);
        debug!(bytes = len, "malformed request dropped");
        return Ok(());
    };

    let response = shared.router.dispatch(shared.host.as_ref(), &request);
    shared.counters.dispatched.fetch_add(1, Ordering::Relaxed);

    stream.write_all(&response.render())?;
    stream.flush()?;
    // the peer may already be gone
    let _ = stream.shutdown(Shutdown::Write);
    Ok(())
}
