//! # TCP Socket Adapter
//!
//! [`ServerSocket`] wraps a non-blocking `std::net::TcpListener` so accept
//! can be bounded by a timeout and abandoned when shutdown is requested.
//! Accepted streams are handed to the dispatcher as [`TcpConnection`]s.
//! Both share one set of [`SocketCounters`].

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ag_04_transaction_dispatch::Connection;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::SocketConfig;
use crate::domain::ServerError;

/// Interval between non-blocking accept attempts.
const ACCEPT_POLL: Duration = Duration::from_millis(1);

/// Shortest read timeout handed to the OS; zero would mean "block forever".
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SocketState {
    Init,
    Open,
    Closed,
    Error,
}

impl fmt::Display for SocketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketState::Init => write!(f, "Init"),
            SocketState::Open => write!(f, "Open"),
            SocketState::Closed => write!(f, "Closed"),
            SocketState::Error => write!(f, "Error"),
        }
    }
}

/// Cumulative I/O counters for the listener and every connection it
/// accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SocketCounters {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub reads_attempted: u64,
    pub reads_completed: u64,
    pub total_read_time: Duration,
    pub writes_attempted: u64,
    pub writes_completed: u64,
    pub total_write_time: Duration,
    pub accept_attempts: u64,
    pub accept_successes: u64,
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn per_attempt(total: Duration, attempts: u64) -> f64 {
    if attempts == 0 {
        0.0
    } else {
        total.as_secs_f64() / attempts as f64
    }
}

impl SocketCounters {
    pub fn read_success_percent(&self) -> f64 {
        percent(self.reads_completed, self.reads_attempted)
    }

    pub fn write_success_percent(&self) -> f64 {
        percent(self.writes_completed, self.writes_attempted)
    }

    pub fn average_read_secs(&self) -> f64 {
        per_attempt(self.total_read_time, self.reads_attempted)
    }

    pub fn average_write_secs(&self) -> f64 {
        per_attempt(self.total_write_time, self.writes_attempted)
    }
}

/// Listening socket with bounded accept.
pub struct ServerSocket {
    config: SocketConfig,
    state: Mutex<SocketState>,
    listener: RwLock<Option<TcpListener>>,
    shutdown_requested: AtomicBool,
    counters: Arc<Mutex<SocketCounters>>,
}

impl ServerSocket {
    pub fn new(config: SocketConfig) -> Self {
        Self {
            config,
            state: Mutex::new(SocketState::Init),
            listener: RwLock::new(None),
            shutdown_requested: AtomicBool::new(false),
            counters: Arc::new(Mutex::new(SocketCounters::default())),
        }
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    pub fn state(&self) -> SocketState {
        *self.state.lock()
    }

    pub fn counters(&self) -> SocketCounters {
        self.counters.lock().clone()
    }

    /// Bind and listen.
    pub fn open(&self) -> Result<SocketAddr, ServerError> {
        let address = self.config.address();
        let socket_error = |source: io::Error| ServerError::Socket {
            address: address.clone(),
            source,
        };

        let bound = TcpListener::bind(address.as_str())
            .and_then(|listener| {
                listener.set_nonblocking(true)?;
                Ok(listener)
            })
            .and_then(|listener| Ok((listener.local_addr()?, listener)));

        match bound {
            Ok((local, listener)) => {
                *self.listener.write() = Some(listener);
                *self.state.lock() = SocketState::Open;
                self.shutdown_requested.store(false, Ordering::SeqCst);
                info!(address = %local, "Server socket listening");
                Ok(local)
            }
            Err(e) => {
                *self.state.lock() = SocketState::Error;
                error!(address = %address, error = %e, "Failed to open server socket");
                Err(socket_error(e))
            }
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener
            .read()
            .as_ref()
            .and_then(|listener| listener.local_addr().ok())
    }

    /// Make every pending and future accept return `Ok(None)` immediately.
    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Wait up to `timeout` for a connection. `Ok(None)` means nothing
    /// arrived, or shutdown was requested.
    pub fn accept(&self, timeout: Duration) -> io::Result<Option<TcpConnection>> {
        self.counters.lock().accept_attempts += 1;
        let deadline = Instant::now() + timeout;

        loop {
            if self.is_shutdown_requested() {
                return Ok(None);
            }

            let accepted = match self.listener.read().as_ref() {
                Some(listener) => listener.accept(),
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::NotConnected,
                        "server socket is not open",
                    ))
                }
            };

            match accepted {
                Ok((stream, peer)) => {
                    stream.set_nonblocking(false)?;
                    stream.set_nodelay(true)?;
                    self.counters.lock().accept_successes += 1;
                    debug!(peer = %peer, "Connection accepted");
                    return Ok(Some(TcpConnection {
                        stream,
                        peer: Some(peer.to_string()),
                        counters: Arc::clone(&self.counters),
                    }));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Ok(None);
                    }
                    thread::sleep(ACCEPT_POLL);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Drop the listener.
    pub fn close(&self) {
        self.request_shutdown();
        if self.listener.write().take().is_some() {
            info!(address = %self.config.address(), "Server socket closed");
        }
        let mut state = self.state.lock();
        if *state != SocketState::Error {
            *state = SocketState::Closed;
        }
    }
}

/// One accepted client connection.
pub struct TcpConnection {
    stream: TcpStream,
    peer: Option<String>,
    counters: Arc<Mutex<SocketCounters>>,
}

impl TcpConnection {
    /// Shut down both directions. The descriptor itself closes on drop.
    pub fn close(self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }
}

impl Connection for TcpConnection {
    fn receive_chunk(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        self.stream
            .set_read_timeout(Some(timeout.max(MIN_READ_TIMEOUT)))?;

        let timer = Instant::now();
        let result = self.stream.read(buf);
        let elapsed = timer.elapsed();

        let mut counters = self.counters.lock();
        counters.reads_attempted += 1;
        counters.total_read_time += elapsed;
        match result {
            Ok(0) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by peer",
            )),
            Ok(read) => {
                counters.reads_completed += 1;
                counters.bytes_received += read as u64;
                Ok(read)
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    fn send(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let timer = Instant::now();
        let result = self.stream.write_all(bytes).and_then(|_| self.stream.flush());
        let elapsed = timer.elapsed();

        let mut counters = self.counters.lock();
        counters.writes_attempted += 1;
        counters.total_write_time += elapsed;
        result.map(|_| {
            counters.writes_completed += 1;
            counters.bytes_sent += bytes.len() as u64;
            bytes.len()
        })
    }

    fn peer(&self) -> Option<String> {
        self.peer.clone()
    }
}
