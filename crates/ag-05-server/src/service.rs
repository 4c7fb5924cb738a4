//! # Server Service
//!
//! Owns the listening socket, a manager thread and a pool of connection
//! workers. Workers accept one connection at a time and hand it to the
//! transaction dispatcher; the manager keeps the pool between its bounds,
//! rolls the per-second tracking window and drains the console buffer.
//!
//! Counters are split across independent locks (errors, metrics, tracking,
//! connection slots) so workers recording one never wait on another.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ag_02_thread_pool::{
    PoolError, Signal, ThreadPool, ThreadState, ThreadStatus, WorkerContext, WorkerId,
};
use ag_04_transaction_dispatch::{Connection, TransactionDispatcher, TransactionError};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::adapters::{ConsoleBuffer, PacketRecorder, ServerSocket, SocketState};
use crate::config::{PacketDumpOptions, ServerConfig, SocketConfig, ThreadPoolOptions};
use crate::domain::{
    ServerError, ServerErrorCounts, ServerErrorKind, ServerMetrics, ServerState,
    ServerStatusEntry, TrackingWindow, TRACKING_WINDOW,
};

/// Manager cycle: 128 naps of 1 ms.
const MANAGER_NAP_INCREMENT: Duration = Duration::from_millis(1);
const MANAGER_NAP_INCREMENTS: u32 = 128;

const TRACKING_INTERVAL: Duration = Duration::from_secs(1);

/// Grow when at least this share of live workers is busy.
const GROW_RATIO: f64 = 0.85;
/// Retire an idle worker when less than this share is busy.
const SHRINK_RATIO: f64 = 0.35;

/// Pause between shutdown steps so in-flight accepts notice the request.
const STOP_SETTLE: Duration = Duration::from_millis(8);

/// Worker back-off when there is nothing to accept from.
const IDLE_NAP: Duration = Duration::from_millis(1);
const IDLE_NAPS: u32 = 8;

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

fn build_date() -> &'static str {
    option_env!("AG_BUILD_DATE").unwrap_or("unknown")
}

struct ServerShared {
    config: RwLock<ServerConfig>,
    state: Arc<Mutex<ServerState>>,
    started_at: Mutex<Option<Instant>>,
    socket: RwLock<Arc<ServerSocket>>,
    dispatcher: RwLock<Option<Arc<TransactionDispatcher>>>,
    recorder: RwLock<Option<Arc<PacketRecorder>>>,
    errors: Mutex<ServerErrorCounts>,
    metrics: Mutex<ServerMetrics>,
    tracking: Mutex<TrackingWindow>,
    /// Peer address per worker currently holding a connection.
    connections: Mutex<HashMap<WorkerId, String>>,
    console: ConsoleBuffer,
    workers: ThreadPool,
    manager: ThreadPool,
}

impl ServerShared {
    fn state(&self) -> ServerState {
        *self.state.lock()
    }

    fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }

    fn name(&self) -> String {
        self.config.read().name.clone()
    }

    fn require(&self, required: ServerState) -> Result<(), ServerError> {
        let state = self.state();
        if state == required {
            Ok(())
        } else {
            Err(ServerError::InvalidState { state, required })
        }
    }

    /// Move from `expected` to `next`, failing if another caller moved the
    /// server first.
    fn advance(&self, expected: ServerState, next: ServerState) -> Result<(), ServerError> {
        let mut state = self.state.lock();
        if *state != expected || !expected.can_transition_to(next) {
            return Err(ServerError::InvalidState {
                state: *state,
                required: expected,
            });
        }
        *state = next;
        drop(state);
        info!(server = %self.name(), from = %expected, to = %next, "Server state changed");
        Ok(())
    }

    fn socket(&self) -> Arc<ServerSocket> {
        Arc::clone(&*self.socket.read())
    }

    fn record_error(&self, kind: ServerErrorKind) {
        self.errors.lock().record(kind);
    }

    fn record_transaction(&self, timing: Duration) {
        self.metrics.lock().record_transaction(timing);
        self.tracking.lock().record(timing);
    }

    /// Busy share of the live workers.
    fn load_ratio(&self) -> f64 {
        let current = self.workers.current_thread_count();
        if current == 0 {
            0.0
        } else {
            self.workers.active_thread_count() as f64 / current as f64
        }
    }

    fn worker_required(&self) -> bool {
        let threads = self.config.read().threads.clone();
        let live = self.workers.current_thread_count();
        live < threads.min_threads
            || (live < threads.max_threads && self.load_ratio() >= GROW_RATIO)
    }

    fn spawn_worker(self: &Arc<Self>) -> Result<WorkerId, ServerError> {
        let dispatcher = self
            .dispatcher
            .read()
            .clone()
            .ok_or(ServerError::MissingTransactionManager)?;
        let socket = self.socket();
        let accept_timeout = self.config.read().accept_timeout;
        let shared = Arc::clone(self);

        let id = self.workers.spawn(move |context: &WorkerContext| {
            shared.serve_once(context, &socket, &dispatcher, accept_timeout)
        })?;
        debug!(worker = id, "Server worker spawned");
        Ok(id)
    }

    /// Spawn workers until the pool no longer needs one.
    fn grow_pool(self: &Arc<Self>) -> Result<usize, ServerError> {
        let mut spawned = 0;
        while self.is_running() && self.worker_required() {
            self.spawn_worker()?;
            spawned += 1;
        }
        Ok(spawned)
    }

    /// Ask one idle worker to quit when the pool is oversized and quiet.
    fn retire_idle_worker(&self) -> Result<Option<WorkerId>, ServerError> {
        let threads = self.config.read().threads.clone();
        if !threads.shrink_enabled
            || self.workers.current_thread_count() <= threads.min_threads
            || self.load_ratio() >= SHRINK_RATIO
        {
            return Ok(None);
        }

        let idle = self.workers.snapshot().into_iter().find(|worker| {
            worker.state == ThreadState::Running
                && worker.status == ThreadStatus::Napping
                && worker.signal == Signal::Ok
        });
        let Some(worker) = idle else {
            return Ok(None);
        };

        self.workers.signal(worker.id, Signal::Quit)?;
        debug!(worker = worker.id, "Retiring idle server worker");
        Ok(Some(worker.id))
    }

    /// Unrecoverable pool failure: stop accepting, stop workers, go to
    /// `Error`.
    fn fail(&self, cause: &ServerError) {
        error!(server = %self.name(), error = %cause, "Critical server failure");
        self.socket().request_shutdown();
        {
            let mut state = self.state.lock();
            if state.can_transition_to(ServerState::Error) {
                *state = ServerState::Error;
            }
        }
        if let Err(e) = self.workers.shutdown() {
            error!(error = %e, "Failed to stop server workers");
        }
        self.connections.lock().clear();
    }

    /// One manager iteration.
    fn manage_once(self: &Arc<Self>, context: &WorkerContext, last_shift: &Mutex<Instant>) {
        context.set_status(ThreadStatus::Busy);

        {
            let mut last = last_shift.lock();
            if last.elapsed() >= TRACKING_INTERVAL {
                self.tracking.lock().shift();
                *last = Instant::now();
            }
        }

        self.workers.reap();

        if self.is_running() {
            let rebalanced = self
                .grow_pool()
                .and_then(|_| self.retire_idle_worker().map(|_| ()));
            if let Err(e) = rebalanced {
                self.fail(&e);
            }
        }

        self.console.drain_to_log();

        context.set_status(ThreadStatus::Napping);
        context.nap(MANAGER_NAP_INCREMENT, MANAGER_NAP_INCREMENTS);
    }

    /// One worker iteration: accept a connection and run transactions on it
    /// until the handler lets it go.
    fn serve_once(
        &self,
        context: &WorkerContext,
        socket: &ServerSocket,
        dispatcher: &TransactionDispatcher,
        accept_timeout: Duration,
    ) {
        context.set_status(ThreadStatus::Napping);

        if !self.is_running() || socket.is_shutdown_requested() {
            context.nap(IDLE_NAP, IDLE_NAPS);
            return;
        }

        let mut connection = match socket.accept(accept_timeout) {
            Ok(Some(connection)) => connection,
            Ok(None) => return,
            Err(e) => {
                if !socket.is_shutdown_requested() {
                    warn!(worker = context.id(), error = %e, "Failed to accept connection");
                    self.record_error(ServerErrorKind::SocketAccept);
                }
                context.nap(IDLE_NAP, IDLE_NAPS);
                return;
            }
        };

        context.set_status(ThreadStatus::Busy);
        if let Some(peer) = connection.peer() {
            self.connections.lock().insert(context.id(), peer);
        }

        // A kept-open connection ends when the client goes quiet. That final
        // receive timeout is neither a transaction nor a server error here,
        // though the dispatcher's own error table still counts it.
        let mut served: u64 = 0;
        loop {
            let timer = Instant::now();
            let result = dispatcher.execute(&mut connection);

            match result {
                Err(TransactionError::Timeout) if served > 0 => break,
                Err(kind) => {
                    self.record_transaction(timer.elapsed());
                    self.record_error(ServerErrorKind::from(kind));
                    break;
                }
                Ok(outcome) => {
                    self.record_transaction(timer.elapsed());
                    served += 1;
                    if !outcome.keep_open || !(context.should_run() && self.is_running()) {
                        break;
                    }
                }
            }
        }

        if let Err(e) = connection.close() {
            debug!(worker = context.id(), error = %e, "Failed to close connection");
            self.record_error(ServerErrorKind::SocketClose);
        }
        self.connections.lock().remove(&context.id());
        context.set_status(ThreadStatus::Napping);
    }
}

/// Threaded TCP server hosting a [`TransactionDispatcher`].
pub struct Server {
    shared: Arc<ServerShared>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let socket = ServerSocket::new(config.socket.clone());
        let workers = ThreadPool::with_policy("server-worker", config.stop_policy.clone());
        let manager = ThreadPool::with_policy("server-manager", config.stop_policy.clone());

        Ok(Self {
            shared: Arc::new(ServerShared {
                config: RwLock::new(config),
                state: Arc::new(Mutex::new(ServerState::Init)),
                started_at: Mutex::new(None),
                socket: RwLock::new(Arc::new(socket)),
                dispatcher: RwLock::new(None),
                recorder: RwLock::new(None),
                errors: Mutex::new(ServerErrorCounts::default()),
                metrics: Mutex::new(ServerMetrics::default()),
                tracking: Mutex::new(TrackingWindow::default()),
                connections: Mutex::new(HashMap::new()),
                console: ConsoleBuffer::new(),
                workers,
                manager,
            }),
        })
    }

    pub fn name(&self) -> String {
        self.shared.name()
    }

    pub fn config(&self) -> ServerConfig {
        self.shared.config.read().clone()
    }

    pub fn state(&self) -> ServerState {
        self.shared.state()
    }

    // =========================================================================
    // Configuration (Init only)
    // =========================================================================

    pub fn set_socket_options(&self, socket: SocketConfig) -> Result<(), ServerError> {
        self.shared.require(ServerState::Init)?;
        socket.validate()?;
        *self.shared.socket.write() = Arc::new(ServerSocket::new(socket.clone()));
        self.shared.config.write().socket = socket;
        Ok(())
    }

    pub fn set_thread_pool_options(&self, threads: ThreadPoolOptions) -> Result<(), ServerError> {
        self.shared.require(ServerState::Init)?;
        threads.validate()?;
        self.shared.config.write().threads = threads;
        Ok(())
    }

    /// Attach the dispatcher that handles every accepted connection. Packet
    /// recording already enabled in the configuration is wired up here.
    pub fn set_transaction_manager(
        &self,
        dispatcher: Arc<TransactionDispatcher>,
    ) -> Result<(), ServerError> {
        self.shared.require(ServerState::Init)?;
        *self.shared.dispatcher.write() = Some(dispatcher);

        let packets = self.shared.config.read().packets.clone();
        if packets.enabled {
            self.install_packet_recorder(&packets)?;
        }
        Ok(())
    }

    pub fn transaction_manager(&self) -> Option<Arc<TransactionDispatcher>> {
        self.shared.dispatcher.read().clone()
    }

    /// Configure packet recording and register (or remove) the recorder as
    /// the dispatcher's packet dump. Requires a transaction manager.
    pub fn set_dump_packets_options(&self, packets: PacketDumpOptions) -> Result<(), ServerError> {
        self.shared.require(ServerState::Init)?;
        packets.validate()?;

        if packets.enabled {
            self.install_packet_recorder(&packets)?;
        } else {
            let dispatcher = self
                .transaction_manager()
                .ok_or(ServerError::MissingTransactionManager)?;
            dispatcher.clear_packet_dump();
            *self.shared.recorder.write() = None;
        }
        self.shared.config.write().packets = packets;
        Ok(())
    }

    fn install_packet_recorder(&self, packets: &PacketDumpOptions) -> Result<(), ServerError> {
        let dispatcher = self
            .transaction_manager()
            .ok_or(ServerError::MissingTransactionManager)?;
        let recorder = Arc::new(PacketRecorder::new(packets)?);

        let sink = Arc::clone(&recorder);
        let state = Arc::clone(&self.shared.state);
        dispatcher.set_packet_dump(move |bytes: &[u8]| {
            if *state.lock() != ServerState::Running {
                return;
            }
            if let Err(e) = sink.record(bytes) {
                warn!(error = %e, "Failed to record packet");
            }
        });

        *self.shared.recorder.write() = Some(recorder);
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Bind the socket, fill the pool to its minimum and start the manager.
    pub fn start(&self) -> Result<SocketAddr, ServerError> {
        let shared = &self.shared;
        shared.require(ServerState::Init)?;
        if shared.dispatcher.read().is_none() {
            return Err(ServerError::MissingTransactionManager);
        }

        let address = match shared.socket().open() {
            Ok(address) => address,
            Err(e) => {
                shared.advance(ServerState::Init, ServerState::Error)?;
                return Err(e);
            }
        };

        *shared.started_at.lock() = Some(Instant::now());
        shared.advance(ServerState::Init, ServerState::Running)?;

        if let Err(e) = shared.grow_pool() {
            shared.fail(&e);
            return Err(e);
        }

        let manager_shared = Arc::clone(shared);
        let last_shift = Mutex::new(Instant::now());
        if let Err(e) = shared.manager.spawn(move |context: &WorkerContext| {
            manager_shared.manage_once(context, &last_shift)
        }) {
            let e = ServerError::from(e);
            shared.fail(&e);
            return Err(e);
        }

        info!(
            server = %shared.name(),
            address = %address,
            workers = shared.workers.current_thread_count(),
            "Server started"
        );
        Ok(address)
    }

    /// Stop accepting, stop the manager, then quit and stop every worker.
    /// The pool is empty afterwards even if some worker had to be abandoned.
    pub fn stop(&self) -> Result<(), ServerError> {
        let shared = &self.shared;
        shared.advance(ServerState::Running, ServerState::Shutdown)?;

        let socket = shared.socket();
        socket.request_shutdown();

        let mut failure: Option<PoolError> = None;
        if let Err(e) = shared.manager.shutdown() {
            failure.get_or_insert(e);
        }

        thread::sleep(STOP_SETTLE);
        for worker in shared.workers.snapshot() {
            if worker.state == ThreadState::Running {
                match shared.workers.signal(worker.id, Signal::Quit) {
                    Ok(()) => {}
                    // Exited between the snapshot and the signal.
                    Err(PoolError::NotRunning { .. } | PoolError::UnknownWorker { .. }) => {}
                    Err(e) => {
                        warn!(worker = worker.id, error = %e, "Failed to signal server worker");
                    }
                }
            }
        }
        thread::sleep(STOP_SETTLE);

        if let Err(e) = shared.workers.shutdown() {
            failure.get_or_insert(e);
        }
        shared.connections.lock().clear();
        socket.close();

        match failure {
            Some(e) => {
                error!(server = %shared.name(), error = %e, "Server stopped with errors");
                shared.advance(ServerState::Shutdown, ServerState::Error)?;
                Err(e.into())
            }
            None => {
                shared.advance(ServerState::Shutdown, ServerState::Stopped)?;
                Ok(())
            }
        }
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.shared.socket().local_addr()
    }

    pub fn socket_state(&self) -> SocketState {
        self.shared.socket().state()
    }

    /// Buffer handlers may write to; drained into the log by the manager.
    pub fn console(&self) -> ConsoleBuffer {
        self.shared.console.clone()
    }

    /// Workers tracked by the pool, including retiring ones.
    pub fn pool_size(&self) -> usize {
        self.shared.workers.pool_size()
    }

    pub fn current_thread_count(&self) -> usize {
        self.shared.workers.current_thread_count()
    }

    pub fn active_thread_count(&self) -> usize {
        self.shared.workers.active_thread_count()
    }

    pub fn error_counts(&self) -> ServerErrorCounts {
        self.shared.errors.lock().clone()
    }

    pub fn metrics(&self) -> ServerMetrics {
        *self.shared.metrics.lock()
    }

    pub fn tracking(&self) -> TrackingWindow {
        self.shared.tracking.lock().clone()
    }

    pub fn uptime(&self) -> Duration {
        self.shared
            .started_at
            .lock()
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    /// Snapshot every counter as `{key, name, value, description}`. Only
    /// available while running.
    pub fn get_status(&self) -> Result<Vec<ServerStatusEntry>, ServerError> {
        let shared = &self.shared;
        shared.require(ServerState::Running)?;

        let mut status = StatusBuilder::default();
        self.server_status(&mut status);
        self.thread_status(&mut status);
        self.packet_status(&mut status);
        self.dispatcher_status(&mut status);
        self.socket_status(&mut status);
        Ok(status.entries)
    }

    fn server_status(&self, status: &mut StatusBuilder) {
        let shared = &self.shared;
        status.push(
            "serverState",
            "Server State",
            shared.state(),
            "The current state of the server.",
        );
        status.push(
            "serverVersion",
            "Server Version",
            SERVER_VERSION,
            "The current version of the server.",
        );
        status.push(
            "serverBuildDate",
            "Server Build Date",
            build_date(),
            "The build date of the server.",
        );
        status.push(
            "serverUpTime",
            "Server Up Time",
            format!("{:.6}", self.uptime().as_secs_f64()),
            "The amount of time the server has been running in seconds.",
        );
        status.push(
            "serverName",
            "Server Name",
            shared.name(),
            "The name of the server instance.",
        );

        for (kind, count) in shared.errors.lock().iter() {
            status.push(
                kind.key(),
                format!("{} Errors", kind.name()),
                count,
                "An error tracked by the server instance.",
            );
        }

        let metrics = *shared.metrics.lock();
        for (label, metric) in [("Total", metrics.total), ("Transaction", metrics.transaction)] {
            status.push(
                format!("metric{label}Count"),
                format!("Metric {label} Count"),
                metric.count,
                "A total count metric tracked by the server instance.",
            );
            status.push(
                format!("metric{label}Timing"),
                format!("Metric {label} Timing"),
                format!("{:.6}", metric.timing.as_secs_f64()),
                "A total timing metric tracked by the server instance.",
            );
            status.push(
                format!("metric{label}Avg"),
                format!("Metric {label} Average"),
                format!("{:.6}", metric.average_secs()),
                "An averaged performance metric tracked by the server instance.",
            );
        }

        let tracking = shared.tracking.lock().clone();
        status.push(
            "metricTransactionRunningAverageCount",
            "Metric Transaction Running Average Count",
            tracking.count_average() as u64,
            format!("A {TRACKING_WINDOW}-second running average count metric, per-second."),
        );
        status.push(
            "metricTransactionRunningAverageTiming",
            "Metric Transaction Running Average Timing",
            format!("{:.6}", tracking.timing_average()),
            format!("A {TRACKING_WINDOW}-second running average timing metric, per-second."),
        );
    }

    fn thread_status(&self, status: &mut StatusBuilder) {
        let connections = self.shared.connections.lock().clone();
        for (slot, worker) in self.shared.workers.snapshot().iter().enumerate() {
            status.push(
                format!("thread{slot:03}State"),
                format!("Thread {slot:03} State"),
                worker.state,
                format!("The current state for server thread {slot:03}."),
            );
            status.push(
                format!("thread{slot:03}Status"),
                format!("Thread {slot:03} Status"),
                worker.status,
                format!("The current status for server thread {slot:03}."),
            );
            status.push(
                format!("thread{slot:03}Signal"),
                format!("Thread {slot:03} Signal"),
                worker.signal,
                format!("The current signal for server thread {slot:03}."),
            );
            status.push(
                format!("thread{slot:03}Id"),
                format!("Thread {slot:03} ID"),
                worker.id,
                format!("The thread ID for server thread {slot:03}."),
            );
            status.push(
                format!("thread{slot:03}Connection"),
                format!("Thread {slot:03} Connection"),
                connections
                    .get(&worker.id)
                    .map(String::as_str)
                    .unwrap_or("n/a"),
                format!("The current client-connection address for server thread {slot:03}."),
            );
        }
    }

    fn packet_status(&self, status: &mut StatusBuilder) {
        let packets = self.shared.config.read().packets.clone();
        let next_uid = self
            .shared
            .recorder
            .read()
            .as_ref()
            .map(|recorder| recorder.next_uid())
            .unwrap_or(0);

        status.push(
            "packetsIsEnabled",
            "Packets Is Enabled",
            packets.enabled,
            "Whether the server packet-recording system is enabled.",
        );
        status.push(
            "packetsUseIndividualFiles",
            "Packets Use Individual Files",
            packets.individual_files,
            "Whether each packet is recorded to its own file.",
        );
        status.push(
            "packetsUsePacketHeaders",
            "Packets Use Packet Headers",
            packets.headers,
            "Whether recorded packets are wrapped in delimiter headers.",
        );
        status.push(
            "packetsUid",
            "Packets UID",
            next_uid,
            "The uid the next recorded packet will receive.",
        );
        status.push(
            "packetsPath",
            "Packets Path",
            packets.path.display(),
            "The server packet-recording system path.",
        );
        status.push(
            "packetsFilename",
            "Packets File Name",
            &packets.filename,
            "The server packet-recording system file name.",
        );
    }

    fn dispatcher_status(&self, status: &mut StatusBuilder) {
        let workers = &self.shared.workers;
        status.push(
            "threadManagementFrameworkCurrentThreadCount",
            "Thread Management Framework Current Thread Count",
            workers.current_thread_count(),
            "The current thread pool length of the server worker pool.",
        );
        status.push(
            "threadManagementFrameworkActiveThreadCount",
            "Thread Management Framework Active Thread Count",
            workers.active_thread_count(),
            "The active thread pool length of the server worker pool.",
        );

        let Some(dispatcher) = self.transaction_manager() else {
            return;
        };
        let metrics = dispatcher.get_metrics();
        status.push(
            "transactionManagerExecutions",
            "Transaction Manager Executions",
            metrics.executions,
            "The number of transaction manager handler executions.",
        );
        status.push(
            "transactionManagerTotalExecutionTime",
            "Transaction Manager Total Execution Time",
            format!("{:.6}", metrics.total_time.as_secs_f64()),
            "The total time of transaction manager handler execution.",
        );
        status.push(
            "transactionManagerAvgExecutionTime",
            "Transaction Manager Average Execution Time",
            format!("{:.6}", metrics.average_time().as_secs_f64()),
            "The average time of transaction manager handler execution.",
        );

        let errors = dispatcher.error_counts();
        let kinds = errors
            .iter()
            .map(|(kind, count)| (kind.name().replace(' ', ""), kind.name(), count))
            .chain(std::iter::once(("Total".to_string(), "Total", errors.total())));
        for (key, name, count) in kinds {
            status.push(
                format!("transactionManagerError{key}"),
                format!("Transaction Manager {name} Errors"),
                count,
                "An error tracked by the transaction manager.",
            );
        }
    }

    fn socket_status(&self, status: &mut StatusBuilder) {
        let socket = self.shared.socket();
        let config = socket.config();
        let port = socket
            .local_addr()
            .map(|address| address.port())
            .unwrap_or(config.port);
        let counters = socket.counters();

        status.push("socketState", "Socket State", socket.state(), "The current state of the socket.");
        status.push("socketMode", "Socket Mode", "Server", "The current socket mode.");
        status.push(
            "socketProtocol",
            "Socket Protocol",
            config.transport,
            "Which protocol the socket is using.",
        );
        status.push(
            "socketHostname",
            "Socket Hostname",
            &config.host,
            "The hostname the socket is bound to.",
        );
        status.push("socketPort", "Socket Port", port, "The port the socket is bound to.");
        status.push(
            "socketBytesSent",
            "Socket Bytes Sent",
            counters.bytes_sent,
            "The total number of bytes sent on the socket.",
        );
        status.push(
            "socketBytesReceived",
            "Socket Bytes Received",
            counters.bytes_received,
            "The total number of bytes received on the socket.",
        );
        status.push(
            "socketReadsAttempted",
            "Socket Reads Attempted",
            counters.reads_attempted,
            "The number of socket reads attempted.",
        );
        status.push(
            "socketReadsCompleted",
            "Socket Reads Completed",
            counters.reads_completed,
            "The number of socket reads that returned data.",
        );
        status.push(
            "socketReadSuccess",
            "Socket Read Success %",
            format!("{:.2}", counters.read_success_percent()),
            "The socket read success percentage.",
        );
        status.push(
            "socketTotalReadTime",
            "Socket Total Read Time",
            format!("{:.6}", counters.total_read_time.as_secs_f64()),
            "The total time spent reading on a socket, in seconds.",
        );
        status.push(
            "socketAvgReadTime",
            "Socket Average Read Time",
            format!("{:.6}", counters.average_read_secs()),
            "The average time spent reading on a socket, in seconds.",
        );
        status.push(
            "socketWritesAttempted",
            "Socket Writes Attempted",
            counters.writes_attempted,
            "The number of socket writes attempted.",
        );
        status.push(
            "socketWritesCompleted",
            "Socket Writes Completed",
            counters.writes_completed,
            "The number of socket writes that completed.",
        );
        status.push(
            "socketWriteSuccess",
            "Socket Write Success %",
            format!("{:.2}", counters.write_success_percent()),
            "The socket write success percentage.",
        );
        status.push(
            "socketTotalWriteTime",
            "Socket Total Write Time",
            format!("{:.6}", counters.total_write_time.as_secs_f64()),
            "The total time spent writing on a socket, in seconds.",
        );
        status.push(
            "socketAvgWriteTime",
            "Socket Average Write Time",
            format!("{:.6}", counters.average_write_secs()),
            "The average time spent writing on a socket, in seconds.",
        );
        status.push(
            "socketAcceptAttempts",
            "Socket Accept Attempts",
            counters.accept_attempts,
            "The number of bounded accept calls made on the socket.",
        );
        status.push(
            "socketAcceptSuccesses",
            "Socket Accept Successes",
            counters.accept_successes,
            "The number of connections accepted on the socket.",
        );
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if self.shared.is_running() {
            if let Err(e) = self.stop() {
                error!(error = %e, "Failed to stop server on drop");
            }
            return;
        }

        // Init or Error: make sure no thread keeps the shared state alive.
        let shared = &self.shared;
        shared.socket().request_shutdown();
        if let Err(e) = shared.manager.shutdown() {
            warn!(error = %e, "Manager outlived server");
        }
        if let Err(e) = shared.workers.shutdown() {
            warn!(error = %e, "Workers outlived server");
        }
        shared.socket().close();
    }
}

#[derive(Default)]
struct StatusBuilder {
    entries: Vec<ServerStatusEntry>,
}

impl StatusBuilder {
    fn push(
        &mut self,
        key: impl Into<String>,
        name: impl Into<String>,
        value: impl ToString,
        description: impl Into<String>,
    ) {
        self.entries
            .push(ServerStatusEntry::new(key, name, value, description));
    }
}
