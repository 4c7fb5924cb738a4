//! # Transaction Dispatcher Service
//!
//! The registry (strategies, handler index, cache, bound symbol tables) is
//! behind one reader/writer lock: read-held for a whole transaction, so
//! transactions run concurrently, and write-held only while reconfiguring.
//! Per-handler metrics and the error table have their own mutexes.
//!
//! Accessors a handler may call back into (`get_metrics`, `handler_metrics`,
//! `handler_count`, `has_handler`, `cache`, `exec`, `exec_id`) take recursive
//! read locks, so a writer queued behind a running transaction cannot block
//! the transaction that holds the read lock.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use ag_01_ordered_index::OrderedIndex;
use ag_03_managed_cache::{CacheConfig, ManagedCache};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::adapters::symbols::{lookup_symbol_table, Symbol, SymbolTable};
use crate::adapters::{
    drop_release, ChunkedReceiver, DeepClone, DefaultIdentifier, PlainSender, Sha256Hash,
};
use crate::domain::{
    DispatchError, ErrorCounts, ExecuteOutcome, Request, Response, TransactionError,
    TransactionMetrics, DEFAULT_MESSAGE_ID,
};
use crate::ports::{
    CloneStrategy, Connection, HashStrategy, IdentifyStrategy, PacketDump, ReceiveStrategy,
    ReleaseStrategy, SendStrategy, TransactionHandler,
};

/// A registered handler and its metrics.
struct HandlerEntry {
    message_id: String,
    name: String,
    keep_open: bool,
    handler: Arc<dyn TransactionHandler>,
    metrics: Mutex<TransactionMetrics>,
}

impl HandlerEntry {
    /// Run the handler, turning a panic into `InvalidHandler`.
    fn run(&self, request: &Request) -> Result<Option<Response>, TransactionError> {
        catch_unwind(AssertUnwindSafe(|| self.handler.handle(request))).map_err(|_| {
            error!(message_id = %self.message_id, handler = %self.name, "Handler panicked");
            TransactionError::InvalidHandler
        })
    }
}

struct Strategies {
    receive: Arc<dyn ReceiveStrategy>,
    send: Arc<dyn SendStrategy>,
    identify: Arc<dyn IdentifyStrategy>,
    hash: Arc<dyn HashStrategy>,
    clone: Arc<dyn CloneStrategy>,
    release_request: Arc<dyn ReleaseStrategy<Request>>,
    release_response: Arc<dyn ReleaseStrategy<Response>>,
    packet_dump: Option<Arc<dyn PacketDump>>,
}

impl Default for Strategies {
    fn default() -> Self {
        Self {
            receive: Arc::new(ChunkedReceiver::default()),
            send: Arc::new(PlainSender),
            identify: Arc::new(DefaultIdentifier),
            hash: Arc::new(Sha256Hash),
            clone: Arc::new(DeepClone),
            release_request: Arc::new(drop_release::<Request>),
            release_response: Arc::new(drop_release::<Response>),
            packet_dump: None,
        }
    }
}

#[derive(Default)]
struct Registry {
    strategies: Strategies,
    handlers: OrderedIndex<Arc<HandlerEntry>>,
    cache: Option<Arc<ManagedCache<Response>>>,
    tables: Vec<(String, Arc<SymbolTable>)>,
}

impl Registry {
    /// The handler for `message_id`, or the `default` handler.
    fn route(&self, message_id: &str) -> Option<&Arc<HandlerEntry>> {
        self.handlers
            .get(message_id.as_bytes())
            .or_else(|| self.handlers.get(DEFAULT_MESSAGE_ID.as_bytes()))
    }

    fn find_symbol<T>(
        &self,
        name: &str,
        kind: &'static str,
        select: impl Fn(&Symbol) -> Option<T>,
    ) -> Result<T, DispatchError> {
        self.tables
            .iter()
            .find_map(|(_, table)| table.get(name).and_then(&select))
            .ok_or_else(|| DispatchError::SymbolNotFound {
                name: name.to_string(),
                kind,
            })
    }

    fn cached_response(&self, request: &Request) -> Option<Response> {
        let cache = self.cache.as_ref()?;
        let hash = self.request_hash(request)?;
        let stored = cache.get(&hash)?.into_value()?;
        self.strategies
            .clone
            .clone_response(&stored)
            .map(|(copy, _)| copy)
    }

    fn store_response(&self, request: &Request, response: &Response, message_id: &str) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        let Some(hash) = self.request_hash(request) else {
            return;
        };
        let Some((copy, size)) = self.strategies.clone.clone_response(response) else {
            return;
        };
        if size == 0 {
            return;
        }

        // Concurrent misses on the same hash both compute; the first insert
        // wins and the second is rejected as a duplicate.
        match cache.put(&hash, copy, size) {
            Ok(()) => debug!(message_id, bytes = size, "Response cached"),
            Err(e) => debug!(message_id, error = %e, "Response not cached"),
        }
    }

    /// Routing key of `request`; empty keys count as unidentified.
    fn identify(&self, request: &Request) -> Option<String> {
        self.strategies
            .identify
            .identify(request)
            .filter(|id| !id.is_empty())
    }

    fn request_hash(&self, request: &Request) -> Option<Vec<u8>> {
        self.strategies
            .hash
            .hash(request)
            .filter(|hash| !hash.is_empty())
    }
}

/// Routes requests received on a connection to registered handlers.
pub struct TransactionDispatcher {
    registry: RwLock<Registry>,
    errors: Mutex<ErrorCounts>,
}

impl Default for TransactionDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionDispatcher {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            errors: Mutex::new(ErrorCounts::default()),
        }
    }

    // =========================================================================
    // Handler registration
    // =========================================================================

    /// Register `handler` for `message_id`. `keep_open` asks the server to
    /// keep the connection for further transactions after this one.
    pub fn add_handler(
        &self,
        keep_open: bool,
        message_id: &str,
        name: &str,
        handler: impl TransactionHandler + 'static,
    ) -> Result<(), DispatchError> {
        self.insert_handler(keep_open, message_id, name, Arc::new(handler))
    }

    /// Register the handler exported as `name` by a bound symbol table.
    pub fn add_handler_by_name(
        &self,
        keep_open: bool,
        message_id: &str,
        name: &str,
    ) -> Result<(), DispatchError> {
        let handler = self.registry.read().find_symbol(name, "handler", |symbol| {
            match symbol {
                Symbol::Handler(handler) => Some(Arc::clone(handler)),
                _ => None,
            }
        });
        match handler {
            Ok(handler) => self.insert_handler(keep_open, message_id, name, handler),
            Err(e) => {
                error!(message_id, handler = name, error = %e, "Failed to add handler");
                Err(e)
            }
        }
    }

    fn insert_handler(
        &self,
        keep_open: bool,
        message_id: &str,
        name: &str,
        handler: Arc<dyn TransactionHandler>,
    ) -> Result<(), DispatchError> {
        if message_id.is_empty() {
            return Err(DispatchError::EmptyMessageId);
        }

        let entry = Arc::new(HandlerEntry {
            message_id: message_id.to_string(),
            name: name.to_string(),
            keep_open,
            handler,
            metrics: Mutex::new(TransactionMetrics::default()),
        });

        let mut registry = self.registry.write();
        if registry.handlers.put(message_id.as_bytes(), entry).is_err() {
            error!(message_id, handler = name, "Handler already registered");
            return Err(DispatchError::DuplicateHandler {
                message_id: message_id.to_string(),
            });
        }

        info!(message_id, handler = name, keep_open, "Handler registered");
        Ok(())
    }

    pub fn handler_count(&self) -> usize {
        self.registry.read_recursive().handlers.len()
    }

    pub fn has_handler(&self, message_id: &str) -> bool {
        self.registry
            .read_recursive()
            .handlers
            .contains_key(message_id.as_bytes())
    }

    // =========================================================================
    // Strategies
    // =========================================================================

    pub fn set_receive_strategy(&self, strategy: impl ReceiveStrategy + 'static) {
        self.registry.write().strategies.receive = Arc::new(strategy);
    }

    pub fn set_send_strategy(&self, strategy: impl SendStrategy + 'static) {
        self.registry.write().strategies.send = Arc::new(strategy);
    }

    pub fn set_identify_strategy(&self, strategy: impl IdentifyStrategy + 'static) {
        self.registry.write().strategies.identify = Arc::new(strategy);
    }

    pub fn set_hash_strategy(&self, strategy: impl HashStrategy + 'static) {
        self.registry.write().strategies.hash = Arc::new(strategy);
    }

    pub fn set_clone_strategy(&self, strategy: impl CloneStrategy + 'static) {
        self.registry.write().strategies.clone = Arc::new(strategy);
    }

    pub fn set_request_release(&self, strategy: impl ReleaseStrategy<Request> + 'static) {
        self.registry.write().strategies.release_request = Arc::new(strategy);
    }

    pub fn set_response_release(&self, strategy: impl ReleaseStrategy<Response> + 'static) {
        self.registry.write().strategies.release_response = Arc::new(strategy);
    }

    pub fn set_packet_dump(&self, dump: impl PacketDump + 'static) {
        self.registry.write().strategies.packet_dump = Some(Arc::new(dump));
    }

    pub fn clear_packet_dump(&self) {
        self.registry.write().strategies.packet_dump = None;
    }

    // =========================================================================
    // Symbol tables
    // =========================================================================

    /// Attach the symbol table registered under `path`.
    pub fn bind_symbol_table(&self, path: &str) -> Result<(), DispatchError> {
        let Some(table) = lookup_symbol_table(path) else {
            error!(path, "Failed to bind symbol table");
            return Err(DispatchError::SymbolTableNotFound {
                path: path.to_string(),
            });
        };

        self.registry.write().tables.push((path.to_string(), table));
        info!(path, "Symbol table bound");
        Ok(())
    }

    pub fn bound_symbol_tables(&self) -> Vec<String> {
        self.registry
            .read()
            .tables
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn set_receive_strategy_by_name(&self, name: &str) -> Result<(), DispatchError> {
        self.set_by_name(name, "receive", |symbol, strategies| match symbol {
            Symbol::Receive(strategy) => {
                strategies.receive = Arc::clone(strategy);
                true
            }
            _ => false,
        })
    }

    pub fn set_send_strategy_by_name(&self, name: &str) -> Result<(), DispatchError> {
        self.set_by_name(name, "send", |symbol, strategies| match symbol {
            Symbol::Send(strategy) => {
                strategies.send = Arc::clone(strategy);
                true
            }
            _ => false,
        })
    }

    pub fn set_identify_strategy_by_name(&self, name: &str) -> Result<(), DispatchError> {
        self.set_by_name(name, "identify", |symbol, strategies| match symbol {
            Symbol::Identify(strategy) => {
                strategies.identify = Arc::clone(strategy);
                true
            }
            _ => false,
        })
    }

    pub fn set_packet_dump_by_name(&self, name: &str) -> Result<(), DispatchError> {
        self.set_by_name(name, "packet dump", |symbol, strategies| match symbol {
            Symbol::PacketDump(dump) => {
                strategies.packet_dump = Some(Arc::clone(dump));
                true
            }
            _ => false,
        })
    }

    pub fn set_request_release_by_name(&self, name: &str) -> Result<(), DispatchError> {
        self.set_by_name(name, "request release", |symbol, strategies| match symbol {
            Symbol::ReleaseRequest(strategy) => {
                strategies.release_request = Arc::clone(strategy);
                true
            }
            _ => false,
        })
    }

    pub fn set_response_release_by_name(&self, name: &str) -> Result<(), DispatchError> {
        self.set_by_name(name, "response release", |symbol, strategies| match symbol {
            Symbol::ReleaseResponse(strategy) => {
                strategies.release_response = Arc::clone(strategy);
                true
            }
            _ => false,
        })
    }

    /// Search bound tables in order for `name` and let `apply` install it.
    fn set_by_name(
        &self,
        name: &str,
        kind: &'static str,
        apply: impl Fn(&Symbol, &mut Strategies) -> bool,
    ) -> Result<(), DispatchError> {
        let mut registry = self.registry.write();
        let Registry {
            strategies, tables, ..
        } = &mut *registry;

        let found = tables
            .iter()
            .filter_map(|(_, table)| table.get(name))
            .any(|symbol| apply(symbol, strategies));

        if found {
            info!(symbol = name, kind, "Strategy set from symbol table");
            Ok(())
        } else {
            error!(symbol = name, kind, "Failed to set strategy from symbol table");
            Err(DispatchError::SymbolNotFound {
                name: name.to_string(),
                kind,
            })
        }
    }

    // =========================================================================
    // Cache
    // =========================================================================

    /// Start caching responses keyed by the request hash. Replaces any
    /// existing cache.
    pub fn enable_cache(&self, config: CacheConfig) -> Result<(), DispatchError> {
        let cache = ManagedCache::new(config)?;
        let previous = self.registry.write().cache.replace(Arc::new(cache));
        drop(previous);
        info!("Transaction cache enabled");
        Ok(())
    }

    pub fn disable_cache(&self) {
        let previous = self.registry.write().cache.take();
        if previous.is_some() {
            info!("Transaction cache disabled");
        }
    }

    pub fn cache(&self) -> Option<Arc<ManagedCache<Response>>> {
        self.registry.read_recursive().cache.clone()
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.registry.read_recursive().cache.is_some()
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Run one transaction on `connection`: receive, identify, answer from
    /// the cache or a handler, send. Every failure is counted.
    pub fn execute(
        &self,
        connection: &mut dyn Connection,
    ) -> Result<ExecuteOutcome, TransactionError> {
        self.transact(connection).map_err(|kind| {
            self.record_error(kind);
            kind
        })
    }

    fn transact(&self, connection: &mut dyn Connection) -> Result<ExecuteOutcome, TransactionError> {
        let registry = self.registry.read();
        let strategies = &registry.strategies;
        let timer = Instant::now();

        let request = strategies
            .receive
            .receive(connection, strategies.packet_dump.as_deref())
            .map_err(|kind| {
                warn!(error = %kind, "Failed to receive request");
                kind
            })?;
        debug!(bytes = request.len(), peer = ?request.peer, "Request received");

        let Some(message_id) = registry.identify(&request) else {
            strategies.release_request.release(request);
            warn!("Failed to identify request");
            return Err(TransactionError::FailedIdent);
        };

        let cached = registry.cached_response(&request);
        let from_cache = cached.is_some();

        let Some(handler) = registry.route(&message_id).cloned() else {
            strategies.release_request.release(request);
            warn!(message_id = %message_id, "No handler for request");
            return Err(TransactionError::MissingHandler);
        };

        let result = match cached {
            Some(response) => {
                debug!(message_id = %message_id, "Serving cached response");
                Ok(Some(response))
            }
            None => handler.run(&request),
        };

        if let Ok(Some(response)) = &result {
            if !from_cache {
                registry.store_response(&request, response, &message_id);
            }
        }
        strategies.release_request.release(request);

        let response = match result {
            Ok(Some(response)) => response,
            Ok(None) => {
                warn!(message_id = %message_id, "Handler returned no response");
                self.record_metrics(&handler, timer);
                return Err(TransactionError::NullResult);
            }
            Err(kind) => return Err(kind),
        };

        let sent = strategies
            .send
            .send(connection, &response, strategies.packet_dump.as_deref());
        strategies.release_response.release(response);

        if !from_cache {
            self.record_metrics(&handler, timer);
        }

        let bytes_sent = sent.map_err(|kind| {
            warn!(message_id = %message_id, error = %kind, "Failed to send response");
            kind
        })?;
        debug!(message_id = %message_id, bytes = bytes_sent, from_cache, "Response sent");

        Ok(ExecuteOutcome {
            message_id,
            bytes_sent,
            keep_open: handler.keep_open,
            from_cache,
        })
    }

    /// Run the identify strategy alone.
    pub fn exec_id(&self, request: &Request) -> Option<String> {
        let registry = self.registry.read_recursive();
        registry.identify(request)
    }

    /// Answer `request` in-process, without a connection. Uses and fills
    /// the cache like [`Self::execute`] but records no errors.
    pub fn exec(&self, request: &Request) -> Result<Response, TransactionError> {
        let registry = self.registry.read_recursive();
        let timer = Instant::now();

        let message_id = registry
            .identify(request)
            .ok_or(TransactionError::FailedIdent)?;

        if let Some(response) = registry.cached_response(request) {
            return Ok(response);
        }

        let handler = registry
            .route(&message_id)
            .cloned()
            .ok_or(TransactionError::MissingHandler)?;

        let response = handler.run(request)?;
        if let Some(response) = &response {
            registry.store_response(request, response, &message_id);
        }
        self.record_metrics(&handler, timer);

        response.ok_or(TransactionError::NullResult)
    }

    fn record_metrics(&self, handler: &HandlerEntry, timer: Instant) {
        let elapsed = timer.elapsed();
        let mut metrics = handler.metrics.lock();
        metrics.record(elapsed);
        debug!(
            message_id = %handler.message_id,
            handler = %handler.name,
            executions = metrics.executions,
            avg_us = metrics.average_time().as_micros() as u64,
            "Handler metrics updated"
        );
    }

    fn record_error(&self, kind: TransactionError) {
        self.errors.lock().record(kind);
    }

    // =========================================================================
    // Metrics
    // =========================================================================

    /// Executions and total time summed over every handler.
    pub fn get_metrics(&self) -> TransactionMetrics {
        let registry = self.registry.read_recursive();
        registry
            .handlers
            .iter()
            .map(|(_, entry)| *entry.metrics.lock())
            .fold(TransactionMetrics::default(), |sum, metrics| sum + metrics)
    }

    pub fn handler_metrics(&self, message_id: &str) -> Option<TransactionMetrics> {
        let registry = self.registry.read_recursive();
        let entry = registry.handlers.get(message_id.as_bytes())?;
        let metrics = *entry.metrics.lock();
        Some(metrics)
    }

    pub fn error_counts(&self) -> ErrorCounts {
        *self.errors.lock()
    }
}
