//! Dispatcher behaviour across strategies, symbol tables and threads.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use ag_04_transaction_dispatch::{
    register_symbol_table, CacheConfig, Connection, DispatchError, LineIdentifier, Request,
    Response, Symbol, SymbolTable, TransactionDispatcher, TransactionError,
};

// =============================================================================
// Helpers
// =============================================================================

/// In-memory connection that yields one message and then reports EOF.
struct MemoryConnection {
    inbound: VecDeque<Vec<u8>>,
    outbound: Vec<u8>,
    fail_writes: bool,
}

impl MemoryConnection {
    fn new(message: &[u8]) -> Self {
        Self {
            inbound: VecDeque::from(vec![message.to_vec()]),
            outbound: Vec::new(),
            fail_writes: false,
        }
    }

    fn failing_writes(message: &[u8]) -> Self {
        Self {
            fail_writes: true,
            ..Self::new(message)
        }
    }
}

impl Connection for MemoryConnection {
    fn receive_chunk(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<usize> {
        match self.inbound.pop_front() {
            Some(bytes) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "drained")),
        }
    }

    fn send(&mut self, bytes: &[u8]) -> io::Result<usize> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        }
        self.outbound.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn peer(&self) -> Option<String> {
        Some("198.51.100.7:5000".to_string())
    }
}

fn make_dispatcher() -> TransactionDispatcher {
    let dispatcher = TransactionDispatcher::new();
    dispatcher.set_identify_strategy(LineIdentifier);
    dispatcher
}

fn upper(request: &Request) -> Option<Response> {
    Some(Response::new(request.text().to_uppercase()))
}

// =============================================================================
// Symbol tables
// =============================================================================

#[test]
fn test_handlers_and_strategies_by_name() {
    let table = SymbolTable::new()
        .with_handler("upper", upper)
        .with_symbol(
            "first-word",
            Symbol::Identify(Arc::new(|request: &Request| {
                request.text().split(' ').next().map(str::to_string)
            })),
        );
    register_symbol_table("dispatch-tests/by-name", table);

    let dispatcher = TransactionDispatcher::new();
    dispatcher.bind_symbol_table("dispatch-tests/by-name").unwrap();
    dispatcher.set_identify_strategy_by_name("first-word").unwrap();
    dispatcher.add_handler_by_name(false, "shout", "upper").unwrap();

    let mut connection = MemoryConnection::new(b"shout hello");
    dispatcher.execute(&mut connection).unwrap();
    assert_eq!(connection.outbound, b"SHOUT HELLO");
    assert_eq!(
        dispatcher.bound_symbol_tables(),
        vec!["dispatch-tests/by-name".to_string()]
    );
}

#[test]
fn test_by_name_failures() {
    let dispatcher = TransactionDispatcher::new();
    assert!(matches!(
        dispatcher.bind_symbol_table("dispatch-tests/never-registered"),
        Err(DispatchError::SymbolTableNotFound { .. })
    ));

    register_symbol_table(
        "dispatch-tests/wrong-kind",
        SymbolTable::new().with_handler("upper", upper),
    );
    dispatcher.bind_symbol_table("dispatch-tests/wrong-kind").unwrap();

    // A handler symbol cannot stand in for a receive strategy.
    assert!(matches!(
        dispatcher.set_receive_strategy_by_name("upper"),
        Err(DispatchError::SymbolNotFound { kind: "receive", .. })
    ));
    assert!(matches!(
        dispatcher.add_handler_by_name(false, "x", "missing"),
        Err(DispatchError::SymbolNotFound { .. })
    ));
    assert_eq!(dispatcher.handler_count(), 0);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_write_failure_is_counted_and_metrics_kept() {
    let dispatcher = make_dispatcher();
    dispatcher.add_handler(false, "up", "upper", upper).unwrap();

    let mut connection = MemoryConnection::failing_writes(b"up please");
    assert_eq!(
        dispatcher.execute(&mut connection),
        Err(TransactionError::Write)
    );

    let errors = dispatcher.error_counts();
    assert_eq!(errors.get(TransactionError::Write), 1);
    assert_eq!(errors.total(), 1);
    assert_eq!(dispatcher.handler_metrics("up").unwrap().executions, 1);
}

#[test]
fn test_read_failure_on_closed_connection() {
    let dispatcher = make_dispatcher();
    let mut connection = MemoryConnection::new(b"");
    connection.inbound.clear();

    assert_eq!(
        dispatcher.execute(&mut connection),
        Err(TransactionError::Read)
    );
    assert_eq!(dispatcher.error_counts().get(TransactionError::Read), 1);
}

#[test]
fn test_packet_dump_sees_both_directions() {
    let dispatcher = make_dispatcher();
    dispatcher.add_handler(false, "up", "upper", upper).unwrap();
    let seen = Arc::new(Mutex::new(Vec::<Vec<u8>>::new()));
    let sink = Arc::clone(&seen);
    dispatcher.set_packet_dump(move |bytes: &[u8]| sink.lock().unwrap().push(bytes.to_vec()));

    dispatcher
        .execute(&mut MemoryConnection::new(b"up"))
        .unwrap();

    assert_eq!(
        seen.lock().unwrap().as_slice(),
        &[b"up".to_vec(), b"UP".to_vec()]
    );
}

// =============================================================================
// Cache
// =============================================================================

#[test]
fn test_disable_cache_runs_handler_again() {
    let dispatcher = make_dispatcher();
    dispatcher.add_handler(false, "up", "upper", upper).unwrap();
    dispatcher
        .enable_cache(CacheConfig {
            background_eviction: false,
            ..CacheConfig::default()
        })
        .unwrap();

    dispatcher.execute(&mut MemoryConnection::new(b"up")).unwrap();
    assert!(dispatcher.execute(&mut MemoryConnection::new(b"up")).unwrap().from_cache);

    dispatcher.disable_cache();
    assert!(dispatcher.cache().is_none());
    assert!(!dispatcher.execute(&mut MemoryConnection::new(b"up")).unwrap().from_cache);
    assert_eq!(dispatcher.handler_metrics("up").unwrap().executions, 2);
}

#[test]
fn test_concurrent_identical_requests_get_identical_bytes() {
    let dispatcher = Arc::new(make_dispatcher());
    dispatcher
        .add_handler(false, "slow", "slow", |request: &Request| {
            thread::sleep(Duration::from_millis(20));
            Some(Response::new(request.payload.clone()))
        })
        .unwrap();
    dispatcher
        .enable_cache(CacheConfig {
            background_eviction: false,
            ..CacheConfig::default()
        })
        .unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let dispatcher = Arc::clone(&dispatcher);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut connection = MemoryConnection::new(b"slow request");
                dispatcher.execute(&mut connection).unwrap();
                connection.outbound
            })
        })
        .collect();

    let replies: Vec<Vec<u8>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(replies[0], replies[1]);

    // Both may miss and execute; never more than once each.
    let executions = dispatcher.handler_metrics("slow").unwrap().executions;
    assert!((1..=2).contains(&executions));
    assert_eq!(dispatcher.cache().unwrap().len(), 1);
}
