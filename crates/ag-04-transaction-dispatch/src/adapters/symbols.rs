//! # Symbol Tables
//!
//! Named strategies and handlers published under a path, so a dispatcher
//! can be wired up by name from configuration. Tables live in a
//! process-wide registry; [`crate::TransactionDispatcher::bind_symbol_table`]
//! attaches one to a dispatcher and the `*_by_name` calls search every
//! bound table in bind order.

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;
use tracing::info;

use crate::domain::{Request, Response};
use crate::ports::{IdentifyStrategy, PacketDump, ReceiveStrategy, ReleaseStrategy, SendStrategy, TransactionHandler};

/// One exported entry of a symbol table.
#[derive(Clone)]
pub enum Symbol {
    Receive(Arc<dyn ReceiveStrategy>),
    Send(Arc<dyn SendStrategy>),
    Identify(Arc<dyn IdentifyStrategy>),
    PacketDump(Arc<dyn PacketDump>),
    ReleaseRequest(Arc<dyn ReleaseStrategy<Request>>),
    ReleaseResponse(Arc<dyn ReleaseStrategy<Response>>),
    Handler(Arc<dyn TransactionHandler>),
}

impl Symbol {
    pub fn kind(&self) -> &'static str {
        match self {
            Symbol::Receive(_) => "receive",
            Symbol::Send(_) => "send",
            Symbol::Identify(_) => "identify",
            Symbol::PacketDump(_) => "packet dump",
            Symbol::ReleaseRequest(_) => "request release",
            Symbol::ReleaseResponse(_) => "response release",
            Symbol::Handler(_) => "handler",
        }
    }
}

/// Named symbols exported under one path.
#[derive(Clone, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace `name`.
    pub fn insert(&mut self, name: impl Into<String>, symbol: Symbol) -> &mut Self {
        self.symbols.insert(name.into(), symbol);
        self
    }

    pub fn with_handler(
        mut self,
        name: impl Into<String>,
        handler: impl TransactionHandler + 'static,
    ) -> Self {
        self.insert(name, Symbol::Handler(Arc::new(handler)));
        self
    }

    pub fn with_symbol(mut self, name: impl Into<String>, symbol: Symbol) -> Self {
        self.insert(name, symbol);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

lazy_static! {
    static ref SYMBOL_TABLES: RwLock<HashMap<String, Arc<SymbolTable>>> =
        RwLock::new(HashMap::new());
}

/// Publish `table` under `path`, replacing any table already there.
pub fn register_symbol_table(path: impl Into<String>, table: SymbolTable) {
    let path = path.into();
    info!(path = %path, symbols = table.len(), "Symbol table registered");
    SYMBOL_TABLES.write().insert(path, Arc::new(table));
}

/// Withdraw the table at `path`. Dispatchers that already bound it keep
/// their copy.
pub fn unregister_symbol_table(path: &str) -> bool {
    SYMBOL_TABLES.write().remove(path).is_some()
}

pub(crate) fn lookup_symbol_table(path: &str) -> Option<Arc<SymbolTable>> {
    SYMBOL_TABLES.read().get(path).cloned()
}
