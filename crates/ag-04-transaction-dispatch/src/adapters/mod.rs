pub mod defaults;
pub mod line;
pub mod symbols;

pub use defaults::{
    drop_release, ChunkedReceiver, DeepClone, DefaultIdentifier, EchoHandler, PlainSender,
    Sha256Hash, DEFAULT_CHUNK_SIZE, DEFAULT_RECEIVE_WINDOW,
};
pub use line::LineIdentifier;
pub use symbols::{register_symbol_table, unregister_symbol_table, Symbol, SymbolTable};
