//! # Domain Layer
//!
//! Pure tree logic. No locking and no I/O; callers wrap the index in
//! whatever lock discipline they need.

pub mod entities;
pub mod errors;
pub mod index;
pub mod value_objects;

pub use errors::IndexError;
pub use index::{Iter, OrderedIndex};
pub use value_objects::{compare_keys, FANOUT};
