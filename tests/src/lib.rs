//! # Asgard Test Suite
//!
//! Cross-crate tests and benchmarks.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── flows.rs        # index, cache, pool and dispatcher together
//! │   └── e2e_server.rs   # a node served over loopback
//! └── benches/
//!     └── core_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ag-tests
//! cargo test -p ag-tests integration::e2e_server
//! cargo bench -p ag-tests
//! ```

pub mod integration;
