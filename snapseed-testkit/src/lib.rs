//! snapseed Test Kit - snapshot-testing harness.
//!
//! This crate wires a backing [`Store`](snapseed_core::Store), a comparator
//! and the fixture loader into one [`Harness`] per test.
//!
//! # Key Types
//!
//! - [`Harness`]: seed, assert, load fixtures, clean up
//! - [`HarnessBuilder`]: options (tester, registry, document cache, context)
//! - [`Seeded`]: re-assert exactly what a seed call wrote
//! - [`CleanupGuard`]: tears the store down when the test scope ends
//! - [`FixtureDir`]: temporary directory for fixture files
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use snapseed_memstore::MemoryStore;
//! use snapseed_testkit::Harness;
//!
//! let store = Arc::new(MemoryStore::new());
//! let harness = Harness::new(Arc::clone(&store)).unwrap();
//! let _cleanup = harness.cleanup();
//!
//! harness.seed(harness.load_fixture("testdata/seed"));
//! // ... run the component against `store` ...
//! harness.assert(&harness.load_fixture("testdata/expected"));
//! ```

mod fixture_dir;
mod harness;
mod integration;

pub use fixture_dir::FixtureDir;
pub use harness::{CleanupGuard, Harness, HarnessBuilder, Seeded};

/// Re-export snapseed_core for convenience in tests.
pub use snapseed_core;
