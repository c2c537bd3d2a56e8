//! snapseed core library.
//!
//! Fixture-driven snapshot testing for database-backed components: seed a
//! store with baseline records, load an expected tree from fixture files
//! that may embed placeholders, snapshot the store and compare.
//!
//! # Architecture
//!
//! - `model`: ordered `Document` / `Value` tree
//! - `pattern`: tri-state placeholders (`Pattern`, `Placeholder`)
//! - `registry`, `decode`: fixture directives and JSON/YAML decoding
//! - `loader`: path spec resolution, merge, cached single-flight loading
//! - `store`, `context`: backing-store contract and deadlines
//! - `compare`: placeholder-aware structural comparison

pub mod compare;
pub mod config;
pub mod context;
pub mod decode;
pub mod error;
pub mod loader;
pub mod model;
pub mod pattern;
pub mod registry;
pub mod store;

mod cache;

pub use compare::{Diff, FieldPath, Mismatch, MismatchKind, RuleContext, StructuralTester, Tester};
pub use config::{LoaderConfig, CONFIG_FILE_NAME};
pub use context::Context;
pub use decode::{
    decode_str, DecodeError, DecodeOptions, FixtureFormat, DEFAULT_MAX_DEPTH, MAX_SUPPORTED_DEPTH,
};
pub use error::{Result, ShapeError, SnapError};
pub use loader::{merge_documents, resolve, CacheStats, FileDecoder, FixtureDecoder, FixtureLoader};
pub use model::{Array, Document, Entry, Value};
pub use pattern::{Pattern, PatternType, Placeholder};
pub use registry::{Directive, Registry};
pub use store::Store;
