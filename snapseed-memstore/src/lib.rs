//! In-memory store adapter for snapseed.
//!
//! [`MemoryStore`] keeps named collections of records in process memory and
//! implements the snapseed [`Store`](snapseed_core::Store) contract, so a
//! harness can seed, snapshot and tear it down without an external database.
//! Records get an [`ObjectId`] under `_id` when seeded without one, and
//! fixtures can match ids with the `$oid` directive.
//!
//! ```
//! use snapseed_core::{arr, doc, Context, Store};
//! use snapseed_memstore::MemoryStore;
//!
//! let store = MemoryStore::new();
//! let cx = Context::background();
//! store
//!     .seed(&cx, doc! { "pets" => arr![doc! { "name" => "Kitty" }] })
//!     .unwrap();
//! assert_eq!(store.count("pets"), 1);
//! ```

mod object_id;
mod store;

pub use object_id::{oid_directive, ObjectId, OBJECT_ID_LEN};
pub use store::{MemoryStore, ID_FIELD};
