//! # feedsync Store
//!
//! Local store boundary for feedsync.
//!
//! The sync engine never talks to a database directly. It reads and
//! writes entities through the [`Store`] trait, which any relational
//! backend can implement. Records are keyed twice:
//!
//! - a [`LocalId`] assigned on first insert (monotonic, so it doubles as
//!   the insertion sequence used for stable slicing)
//! - a [`NaturalKey`]: the remote identity, or a composite business key
//!
//! ## Available Stores
//!
//! - [`MemoryStore`] - For testing and embedders without a relational backend
//!
//! ## Example
//!
//! ```rust
//! use feedsync_store::{EntityKind, MemoryStore, NaturalKey, Record, Store};
//!
//! let store = MemoryStore::new();
//! let key = NaturalKey::remote("p-01");
//! let id = store
//!     .insert(EntityKind::Program, key.clone(), Record::new().with("name", "Informatics"))
//!     .unwrap();
//! let found = store.find_by_key(EntityKind::Program, &key).unwrap().unwrap();
//! assert_eq!(found.id, id);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod kind;
mod memory;
mod record;
mod store;
mod types;

pub use error::{StoreError, StoreResult};
pub use kind::EntityKind;
pub use memory::MemoryStore;
pub use record::{FieldValue, Record, StoredRecord};
pub use store::Store;
pub use types::{KeyPart, LocalId, NaturalKey};
