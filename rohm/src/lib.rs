//! rohm maps plain structs onto a key-value store: one hash record per instance,
//! secondary indexes for exact-match lookup, references to other models and
//! ordered or unordered collections, each kept in its own sub-record.
//!
//! Structs describe themselves with `#[derive(Model)]`:
//!
//! ```ignore
//! #[derive(Model, Default)]
//! #[model(all_ids)]
//! struct User {
//!     #[id] id: Option<u64>,
//!     #[attribute] #[indexed] name: String,
//!     #[reference] country: Option<Country>,
//!     #[list] tags: Vec<String>,
//!     #[transient] seen: bool,
//! }
//! ```
//!
//! Storage is pluggable through [`Store`]; [`RedbStore`] persists into [Redb](https://github.com/cberner/redb)
//! and enforces expiration lazily. Every operation takes a [`Session`] bound to one logical database.

extern crate self as rohm;

pub mod attribute;
pub mod cache;
pub mod codec;
pub mod collection;
pub mod config;
pub mod error;
pub mod expire;
pub mod id;
pub mod index;
pub mod logger;
pub mod mapper;
pub mod metadata;
pub mod model;
pub mod nest;
pub mod query;
pub mod redb_store;
pub mod reference;
pub mod session;
pub mod store;

pub use codec::{FromField, ToField};
pub use config::RohmConfig;
pub use error::{AppError, StoreError};
pub use expire::expire;
pub use inventory;
pub use macros::{Model, Scalar};
pub use mapper::{delete, delete_cascade, exists, get, save, save_cascade};
pub use metadata::{describe, validate_registered, ModelInfo};
pub use model::Model;
pub use nest::KeyPath;
pub use query::{find, get_all};
pub use redb_store::RedbStore;
pub use session::{Session, Storage};
pub use store::{DbIndex, KeyKind, Store};
pub use std::time::Duration;
