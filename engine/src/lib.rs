//! # Basket Engine
//!
//! Collection state for a client that mirrors a remote record collection.
//!
//! This crate holds the data model and the state transitions a synchronizer
//! applies when it loads a collection and when the backend's change feed
//! reports a mutation. It performs no IO; the `basket-client` crate drives it.
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`Record`] is the backend's JSON record: system fields (`id`,
//! `collectionName`, `created`, `updated`), optional `expand` data for
//! relations, and arbitrary user fields.
//!
//! ### Change events
//!
//! A [`ChangeEvent`] pairs a [`ChangeAction`] (`create`, `update`, `delete`)
//! with the affected record.
//!
//! ### Sync state
//!
//! [`SyncState`] is the cached list plus `loading`, `error` and `initialized`
//! flags. Created records are inserted at the head when the configured sort is
//! descending ([`ListOptions::insert_position`]), at the tail otherwise. The
//! list is never re-sorted after load.
//!
//! ## Quick Start
//!
//! ```rust
//! use basket_engine::{ChangeEvent, ListOptions, Record, SyncState};
//! use serde_json::json;
//!
//! let options = ListOptions::new().with_sort("-created");
//! let mut state = SyncState::new();
//!
//! state.begin_load();
//! state.finish_load(vec![
//!     Record::from_value(json!({"id": "a", "name": "Apfel"})).unwrap(),
//!     Record::from_value(json!({"id": "b", "name": "Birne"})).unwrap(),
//! ]);
//!
//! let banane = Record::from_value(json!({"id": "c", "name": "Banane"})).unwrap();
//! state.apply(ChangeEvent::created(banane), options.insert_position());
//!
//! let ids: Vec<_> = state.items.iter().map(|r| r.id.as_str()).collect();
//! assert_eq!(ids, vec!["c", "a", "b"]);
//! ```

pub mod error;
pub mod event;
pub mod models;
pub mod options;
pub mod record;
pub mod state;

// Re-export main types at crate root
pub use error::Error;
pub use event::{ChangeAction, ChangeEvent};
pub use models::{Product, ShoppingListItem};
pub use options::{ListOptions, SortField, SortSpec, DEFAULT_SORT};
pub use record::{Fields, Record};
pub use state::{Applied, InsertPosition, SyncPhase, SyncState};

/// Type aliases for clarity
pub type RecordId = String;
pub type CollectionName = String;
