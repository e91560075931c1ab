//! # Basket Client
//!
//! Keeps a local list of records in step with a PocketBase collection.
//!
//! A [`CollectionSync`] loads the collection once through a [`RecordApi`]
//! backend, then applies create, update and delete events from the backend's
//! change feed as they arrive. Observers read the state through a
//! `tokio::sync::watch` receiver.
//!
//! Two backends are provided:
//!
//! - [`PocketBaseClient`] talks to a PocketBase instance over HTTP and
//!   server-sent events.
//! - [`MemoryBackend`] keeps records in memory and fires change events on
//!   every mutation.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use basket_client::{CollectionSync, PocketBaseClient};
//! use basket_engine::ListOptions;
//!
//! # async fn run() -> basket_client::Result<()> {
//! let api = Arc::new(PocketBaseClient::new("http://localhost:8090")?);
//! let sync = CollectionSync::new(api, "products", ListOptions::new().with_sort("-created"));
//!
//! sync.load().await;
//! for product in &sync.state().items {
//!     println!("{}", product.get_str("name").unwrap_or_default());
//! }
//!
//! sync.destroy().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod memory;
pub mod pocketbase;
pub mod realtime;
pub mod sync;

pub use api::{EventReceiver, EventSender, RecordApi, SubscriptionId};
pub use config::{Config, ConfigError};
pub use error::{ClientError, Result, SyncError};
pub use memory::{FailurePoint, MemoryBackend};
pub use pocketbase::{ListPage, PocketBaseClient};
pub use realtime::SubscriberRegistry;
pub use sync::CollectionSync;
