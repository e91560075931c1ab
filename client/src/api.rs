//! The backend seam.
//!
//! [`RecordApi`] is everything the synchronizer needs from a record backend.
//! [`PocketBaseClient`](crate::PocketBaseClient) talks to a real server;
//! [`MemoryBackend`](crate::MemoryBackend) is an in-process double.

use async_trait::async_trait;
use basket_engine::{ChangeEvent, Fields, ListOptions, Record};
use tokio::sync::mpsc;

use crate::error::Result;

/// Sending half of a change-feed queue.
pub type EventSender = mpsc::UnboundedSender<ChangeEvent>;

/// Receiving half of a change-feed queue.
pub type EventReceiver = mpsc::UnboundedReceiver<ChangeEvent>;

/// Identifier of one registered change-feed subscription.
pub type SubscriptionId = String;

/// Record storage with a per-collection change feed.
#[async_trait]
pub trait RecordApi: Send + Sync + 'static {
    /// Fetch every record of a collection, honoring sort, filter and expand.
    async fn fetch_all(&self, collection: &str, options: &ListOptions) -> Result<Vec<Record>>;

    /// Fetch a single record, optionally expanding relations.
    async fn fetch_one(&self, collection: &str, id: &str, expand: Option<&str>) -> Result<Record>;

    /// Create a record from user fields.
    async fn create(&self, collection: &str, fields: Fields) -> Result<Record>;

    /// Patch user fields of an existing record.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<Record>;

    /// Delete a record.
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Subscribe to every change in a collection.
    ///
    /// Events are pushed onto `sender` in delivery order until
    /// [`RecordApi::unsubscribe`] is called, after which the backend drops
    /// the sender.
    async fn subscribe(&self, collection: &str, sender: EventSender) -> Result<SubscriptionId>;

    /// Cancel a subscription. Unknown ids are ignored.
    async fn unsubscribe(&self, collection: &str, id: &SubscriptionId) -> Result<()>;
}
