//! Collection synchronizer.
//!
//! [`CollectionSync`] keeps a [`SyncState`] for one remote collection: a full
//! fetch on [`load`](CollectionSync::load), then live create/update/delete
//! events from the backend's change feed.
//!
//! State lives in a `tokio::sync::watch` channel. Every mutation goes through
//! one helper that calls `send_modify`, so mutations never interleave
//! and observers are notified after each one. Change events are queued by the
//! backend on an mpsc channel and drained by a single consumer task, in order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use basket_engine::{
    Applied, ChangeEvent, CollectionName, InsertPosition, ListOptions, Record, SyncPhase,
    SyncState,
};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::api::{EventReceiver, RecordApi, SubscriptionId};
use crate::error::SyncError;

/// Live change-feed subscription owned by a synchronizer.
struct ActiveSubscription {
    id: SubscriptionId,
    consumer: JoinHandle<()>,
}

struct Inner<A: RecordApi> {
    api: Arc<A>,
    collection: CollectionName,
    options: ListOptions,
    state: watch::Sender<SyncState>,
    subscription: Mutex<Option<ActiveSubscription>>,
    disposed: AtomicBool,
}

/// Keeps a cached list of records in step with one remote collection.
///
/// Cloning is cheap and every clone drives the same state.
pub struct CollectionSync<A: RecordApi> {
    inner: Arc<Inner<A>>,
}

impl<A: RecordApi> Clone for CollectionSync<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: RecordApi> CollectionSync<A> {
    /// Create a synchronizer for `collection`. Nothing is fetched until
    /// [`load`](Self::load) is called.
    pub fn new(api: Arc<A>, collection: impl Into<CollectionName>, options: ListOptions) -> Self {
        let (state, _) = watch::channel(SyncState::new());
        Self {
            inner: Arc::new(Inner {
                api,
                collection: collection.into(),
                options,
                state,
                subscription: Mutex::new(None),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn collection(&self) -> &str {
        &self.inner.collection
    }

    pub fn options(&self) -> &ListOptions {
        &self.inner.options
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SyncState {
        self.inner.state.borrow().clone()
    }

    pub fn phase(&self) -> SyncPhase {
        self.inner.state.borrow().phase()
    }

    /// Receiver notified after every state change.
    pub fn watch(&self) -> watch::Receiver<SyncState> {
        self.inner.state.subscribe()
    }

    /// Whether a change-feed subscription is active.
    pub async fn is_subscribed(&self) -> bool {
        self.inner.subscription.lock().await.is_some()
    }

    /// Whether [`destroy`](Self::destroy) has been called.
    pub fn is_destroyed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Fetch the whole collection and replace the cached items.
    ///
    /// On success the change feed is subscribed to if it is not already.
    /// Failures never propagate: a failed fetch is reported in
    /// [`SyncState::error`], a failed subscription is only logged.
    pub async fn load(&self) {
        let inner = &self.inner;
        if inner.is_disposed() {
            tracing::debug!(collection = %inner.collection, "Load skipped, synchronizer destroyed");
            return;
        }

        inner.update(|state| state.begin_load());

        let fetched = inner
            .api
            .fetch_all(&inner.collection, &inner.options)
            .await;

        if inner.is_disposed() {
            // Items and initialized stay frozen; only the in-flight flag ends.
            inner.update(|state| state.loading = false);
            tracing::debug!(collection = %inner.collection, "Discarding load finished after destroy");
            return;
        }

        match fetched {
            Ok(records) => {
                let count = records.len();
                inner.update(|state| state.finish_load(records));
                tracing::info!(collection = %inner.collection, count, "Collection loaded");

                Inner::ensure_subscribed(inner).await;
            }
            Err(source) => {
                let err = SyncError::fetch(&inner.collection, source);
                tracing::error!(collection = %inner.collection, error = %err, "Load failed");
                inner.update(|state| state.fail_load(err.to_string()));
            }
        }
    }

    /// Same as [`load`](Self::load).
    pub async fn reload(&self) {
        self.load().await
    }

    /// Apply one change-feed event.
    ///
    /// Events are normally delivered by the subscription's consumer task;
    /// this is public so callers with their own transport can feed events in.
    pub async fn handle_change(&self, event: ChangeEvent) {
        self.inner.handle_change(event).await
    }

    /// Cancel the change-feed subscription and freeze the state.
    ///
    /// Idempotent, and safe to call before any load. A load or event that
    /// completes afterwards leaves the state untouched.
    pub async fn destroy(&self) {
        let inner = &self.inner;
        let first = !inner.disposed.swap(true, Ordering::SeqCst);

        let active = inner.subscription.lock().await.take();
        if let Some(active) = active {
            active.consumer.abort();
            match inner.api.unsubscribe(&inner.collection, &active.id).await {
                Ok(()) => {
                    tracing::info!(collection = %inner.collection, "Unsubscribed from collection")
                }
                Err(source) => {
                    let err = SyncError::subscription(&inner.collection, source);
                    tracing::warn!(collection = %inner.collection, error = %err, "Unsubscribe failed");
                }
            }
        }

        if first {
            tracing::debug!(collection = %inner.collection, "Synchronizer destroyed");
        }
    }
}

impl<A: RecordApi> Inner<A> {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// The single mutation path for the state.
    fn update(&self, f: impl FnOnce(&mut SyncState)) {
        self.state.send_modify(f);
    }

    fn insert_position(&self) -> InsertPosition {
        self.options.insert_position()
    }

    async fn ensure_subscribed(this: &Arc<Self>) {
        let mut slot = this.subscription.lock().await;
        if slot.is_some() || this.is_disposed() {
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        match this.api.subscribe(&this.collection, tx).await {
            Ok(id) => {
                let consumer = tokio::spawn(consume(Arc::downgrade(this), rx));
                *slot = Some(ActiveSubscription { id, consumer });
                tracing::info!(collection = %this.collection, "Subscribed to collection");
            }
            Err(source) => {
                let err = SyncError::subscription(&this.collection, source);
                tracing::warn!(collection = %this.collection, error = %err, "Subscribe failed");
            }
        }
    }

    async fn handle_change(&self, event: ChangeEvent) {
        if self.is_disposed() {
            return;
        }

        let ChangeEvent { action, record } = event;
        let record = if action.carries_content() {
            self.expand(record).await
        } else {
            record
        };

        if self.is_disposed() {
            return;
        }

        let id = record.id.clone();
        let position = self.insert_position();
        let mut applied = Applied::Ignored;
        self.update(|state| applied = state.apply(ChangeEvent::new(action, record), position));

        match applied {
            Applied::Ignored => tracing::debug!(
                collection = %self.collection,
                id = %id,
                "Update for a record that is not cached"
            ),
            applied => tracing::debug!(
                collection = %self.collection,
                action = %action,
                id = %id,
                ?applied,
                "Applied change event"
            ),
        }
    }

    /// Re-fetch `record` with the configured expansion, falling back to the
    /// record as received.
    async fn expand(&self, record: Record) -> Record {
        let Some(expand) = self.options.expand() else {
            return record;
        };

        match self
            .api
            .fetch_one(&self.collection, &record.id, Some(expand))
            .await
        {
            Ok(expanded) => expanded,
            Err(source) => {
                let err = SyncError::subscription(&self.collection, source);
                tracing::warn!(
                    collection = %self.collection,
                    id = %record.id,
                    error = %err,
                    "Using unexpanded record"
                );
                record
            }
        }
    }
}

/// Drain the change-feed queue in order.
///
/// Holds only a weak reference so a dropped synchronizer ends the task.
async fn consume<A: RecordApi>(inner: Weak<Inner<A>>, mut events: EventReceiver) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.handle_change(event).await;
    }
}
