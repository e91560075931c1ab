//! In-memory record backend.
//!
//! Behaves like a small PocketBase: collections of records with generated ids
//! and timestamps, sort/filter/expand on reads, and a change feed that fires
//! on every mutation. Intended for tests and local development.

mod filter;

pub use filter::Filter;

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use basket_engine::{ChangeEvent, CollectionName, Fields, ListOptions, Record};
use dashmap::DashMap;
use serde_json::Value;

use crate::api::{EventSender, RecordApi, SubscriptionId};
use crate::error::{ClientError, Result};
use crate::realtime::{collection_topic, SubscriberRegistry};

/// Calls that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    FetchAll,
    FetchOne,
    Subscribe,
}

/// Fields the backend owns; stripped from create/update payloads.
const SYSTEM_FIELDS: [&str; 6] = [
    "id",
    "created",
    "updated",
    "collectionId",
    "collectionName",
    "expand",
];

#[derive(Debug, Default)]
pub struct MemoryBackend {
    /// Records per collection, in insertion order
    collections: DashMap<CollectionName, Vec<Record>>,
    /// `(collection, field)` -> target collection
    relations: DashMap<(CollectionName, String), CollectionName>,
    registry: SubscriberRegistry,
    failures: DashMap<FailurePoint, String>,
    fetch_one_calls: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty collection if it does not exist yet.
    pub fn with_collection(self, name: &str) -> Self {
        self.collections.entry(name.to_string()).or_default();
        self
    }

    /// Declare `collection.field` as a relation to `target`.
    pub fn with_relation(self, collection: &str, field: &str, target: &str) -> Self {
        self.collections.entry(collection.to_string()).or_default();
        self.collections.entry(target.to_string()).or_default();
        self.relations.insert(
            (collection.to_string(), field.to_string()),
            target.to_string(),
        );
        self
    }

    /// Store records as-is, without firing change events.
    ///
    /// Missing collection names and timestamps are filled in.
    pub fn seed(&self, collection: &str, records: impl IntoIterator<Item = Record>) {
        let now = timestamp();
        let mut stored = self.collections.entry(collection.to_string()).or_default();
        for mut record in records {
            if record.collection_name.is_empty() {
                record.collection_name = collection.to_string();
            }
            if record.collection_id.is_empty() {
                record.collection_id = collection_id(collection);
            }
            if record.created.is_empty() {
                record.created = now.clone();
            }
            if record.updated.is_empty() {
                record.updated = record.created.clone();
            }
            stored.push(record);
        }
    }

    /// Push a raw event to the collection's subscribers without touching
    /// stored records. Returns how many subscribers received it.
    pub fn emit(&self, collection: &str, event: ChangeEvent) -> usize {
        self.registry.dispatch(&collection_topic(collection), &event)
    }

    /// Make every subsequent call at `point` fail with `message`.
    pub fn fail(&self, point: FailurePoint, message: impl Into<String>) {
        self.failures.insert(point, message.into());
    }

    pub fn clear_failure(&self, point: FailurePoint) {
        self.failures.remove(&point);
    }

    /// Stored records of a collection, in insertion order.
    pub fn records(&self, collection: &str) -> Vec<Record> {
        self.collections
            .get(collection)
            .map(|records| records.value().clone())
            .unwrap_or_default()
    }

    /// Number of live subscriptions on a collection.
    pub fn subscriber_count(&self, collection: &str) -> usize {
        self.registry
            .topic_subscription_count(&collection_topic(collection))
    }

    /// How many single-record fetches have been served.
    pub fn fetch_one_calls(&self) -> usize {
        self.fetch_one_calls.load(Ordering::SeqCst)
    }

    fn check(&self, point: FailurePoint) -> Result<()> {
        match self.failures.get(&point) {
            Some(message) => Err(ClientError::Injected(message.value().clone())),
            None => Ok(()),
        }
    }

    fn missing_collection(collection: &str) -> ClientError {
        ClientError::NotFound(format!("collection {}", collection))
    }

    fn find(&self, collection: &str, id: &str) -> Option<Record> {
        self.collections
            .get(collection)?
            .iter()
            .find(|r| r.has_id(id))
            .cloned()
    }

    /// Inline related records for every relation named in `spec`.
    fn expand(&self, mut record: Record, spec: Option<&str>) -> Record {
        let Some(spec) = spec else {
            return record;
        };

        for field in spec.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            // Nested paths are expanded one level only.
            let field = field.split('.').next().unwrap_or(field);
            let key = (record.collection_name.clone(), field.to_string());
            let Some(target) = self.relations.get(&key).map(|t| t.value().clone()) else {
                continue;
            };

            let expanded = match record.get(field) {
                Some(Value::String(id)) => self
                    .find(&target, id)
                    .and_then(|r| serde_json::to_value(r).ok()),
                Some(Value::Array(ids)) => {
                    let related: Vec<Value> = ids
                        .iter()
                        .filter_map(Value::as_str)
                        .filter_map(|id| self.find(&target, id))
                        .filter_map(|r| serde_json::to_value(r).ok())
                        .collect();
                    (!related.is_empty()).then_some(Value::Array(related))
                }
                _ => None,
            };

            if let Some(value) = expanded {
                record.expand.insert(field.to_string(), value);
            }
        }
        record
    }

    fn dispatch(&self, collection: &str, event: ChangeEvent) {
        let delivered = self.emit(collection, event);
        tracing::trace!(collection = %collection, delivered, "memory backend change");
    }
}

fn timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%d %H:%M:%S%.3fZ")
        .to_string()
}

fn collection_id(collection: &str) -> String {
    format!("pbc_{}", collection)
}

fn new_record_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..15].to_string()
}

fn user_fields(mut fields: Fields) -> Fields {
    for key in SYSTEM_FIELDS {
        fields.remove(key);
    }
    fields
}

#[async_trait]
impl RecordApi for MemoryBackend {
    async fn fetch_all(&self, collection: &str, options: &ListOptions) -> Result<Vec<Record>> {
        self.check(FailurePoint::FetchAll)?;

        let filter = options.filter().map(Filter::parse).transpose()?;
        let mut records: Vec<Record> = self
            .collections
            .get(collection)
            .ok_or_else(|| Self::missing_collection(collection))?
            .iter()
            .filter(|r| filter.as_ref().map_or(true, |f| f.matches(r)))
            .cloned()
            .collect();

        options.sort_spec().sort(&mut records);

        Ok(records
            .into_iter()
            .map(|r| self.expand(r, options.expand()))
            .collect())
    }

    async fn fetch_one(&self, collection: &str, id: &str, expand: Option<&str>) -> Result<Record> {
        self.fetch_one_calls.fetch_add(1, Ordering::SeqCst);
        self.check(FailurePoint::FetchOne)?;

        let record = self
            .find(collection, id)
            .ok_or_else(|| ClientError::NotFound(format!("{}/{}", collection, id)))?;
        Ok(self.expand(record, expand))
    }

    async fn create(&self, collection: &str, fields: Fields) -> Result<Record> {
        let id = fields
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(new_record_id);
        let now = timestamp();

        let record = Record {
            id,
            collection_id: collection_id(collection),
            collection_name: collection.to_string(),
            created: now.clone(),
            updated: now,
            expand: Default::default(),
            fields: user_fields(fields),
        };

        {
            let mut stored = self
                .collections
                .get_mut(collection)
                .ok_or_else(|| Self::missing_collection(collection))?;
            if stored.iter().any(|r| r.has_id(&record.id)) {
                return Err(ClientError::Api {
                    status: 400,
                    message: format!("record {} already exists", record.id),
                });
            }
            stored.push(record.clone());
        }

        self.dispatch(collection, ChangeEvent::created(record.clone()));
        Ok(record)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<Record> {
        let record = {
            let mut stored = self
                .collections
                .get_mut(collection)
                .ok_or_else(|| Self::missing_collection(collection))?;
            let record = stored
                .iter_mut()
                .find(|r| r.has_id(id))
                .ok_or_else(|| ClientError::NotFound(format!("{}/{}", collection, id)))?;
            record.fields.extend(user_fields(fields));
            record.updated = timestamp();
            record.clone()
        };

        self.dispatch(collection, ChangeEvent::updated(record.clone()));
        Ok(record)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let removed = {
            let mut stored = self
                .collections
                .get_mut(collection)
                .ok_or_else(|| Self::missing_collection(collection))?;
            let index = stored
                .iter()
                .position(|r| r.has_id(id))
                .ok_or_else(|| ClientError::NotFound(format!("{}/{}", collection, id)))?;
            stored.remove(index)
        };

        self.dispatch(collection, ChangeEvent::deleted(removed));
        Ok(())
    }

    async fn subscribe(&self, collection: &str, sender: EventSender) -> Result<SubscriptionId> {
        self.check(FailurePoint::Subscribe)?;
        Ok(self.registry.register(collection_topic(collection), sender))
    }

    async fn unsubscribe(&self, _collection: &str, id: &SubscriptionId) -> Result<()> {
        self.registry.unregister(id);
        Ok(())
    }
}
