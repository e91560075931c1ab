//! Record types as returned by the backend.

use crate::{error::Result, CollectionName, Error, RecordId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field mapping of a record, excluding the system fields.
pub type Fields = Map<String, Value>;

/// A record of a remote collection.
///
/// System fields are typed; every user-defined field lives in [`Record::fields`]
/// and is flattened back to the top level on serialization, so the JSON shape
/// matches what the backend sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique identifier assigned by the backend
    pub id: RecordId,
    /// Backend identifier of the owning collection
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub collection_id: String,
    /// Name of the owning collection
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub collection_name: CollectionName,
    /// Creation timestamp, as formatted by the backend
    #[serde(default)]
    pub created: String,
    /// Last update timestamp, as formatted by the backend
    #[serde(default)]
    pub updated: String,
    /// Related records inlined by an expand request, keyed by relation field
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub expand: Map<String, Value>,
    /// User-defined fields
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    /// Create a record with only an id and user fields.
    pub fn new(id: impl Into<RecordId>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            collection_id: String::new(),
            collection_name: String::new(),
            created: String::new(),
            updated: String::new(),
            expand: Map::new(),
            fields,
        }
    }

    /// Build a record from a JSON object, e.g. `json!({"id": "a", "name": "Apfel"})`.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::InvalidRecord(e.to_string()))
    }

    /// Set the owning collection name.
    pub fn with_collection(mut self, name: impl Into<CollectionName>) -> Self {
        self.collection_name = name.into();
        self
    }

    /// Check whether this record has the given identifier.
    pub fn has_id(&self, id: &str) -> bool {
        self.id == id
    }

    /// Get a user field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Get a user field as a string slice.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Get a record inlined under `expand.<field>`.
    pub fn expanded(&self, field: &str) -> Option<&Value> {
        self.expand.get(field)
    }

    /// Whether any relation has been expanded into this record.
    pub fn is_expanded(&self) -> bool {
        !self.expand.is_empty()
    }

    /// Look up any field, system or user, as a JSON value.
    ///
    /// Used for sorting and filtering on fields like `created`.
    pub fn value_of(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::String(self.id.clone())),
            "created" => Some(Value::String(self.created.clone())),
            "updated" => Some(Value::String(self.updated.clone())),
            "collectionId" => Some(Value::String(self.collection_id.clone())),
            "collectionName" => Some(Value::String(self.collection_name.clone())),
            _ => self.fields.get(field).cloned(),
        }
    }

    /// Decode the user fields (plus id) into a typed model.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let value = serde_json::to_value(self).map_err(|e| Error::InvalidRecord(e.to_string()))?;
        serde_json::from_value(value).map_err(|e| Error::InvalidPayload(e.to_string()))
    }
}
