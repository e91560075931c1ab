//! Change-feed events.
//!
//! The backend pushes one event per record mutation. Events carry the record
//! as it was stored, without relation expansion.

use crate::{Error, Record};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of mutation reported by the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl ChangeAction {
    /// Wire name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Create => "create",
            ChangeAction::Update => "update",
            ChangeAction::Delete => "delete",
        }
    }

    /// Whether the event payload may need a re-fetch for expansion.
    pub fn carries_content(&self) -> bool {
        !matches!(self, ChangeAction::Delete)
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(ChangeAction::Create),
            "update" => Ok(ChangeAction::Update),
            "delete" => Ok(ChangeAction::Delete),
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }
}

/// A single change-feed event: `{"action": "...", "record": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub action: ChangeAction,
    pub record: Record,
}

impl ChangeEvent {
    pub fn new(action: ChangeAction, record: Record) -> Self {
        Self { action, record }
    }

    pub fn created(record: Record) -> Self {
        Self::new(ChangeAction::Create, record)
    }

    pub fn updated(record: Record) -> Self {
        Self::new(ChangeAction::Update, record)
    }

    pub fn deleted(record: Record) -> Self {
        Self::new(ChangeAction::Delete, record)
    }

    /// Identifier of the affected record.
    pub fn record_id(&self) -> &str {
        &self.record.id
    }
}
