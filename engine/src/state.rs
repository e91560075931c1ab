//! Sync state - the cached view of one remote collection.
//!
//! All transitions are plain methods on [`SyncState`]. The client crate funnels
//! every mutation through a single update function, so each transition is
//! applied atomically with respect to the others.

use crate::{ChangeAction, ChangeEvent, Record};
use serde::{Deserialize, Serialize};

/// Where a created record is placed in the cached list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    Head,
    Tail,
}

/// Coarse lifecycle phase derived from the state flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    /// Nothing fetched yet
    Idle,
    /// A fetch is in flight
    Loading,
    /// Last fetch succeeded
    Ready,
    /// Last fetch failed
    Failed,
}

/// What a change event did to the cached list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Inserted { index: usize },
    Replaced { index: usize },
    Removed { count: usize },
    /// Update for an id that is not cached
    Ignored,
}

/// Client-side state of one collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// Cached records, in load order then insertion order
    pub items: Vec<Record>,
    /// Whether a fetch is in flight
    pub loading: bool,
    /// Message of the last failed fetch, empty otherwise
    pub error: String,
    /// Whether at least one fetch succeeded
    pub initialized: bool,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SyncPhase {
        if self.loading {
            SyncPhase::Loading
        } else if !self.error.is_empty() {
            SyncPhase::Failed
        } else if self.initialized {
            SyncPhase::Ready
        } else {
            SyncPhase::Idle
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// First cached record with the given id.
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.items.iter().find(|r| r.has_id(id))
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|r| r.has_id(id))
    }

    /// Enter `Loading`. Clears any previous error.
    pub fn begin_load(&mut self) {
        self.loading = true;
        self.error.clear();
    }

    /// Replace the cache with a successful fetch.
    pub fn finish_load(&mut self, records: Vec<Record>) {
        self.items = records;
        self.loading = false;
        self.initialized = true;
        self.error.clear();
    }

    /// Record a failed fetch. Items and `initialized` are left as they were.
    pub fn fail_load(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.error = if message.is_empty() {
            "failed to load collection".to_string()
        } else {
            message
        };
        self.loading = false;
    }

    /// Insert a record without checking for an existing id.
    pub fn insert(&mut self, record: Record, position: InsertPosition) -> usize {
        match position {
            InsertPosition::Head => {
                self.items.insert(0, record);
                0
            }
            InsertPosition::Tail => {
                self.items.push(record);
                self.items.len() - 1
            }
        }
    }

    /// Replace the first record with the same id, keeping its position.
    pub fn replace(&mut self, record: Record) -> Option<usize> {
        let index = self.position(&record.id)?;
        self.items[index] = record;
        Some(index)
    }

    /// Remove every record with the given id. Returns how many were removed.
    pub fn remove(&mut self, id: &str) -> usize {
        let before = self.items.len();
        self.items.retain(|r| !r.has_id(id));
        before - self.items.len()
    }

    /// Apply one change-feed event.
    pub fn apply(&mut self, event: ChangeEvent, position: InsertPosition) -> Applied {
        match event.action {
            ChangeAction::Create => Applied::Inserted {
                index: self.insert(event.record, position),
            },
            ChangeAction::Update => match self.replace(event.record) {
                Some(index) => Applied::Replaced { index },
                None => Applied::Ignored,
            },
            ChangeAction::Delete => Applied::Removed {
                count: self.remove(&event.record.id),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(id: &str, name: &str) -> Record {
        Record::from_value(json!({"id": id, "name": name})).unwrap()
    }

    fn ids(state: &SyncState) -> Vec<&str> {
        state.items.iter().map(|r| r.id.as_str()).collect()
    }

    fn loaded() -> SyncState {
        let mut state = SyncState::new();
        state.begin_load();
        state.finish_load(vec![product("a", "Apfel"), product("b", "Birne")]);
        state
    }

    #[test]
    fn new_state_is_idle() {
        let state = SyncState::new();
        assert_eq!(state.phase(), SyncPhase::Idle);
        assert!(state.is_empty());
        assert!(!state.initialized);
    }

    #[test]
    fn successful_load() {
        let mut state = SyncState::new();
        state.begin_load();
        assert_eq!(state.phase(), SyncPhase::Loading);

        state.finish_load(vec![product("a", "Apfel"), product("b", "Birne")]);
        assert_eq!(ids(&state), vec!["a", "b"]);
        assert!(state.initialized);
        assert!(!state.loading);
        assert_eq!(state.error, "");
        assert_eq!(state.phase(), SyncPhase::Ready);
    }

    #[test]
    fn failed_load_keeps_items() {
        let mut state = loaded();
        state.begin_load();
        state.fail_load("connection refused");

        assert_eq!(ids(&state), vec!["a", "b"]);
        assert!(state.initialized);
        assert!(!state.loading);
        assert_eq!(state.error, "connection refused");
        assert_eq!(state.phase(), SyncPhase::Failed);

        // Re-entrant
        state.begin_load();
        assert_eq!(state.phase(), SyncPhase::Loading);
        assert_eq!(state.error, "");
    }

    #[test]
    fn failed_load_never_leaves_empty_error() {
        let mut state = SyncState::new();
        state.begin_load();
        state.fail_load("");
        assert!(!state.error.is_empty());
        assert!(!state.initialized);
    }

    #[test]
    fn create_respects_position() {
        let mut state = loaded();
        let applied = state.apply(
            ChangeEvent::created(product("c", "Banane")),
            InsertPosition::Head,
        );
        assert_eq!(applied, Applied::Inserted { index: 0 });
        assert_eq!(ids(&state), vec!["c", "a", "b"]);

        let applied = state.apply(
            ChangeEvent::created(product("d", "Kiwi")),
            InsertPosition::Tail,
        );
        assert_eq!(applied, Applied::Inserted { index: 3 });
        assert_eq!(ids(&state), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn create_does_not_deduplicate() {
        let mut state = loaded();
        state.apply(ChangeEvent::created(product("a", "Apfel")), InsertPosition::Tail);
        assert_eq!(ids(&state), vec!["a", "b", "a"]);
    }

    #[test]
    fn update_replaces_in_place() {
        let mut state = loaded();
        let applied = state.apply(
            ChangeEvent::updated(product("b", "Birne (reif)")),
            InsertPosition::Head,
        );
        assert_eq!(applied, Applied::Replaced { index: 1 });
        assert_eq!(ids(&state), vec!["a", "b"]);
        assert_eq!(state.items[1].get_str("name"), Some("Birne (reif)"));
    }

    #[test]
    fn update_of_unknown_id_is_ignored() {
        let mut state = loaded();
        let before = state.clone();
        let applied = state.apply(
            ChangeEvent::updated(product("zz", "Ghost")),
            InsertPosition::Head,
        );
        assert_eq!(applied, Applied::Ignored);
        assert_eq!(state, before);
    }

    #[test]
    fn delete_removes_all_matches() {
        let mut state = loaded();
        state.insert(product("a", "Apfel"), InsertPosition::Tail);

        let applied = state.apply(ChangeEvent::deleted(product("a", "")), InsertPosition::Head);
        assert_eq!(applied, Applied::Removed { count: 2 });
        assert_eq!(ids(&state), vec!["b"]);

        let applied = state.apply(ChangeEvent::deleted(product("a", "")), InsertPosition::Head);
        assert_eq!(applied, Applied::Removed { count: 0 });
    }

    #[test]
    fn concrete_products_scenario() {
        let mut state = loaded();
        state.apply(
            ChangeEvent::created(product("c", "Banane")),
            InsertPosition::Head,
        );
        assert_eq!(ids(&state), vec!["c", "a", "b"]);

        state.apply(ChangeEvent::deleted(product("a", "Apfel")), InsertPosition::Head);
        assert_eq!(ids(&state), vec!["c", "b"]);
    }
}
