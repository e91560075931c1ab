//! Query options for listing a collection.

use crate::{InsertPosition, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Sort applied by the backend when none is configured.
pub const DEFAULT_SORT: &str = "-created";

/// Sort, filter and relation-expansion settings for one collection.
///
/// Empty strings are treated the same as unset values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptions {
    /// Comma-separated sort keys, `-` prefix for descending (e.g. `-created,name`)
    pub sort: Option<String>,
    /// Backend filter expression (e.g. `name = 'Apfel'`)
    pub filter: Option<String>,
    /// Comma-separated relation fields to expand (e.g. `product`)
    pub expand: Option<String>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_expand(mut self, expand: impl Into<String>) -> Self {
        self.expand = Some(expand.into());
        self
    }

    /// Configured sort, if any.
    pub fn sort(&self) -> Option<&str> {
        non_empty(&self.sort)
    }

    /// Sort sent to the backend: the configured one, or [`DEFAULT_SORT`].
    pub fn effective_sort(&self) -> &str {
        self.sort().unwrap_or(DEFAULT_SORT)
    }

    pub fn filter(&self) -> Option<&str> {
        non_empty(&self.filter)
    }

    pub fn expand(&self) -> Option<&str> {
        non_empty(&self.expand)
    }

    /// Where a newly created record goes in a cached list.
    ///
    /// Only the configured sort counts: a leading `-` puts new records at the
    /// head, anything else (including no sort at all) at the tail. This is a
    /// heuristic and does not re-sort.
    pub fn insert_position(&self) -> InsertPosition {
        match self.sort() {
            Some(sort) if sort.starts_with('-') => InsertPosition::Head,
            _ => InsertPosition::Tail,
        }
    }

    /// Parsed form of [`ListOptions::effective_sort`].
    pub fn sort_spec(&self) -> SortSpec {
        SortSpec::parse(self.effective_sort())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub descending: bool,
}

/// A parsed multi-key sort expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    fields: Vec<SortField>,
}

impl SortSpec {
    /// Parse `-created,+name,quantity`. Empty segments are skipped.
    pub fn parse(expr: &str) -> Self {
        let fields = expr
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|segment| {
                let (descending, field) = match segment.as_bytes()[0] {
                    b'-' => (true, &segment[1..]),
                    b'+' => (false, &segment[1..]),
                    _ => (false, segment),
                };
                let field = field.trim();
                (!field.is_empty()).then(|| SortField {
                    field: field.to_string(),
                    descending,
                })
            })
            .collect();
        Self { fields }
    }

    pub fn fields(&self) -> &[SortField] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Compare two records key by key.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        for key in &self.fields {
            let ord = compare_values(
                a.value_of(&key.field).as_ref(),
                b.value_of(&key.field).as_ref(),
            );
            let ord = if key.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Stable sort of `records` by this spec.
    pub fn sort(&self, records: &mut [Record]) {
        records.sort_by(|a, b| self.compare(a, b));
    }
}

fn rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Total order over JSON values: missing/null < bool < number < string < other.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn default_sort_is_newest_first() {
        let options = ListOptions::new();
        assert_eq!(options.sort(), None);
        assert_eq!(options.effective_sort(), "-created");
        assert_eq!(options.insert_position(), InsertPosition::Tail);
    }

    #[test]
    fn descending_sort_inserts_at_head() {
        let options = ListOptions::new().with_sort("-created");
        assert_eq!(options.insert_position(), InsertPosition::Head);

        let options = ListOptions::new().with_sort("-shoppingCartUsages,name");
        assert_eq!(options.insert_position(), InsertPosition::Head);

        let options = ListOptions::new().with_sort("name");
        assert_eq!(options.insert_position(), InsertPosition::Tail);

        let options = ListOptions::new().with_sort("name,-created");
        assert_eq!(options.insert_position(), InsertPosition::Tail);
    }

    #[test]
    fn empty_strings_count_as_unset() {
        let options = ListOptions::new()
            .with_sort("")
            .with_filter("  ")
            .with_expand("");
        assert_eq!(options.sort(), None);
        assert_eq!(options.filter(), None);
        assert_eq!(options.expand(), None);
        assert_eq!(options.effective_sort(), DEFAULT_SORT);
    }

    #[test]
    fn parse_sort_spec() {
        let spec = SortSpec::parse("-created, +name,,quantity,-");
        assert_eq!(
            spec.fields(),
            &[
                SortField {
                    field: "created".into(),
                    descending: true
                },
                SortField {
                    field: "name".into(),
                    descending: false
                },
                SortField {
                    field: "quantity".into(),
                    descending: false
                },
            ]
        );
        assert!(SortSpec::parse("").is_empty());
    }

    #[test]
    fn sort_by_multiple_keys() {
        let mut records = vec![
            record(json!({"id": "1", "name": "Zucker", "usages": 2})),
            record(json!({"id": "2", "name": "Apfel", "usages": 5})),
            record(json!({"id": "3", "name": "Birne", "usages": 2})),
            record(json!({"id": "4", "name": "Eis"})),
        ];

        SortSpec::parse("-usages,name").sort(&mut records);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "1", "4"]);
    }

    #[test]
    fn sort_by_created_descending() {
        let mut records = vec![
            record(json!({"id": "old", "created": "2025-01-01 10:00:00.000Z"})),
            record(json!({"id": "new", "created": "2025-03-01 10:00:00.000Z"})),
        ];
        SortSpec::parse("-created").sort(&mut records);
        assert_eq!(records[0].id, "new");
    }

    #[test]
    fn value_ordering() {
        assert_eq!(compare_values(None, Some(&json!(1))), Ordering::Less);
        assert_eq!(
            compare_values(Some(&json!(2)), Some(&json!(10))),
            Ordering::Less
        );
        assert_eq!(
            compare_values(Some(&json!("b")), Some(&json!("a"))),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(Some(&json!(true)), Some(&json!("a"))),
            Ordering::Less
        );
    }
}
