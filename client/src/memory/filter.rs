//! Filter expressions understood by the in-memory backend.
//!
//! A small subset of the PocketBase filter syntax: comparisons joined with
//! `&&`, e.g. `name = 'Apfel' && shoppingCartUsages >= 2`.

use basket_engine::{options::compare_values, Record};
use serde_json::Value;
use std::cmp::Ordering;

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
}

#[derive(Debug, Clone, PartialEq)]
struct Clause {
    field: String,
    op: Op,
    value: Value,
}

/// A parsed conjunction of comparisons.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn parse(expr: &str) -> Result<Self> {
        let mut clauses = Vec::new();
        for part in split_conjunction(expr) {
            let part = part.trim();
            if part.is_empty() {
                return Err(ClientError::InvalidFilter(expr.to_string()));
            }
            let clause =
                parse_clause(part).ok_or_else(|| ClientError::InvalidFilter(expr.to_string()))?;
            clauses.push(clause);
        }
        Ok(Self { clauses })
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.clauses.iter().all(|clause| {
            let actual = record.value_of(&clause.field);
            let actual = actual.as_ref();
            match clause.op {
                Op::Eq => loosely_equal(actual, &clause.value),
                Op::Ne => !loosely_equal(actual, &clause.value),
                Op::Gt => compare_values(actual, Some(&clause.value)) == Ordering::Greater,
                Op::Ge => compare_values(actual, Some(&clause.value)) != Ordering::Less,
                Op::Lt => compare_values(actual, Some(&clause.value)) == Ordering::Less,
                Op::Le => compare_values(actual, Some(&clause.value)) != Ordering::Greater,
                Op::Like => match (actual, &clause.value) {
                    (Some(Value::String(a)), Value::String(needle)) => {
                        a.to_lowercase().contains(&needle.to_lowercase())
                    }
                    _ => false,
                },
            }
        })
    }
}

fn loosely_equal(actual: Option<&Value>, expected: &Value) -> bool {
    match (actual, expected) {
        (None | Some(Value::Null), Value::Null) => true,
        (None, Value::String(s)) => s.is_empty(),
        (Some(Value::Number(a)), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Some(a), b) => a == b,
        _ => false,
    }
}

/// Split on `&&` outside of quoted strings.
fn split_conjunction(expr: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut chars = expr.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (None, '\'' | '"') => quote = Some(c),
            (None, '&') if matches!(chars.peek(), Some((_, '&'))) => {
                parts.push(&expr[start..i]);
                chars.next();
                start = i + 2;
            }
            _ => {}
        }
    }
    parts.push(&expr[start..]);
    parts
}

fn parse_clause(clause: &str) -> Option<Clause> {
    // Longest operators first so `>=` is not read as `>`.
    const OPS: [(&str, Op); 7] = [
        ("!=", Op::Ne),
        (">=", Op::Ge),
        ("<=", Op::Le),
        ("=", Op::Eq),
        (">", Op::Gt),
        ("<", Op::Lt),
        ("~", Op::Like),
    ];

    let (index, token, op) = OPS
        .iter()
        .filter_map(|(token, op)| clause.find(token).map(|i| (i, *token, *op)))
        .min_by_key(|(i, token, _)| (*i, usize::MAX - token.len()))?;

    let field = clause[..index].trim();
    let literal = clause[index + token.len()..].trim();

    let valid_field = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if !valid_field {
        return None;
    }

    Some(Clause {
        field: field.to_string(),
        op,
        value: parse_literal(literal)?,
    })
}

fn parse_literal(literal: &str) -> Option<Value> {
    for quote in ['\'', '"'] {
        if literal.len() >= 2 && literal.starts_with(quote) && literal.ends_with(quote) {
            return Some(Value::String(literal[1..literal.len() - 1].to_string()));
        }
    }
    match literal {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        "null" => Some(Value::Null),
        _ => serde_json::from_str::<serde_json::Number>(literal)
            .ok()
            .map(Value::Number),
    }
}
