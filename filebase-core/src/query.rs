// filebase-core/src/query.rs
//! Exact field-equality queries.
//!
//! A [`Query`] is a conjunction of [`FieldEquals`] clauses. Matching goes
//! through the [`Predicate`] trait, so collections can also be scanned with
//! any closure `Fn(&Value) -> bool` without touching call sites.
//!
//! ```
//! use filebase_core::Query;
//! use serde_json::json;
//!
//! let query = Query::new().eq("id", 1).eq("status", "active");
//! assert!(query.matches(&json!({"id": 1, "status": "active", "age": 30})));
//! ```

use serde_json::{Map, Value};

use crate::error::{FileBaseError, Result};

/// Record -> bool
pub trait Predicate: Send + Sync {
    fn matches(&self, record: &Value) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn matches(&self, record: &Value) -> bool {
        self(record)
    }
}

/// `record[field] == value`; an absent field never matches
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEquals {
    pub field: String,
    pub value: Value,
}

impl FieldEquals {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FieldEquals {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl Predicate for FieldEquals {
    fn matches(&self, record: &Value) -> bool {
        match record.get(&self.field) {
            Some(actual) => values_equal(actual, &self.value),
            None => false,
        }
    }
}

/// Conjunction of field-equality clauses. The empty query matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    clauses: Vec<FieldEquals>,
}

impl Query {
    /// Empty query (matches all records, holes included)
    pub fn new() -> Self {
        Query::default()
    }

    /// Adds a `field == value` clause; a repeated field replaces the earlier clause
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let clause = FieldEquals::new(field, value);
        match self.clauses.iter_mut().find(|c| c.field == clause.field) {
            Some(existing) => existing.value = clause.value,
            None => self.clauses.push(clause),
        }
        self
    }

    /// Builds a query from a JSON object, `{"field": value, ...}`
    pub fn from_json(json: &Value) -> Result<Self> {
        match json {
            Value::Object(map) => Ok(Self::from(map.clone())),
            other => Err(FileBaseError::InvalidQuery(format!(
                "query must be an object, got {}",
                other
            ))),
        }
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.clauses
                .iter()
                .map(|c| (c.field.clone(), c.value.clone()))
                .collect(),
        )
    }

    pub fn clauses(&self) -> &[FieldEquals] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, record: &Value) -> bool {
        self.clauses.iter().all(|clause| clause.matches(record))
    }
}

impl Predicate for Query {
    fn matches(&self, record: &Value) -> bool {
        Query::matches(self, record)
    }
}

impl From<Map<String, Value>> for Query {
    fn from(map: Map<String, Value>) -> Self {
        Query {
            clauses: map
                .into_iter()
                .map(|(field, value)| FieldEquals { field, value })
                .collect(),
        }
    }
}

/// Equality used by queries: numbers compare numerically (`1 == 1.0`),
/// containers element-wise, everything else by value.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if x == y {
                return true;
            }
            if x.is_f64() || y.is_f64() {
                return matches!((x.as_f64(), y.as_f64()), (Some(x), Some(y)) if x == y);
            }
            false
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).map_or(false, |y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

// ============================================================================
// TESTS
// ============================================================================
