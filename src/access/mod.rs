//! Access control
//!
//! Every collection operation is gated by an access predicate. A predicate
//! looks at the requesting user (possibly anonymous) and answers with an
//! [`Access`]:
//!
//! - `Allow` - unrestricted
//! - `Deny` - refused outright
//! - `Filter(Where)` - only documents matching the expression are visible
//!
//! A [`Where`] expression can be evaluated in memory against any
//! [`Document`] or compiled into a parameterised SQL predicate that the
//! repositories append to their queries, so the database and the in-memory
//! check always agree.

pub mod collections;

pub use collections::{Collection, Operation};

use serde::Serialize;

/// A scalar field value as seen by access expressions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Bool(bool),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Anything an access expression can be evaluated against
pub trait Document {
    /// Value of the named field, `Value::Null` when absent
    fn field(&self, name: &str) -> Value;
}

/// Declarative filter expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Where {
    /// `field = value`. Never matches when `value` is null.
    Equals(&'static str, Value),
    /// `field IS NOT NULL` when `true`, `field IS NULL` when `false`
    Exists(&'static str, bool),
    And(Vec<Where>),
    Or(Vec<Where>),
}

impl Where {
    pub fn equals(field: &'static str, value: impl Into<Value>) -> Self {
        Where::Equals(field, value.into())
    }

    pub fn exists(field: &'static str, exists: bool) -> Self {
        Where::Exists(field, exists)
    }

    /// Expression matching every document
    pub fn all() -> Self {
        Where::And(Vec::new())
    }

    /// Conjunction of `self` and `other`, flattening nested `And`s
    pub fn and(self, other: Where) -> Self {
        match (self, other) {
            (Where::And(mut a), Where::And(b)) => {
                a.extend(b);
                Where::And(a)
            }
            (Where::And(mut a), w) | (w, Where::And(mut a)) => {
                a.push(w);
                Where::And(a)
            }
            (a, b) => Where::And(vec![a, b]),
        }
    }

    /// Evaluate against a document
    pub fn matches(&self, doc: &dyn Document) -> bool {
        match self {
            Where::Equals(field, value) => !value.is_null() && doc.field(field) == *value,
            Where::Exists(field, exists) => !doc.field(field).is_null() == *exists,
            Where::And(items) => items.iter().all(|w| w.matches(doc)),
            Where::Or(items) => items.iter().any(|w| w.matches(doc)),
        }
    }

    /// Compile into a SQL predicate with `?` placeholders.
    ///
    /// Field names are compile-time identifiers and are emitted verbatim;
    /// every value goes through a bind parameter.
    pub fn to_sql(&self) -> SqlFilter {
        let mut binds = Vec::new();
        let clause = self.write_sql(&mut binds);
        SqlFilter { clause, binds }
    }

    fn write_sql(&self, binds: &mut Vec<Value>) -> String {
        match self {
            Where::Equals(field, value) => {
                binds.push(value.clone());
                format!("{} = ?", field)
            }
            Where::Exists(field, true) => format!("{} IS NOT NULL", field),
            Where::Exists(field, false) => format!("{} IS NULL", field),
            Where::And(items) if items.is_empty() => "1 = 1".to_string(),
            Where::Or(items) if items.is_empty() => "1 = 0".to_string(),
            Where::And(items) => join_sql(items, " AND ", binds),
            Where::Or(items) => join_sql(items, " OR ", binds),
        }
    }
}

fn join_sql(items: &[Where], separator: &str, binds: &mut Vec<Value>) -> String {
    let parts: Vec<String> = items.iter().map(|w| w.write_sql(binds)).collect();
    format!("({})", parts.join(separator))
}

/// Compiled SQL predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFilter {
    pub clause: String,
    pub binds: Vec<Value>,
}

/// Outcome of an access predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Access {
    Allow,
    Deny,
    Filter(Where),
}

impl Access {
    /// Map a boolean predicate result
    pub fn from_bool(allowed: bool) -> Self {
        if allowed {
            Access::Allow
        } else {
            Access::Deny
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Access::Deny)
    }

    /// The filter a query must apply, `None` when access is denied
    pub fn filter(&self) -> Option<Where> {
        match self {
            Access::Allow => Some(Where::all()),
            Access::Deny => None,
            Access::Filter(w) => Some(w.clone()),
        }
    }

    /// Whether a specific document is accessible
    pub fn permits(&self, doc: &dyn Document) -> bool {
        match self {
            Access::Allow => true,
            Access::Deny => false,
            Access::Filter(w) => w.matches(doc),
        }
    }
}

/// Bind a slice of [`Value`]s onto a sqlx query in order.
///
/// Works for `query`/`query_as`/`query_scalar` builders of either driver.
#[macro_export]
macro_rules! bind_values {
    ($query:expr, $values:expr) => {{
        let mut query = $query;
        for value in $values {
            query = match value {
                $crate::access::Value::Null => query.bind(None::<i64>),
                $crate::access::Value::Int(v) => query.bind(*v),
                $crate::access::Value::Bool(v) => query.bind(*v),
                $crate::access::Value::Text(v) => query.bind(v.as_str()),
            };
        }
        query
    }};
}
