//! Secondary index definitions and index-backed scan filters.

use crate::value::Value;

/// Value type a secondary index accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// Text values; serves equality filters.
    String,
    /// Integer values; serves equality and range filters.
    Numeric,
}

impl IndexKind {
    /// Returns true if a value of this shape is indexed.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            IndexKind::String => matches!(value, Value::Text(_)),
            IndexKind::Numeric => matches!(value, Value::Integer(_)),
        }
    }
}

/// A registered secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    /// Index name, unique per namespace.
    pub name: String,
    /// Namespace the index lives in.
    pub namespace: String,
    /// Set the index covers.
    pub set: String,
    /// Indexed bin.
    pub bin: String,
    /// Indexed value type.
    pub kind: IndexKind,
}

/// A predicate a secondary index can evaluate store-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexFilter {
    /// Bin equals value.
    Equal {
        /// Indexed bin.
        bin: String,
        /// Value to match.
        value: Value,
    },
    /// Integer bin within `[low, high]`, both inclusive.
    Range {
        /// Indexed bin.
        bin: String,
        /// Lower bound.
        low: i64,
        /// Upper bound.
        high: i64,
    },
}

impl IndexFilter {
    /// Creates an equality filter.
    pub fn equal(bin: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equal {
            bin: bin.into(),
            value: value.into(),
        }
    }

    /// Creates an inclusive range filter.
    pub fn range(bin: impl Into<String>, low: i64, high: i64) -> Self {
        Self::Range {
            bin: bin.into(),
            low,
            high,
        }
    }

    /// Bin the filter applies to.
    pub fn bin(&self) -> &str {
        match self {
            IndexFilter::Equal { bin, .. } | IndexFilter::Range { bin, .. } => bin,
        }
    }

    /// Evaluates the filter against a bin value.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            IndexFilter::Equal { value: expected, .. } => value == expected,
            IndexFilter::Range { low, high, .. } => value
                .as_integer()
                .is_some_and(|n| *low <= n && n <= *high),
        }
    }

    /// Returns true if an index of `kind` can serve this filter.
    pub fn served_by(&self, kind: IndexKind) -> bool {
        match self {
            IndexFilter::Equal { value, .. } => kind.accepts(value),
            IndexFilter::Range { .. } => kind == IndexKind::Numeric,
        }
    }
}
