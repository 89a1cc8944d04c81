//! Query criteria and their client-side evaluation.

use keyfind_storage::{Bins, Value};
use std::mem::discriminant;

/// A comparison applied to one bin.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Bin equals the value. A missing bin equals `Null`.
    Equal(Value),
    /// Bin differs from the value.
    NotEqual(Value),
    /// Bin lies within `[low, high]`.
    Between(Value, Value),
    /// Bin is greater than the value.
    GreaterThan(Value),
    /// Bin is greater than or equal to the value.
    GreaterThanOrEqual(Value),
    /// Bin is less than the value.
    LessThan(Value),
    /// Bin is less than or equal to the value.
    LessThanOrEqual(Value),
    /// Bin equals one of the values.
    In(Vec<Value>),
    /// Text bin starts with the prefix.
    StartsWith(String),
    /// Text bin contains the text, or list bin contains the element.
    Contains(Value),
}

impl Condition {
    /// Evaluates the condition against a bin value.
    ///
    /// Ordering comparisons only hold between values of the same kind, so
    /// `GreaterThan(5)` never matches a text bin.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Condition::Equal(expected) => value == expected,
            Condition::NotEqual(expected) => value != expected,
            Condition::Between(low, high) => {
                same_kind(value, low) && same_kind(value, high) && low <= value && value <= high
            }
            Condition::GreaterThan(bound) => same_kind(value, bound) && value > bound,
            Condition::GreaterThanOrEqual(bound) => same_kind(value, bound) && value >= bound,
            Condition::LessThan(bound) => same_kind(value, bound) && value < bound,
            Condition::LessThanOrEqual(bound) => same_kind(value, bound) && value <= bound,
            Condition::In(values) => values.contains(value),
            Condition::StartsWith(prefix) => value
                .as_text()
                .is_some_and(|text| text.starts_with(prefix.as_str())),
            Condition::Contains(needle) => match (value, needle) {
                (Value::Text(text), Value::Text(part)) => text.contains(part.as_str()),
                (Value::List(items), element) => items.contains(element),
                _ => false,
            },
        }
    }
}

fn same_kind(a: &Value, b: &Value) -> bool {
    discriminant(a) == discriminant(b)
}

/// One conjunct of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// Record key equals the value.
    Id(Value),
    /// Record key is one of the values.
    IdIn(Vec<Value>),
    /// A bin satisfies a condition.
    Field {
        /// Bin name.
        bin: String,
        /// Condition on the bin.
        condition: Condition,
    },
}

impl Criterion {
    /// Matches one record key.
    pub fn id(id: impl Into<Value>) -> Self {
        Criterion::Id(id.into())
    }

    /// Matches any of several record keys.
    pub fn id_in<I, V>(ids: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Criterion::IdIn(ids.into_iter().map(Into::into).collect())
    }

    /// Applies a condition to a bin.
    pub fn field(bin: impl Into<String>, condition: Condition) -> Self {
        Criterion::Field {
            bin: bin.into(),
            condition,
        }
    }

    /// Bin equals value.
    pub fn equal(bin: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(bin, Condition::Equal(value.into()))
    }

    /// Bin within `[low, high]`.
    pub fn between(bin: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::field(bin, Condition::Between(low.into(), high.into()))
    }

    /// Returns true for `Id` and `IdIn`.
    pub fn is_identity(&self) -> bool {
        matches!(self, Criterion::Id(_) | Criterion::IdIn(_))
    }

    /// Evaluates the criterion against a record's key and bins.
    pub fn matches(&self, user_key: &Value, bins: &Bins) -> bool {
        match self {
            Criterion::Id(id) => user_key == id,
            Criterion::IdIn(ids) => ids.contains(user_key),
            Criterion::Field { bin, condition } => {
                condition.matches(bins.get(bin).unwrap_or(&Value::Null))
            }
        }
    }
}
