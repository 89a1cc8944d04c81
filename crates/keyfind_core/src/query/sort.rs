//! Sort specifications and bin comparison.

use keyfind_storage::{Bins, Value};
use std::cmp::Ordering;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

/// One ordering key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Bin to order by.
    pub field: String,
    /// Direction.
    pub direction: Direction,
}

impl Order {
    /// Creates an order.
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Ordered list of sort keys, most significant first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    /// A sort with no orders.
    #[must_use]
    pub fn unsorted() -> Self {
        Self::default()
    }

    /// Sorts ascending by one bin.
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self::unsorted().then_asc(field)
    }

    /// Sorts descending by one bin.
    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self::unsorted().then_desc(field)
    }

    /// Creates a sort from orders.
    #[must_use]
    pub fn by(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    /// Adds an ascending tie-breaker.
    #[must_use]
    pub fn then_asc(mut self, field: impl Into<String>) -> Self {
        self.orders.push(Order::new(field, Direction::Asc));
        self
    }

    /// Adds a descending tie-breaker.
    #[must_use]
    pub fn then_desc(mut self, field: impl Into<String>) -> Self {
        self.orders.push(Order::new(field, Direction::Desc));
        self
    }

    /// Returns the orders.
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Returns true if there are no orders.
    pub fn is_unsorted(&self) -> bool {
        self.orders.is_empty()
    }

    /// Compares two records' bins. A missing bin sorts as `Null`.
    pub fn compare(&self, left: &Bins, right: &Bins) -> Ordering {
        for order in &self.orders {
            let a = left.get(&order.field).unwrap_or(&Value::Null);
            let b = right.get(&order.field).unwrap_or(&Value::Null);
            let ordering = match order.direction {
                Direction::Asc => a.cmp(b),
                Direction::Desc => b.cmp(a),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}
