//! Logical queries: criteria, ordering and windowing.
//!
//! A [`Query`] says what to find, never how. The
//! [`CriteriaResolver`](crate::CriteriaResolver) turns it into an
//! [`ExecutionPlan`](crate::ExecutionPlan).

mod criteria;
pub mod derived;
mod sort;

pub use criteria::{Condition, Criterion};
pub use derived::DerivedQuery;
pub use sort::{Direction, Order, Sort};

/// A logical query over one entity type.
///
/// A query is unsorted when it has no sort or a sort with no orders. An
/// unsorted query must not carry an offset; resolving one fails with
/// [`CoreError::InvalidQuery`](crate::CoreError::InvalidQuery).
///
/// # Example
///
/// ```rust
/// use keyfind_core::{Criterion, Query, Sort};
///
/// let query = Query::new()
///     .filter(Criterion::between("age", 25, 30))
///     .sort(Sort::asc("firstname"))
///     .offset(10)
///     .limit(5);
///
/// assert!(!query.is_unsorted());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Conjunction of criteria. Empty matches every record.
    pub criteria: Vec<Criterion>,
    /// Requested ordering.
    pub sort: Option<Sort>,
    /// Matches to skip.
    pub offset: Option<u64>,
    /// Maximum matches to return.
    pub limit: Option<u64>,
}

impl Query {
    /// Creates a query matching everything, unsorted and unwindowed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query from criteria.
    #[must_use]
    pub fn with_criteria(criteria: Vec<Criterion>) -> Self {
        Self {
            criteria,
            ..Self::default()
        }
    }

    /// Adds a criterion.
    #[must_use]
    pub fn filter(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    /// Sets the ordering.
    #[must_use]
    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Sets the offset.
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the limit.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the offset in place.
    pub fn set_offset(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    /// Returns true if the query carries no ordering.
    pub fn is_unsorted(&self) -> bool {
        self.orders().is_empty()
    }

    /// Returns the orders, empty when unsorted.
    pub fn orders(&self) -> &[Order] {
        self.sort.as_ref().map_or(&[], Sort::orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sort_counts_as_unsorted() {
        assert!(Query::new().is_unsorted());
        assert!(Query::new().sort(Sort::unsorted()).is_unsorted());
        assert!(!Query::new().sort(Sort::desc("age")).is_unsorted());
    }

    #[test]
    fn builder_sets_window() {
        let mut query = Query::new().limit(3);
        query.set_offset(2);
        assert_eq!(query.offset, Some(2));
        assert_eq!(query.limit, Some(3));
        assert!(query.orders().is_empty());
    }

    #[test]
    fn with_criteria_keeps_order() {
        let query = Query::with_criteria(vec![
            Criterion::equal("lastname", "Matthews"),
            Criterion::id("p1"),
        ]);
        assert_eq!(query.criteria.len(), 2);
        assert!(query.criteria[1].is_identity());
    }
}
