//! Criteria resolution: from a logical [`Query`] to an [`ExecutionPlan`].
//!
//! Resolution is pure with respect to the store: it consults the index
//! catalog but never reads or writes records, so every error it raises
//! happens before any store access.
//!
//! # Access path selection
//!
//! 1. A lone `Id` criterion on an unsorted query is a point lookup.
//! 2. Any `Id`/`IdIn` criteria become a batch lookup over their
//!    intersection, in first-occurrence order with duplicates removed.
//! 3. Otherwise the first field criterion a secondary index can serve
//!    becomes an index scan.
//! 4. Otherwise the set is scanned in full.
//!
//! Criteria not consumed by the access path are evaluated client-side. The
//! store never orders results, so sorted queries are sorted client-side.

use crate::entity::EntityMetadata;
use crate::error::{CoreError, CoreResult};
use crate::query::{Condition, Criterion, Query, Sort};
use keyfind_storage::{IndexCatalog, IndexFilter, IndexKind, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// How records are fetched from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessPath {
    /// Single-key read.
    ByKey(Value),
    /// Batched multi-key read, in this order.
    ByKeys(Vec<Value>),
    /// Scan of the whole set.
    FullScan,
    /// Scan through a secondary index.
    IndexScan(IndexFilter),
}

/// Where ordering happens.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOrdering {
    /// Store order, unspecified.
    Unordered,
    /// Buffer all matches and sort them before windowing.
    ClientSide(Sort),
}

/// Offset and limit applied to the matched records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    /// Matches to skip.
    pub offset: u64,
    /// Maximum matches to return.
    pub limit: Option<u64>,
}

impl Window {
    /// Returns true if the window passes everything through.
    pub fn is_unbounded(&self) -> bool {
        self.offset == 0 && self.limit.is_none()
    }
}

/// Resolved strategy for one find call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    /// How records are fetched.
    pub access: AccessPath,
    /// Criteria checked against each fetched record.
    pub residual: Vec<Criterion>,
    /// Where ordering happens.
    pub ordering: PlanOrdering,
    /// Window over the ordered matches.
    pub window: Window,
}

impl ExecutionPlan {
    /// A full scan with no filtering or windowing.
    pub fn full_scan() -> Self {
        Self {
            access: AccessPath::FullScan,
            residual: Vec::new(),
            ordering: PlanOrdering::Unordered,
            window: Window::default(),
        }
    }
}

/// Turns queries into execution plans.
#[derive(Clone)]
pub struct CriteriaResolver {
    namespace: String,
    catalog: Arc<dyn IndexCatalog>,
    scan_warnings: bool,
}

impl std::fmt::Debug for CriteriaResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CriteriaResolver")
            .field("namespace", &self.namespace)
            .field("scan_warnings", &self.scan_warnings)
            .finish_non_exhaustive()
    }
}

impl CriteriaResolver {
    /// Creates a resolver over an index catalog.
    pub fn new(
        namespace: impl Into<String>,
        catalog: Arc<dyn IndexCatalog>,
        scan_warnings: bool,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            catalog,
            scan_warnings,
        }
    }

    /// Resolves a query for an entity type.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Configuration`] if the type's metadata is contradictory
    /// - [`CoreError::InvalidQuery`] if an unsorted query carries an offset
    pub fn resolve(&self, query: &Query, metadata: &EntityMetadata) -> CoreResult<ExecutionPlan> {
        metadata.validate()?;

        if query.offset.is_some() && query.is_unsorted() {
            return Err(CoreError::unsorted_offset());
        }

        let (access, residual) = self.select_access(query, metadata);
        let ordering = if query.is_unsorted() {
            PlanOrdering::Unordered
        } else {
            PlanOrdering::ClientSide(query.sort.clone().unwrap_or_default())
        };

        let plan = ExecutionPlan {
            access,
            residual,
            ordering,
            window: Window {
                offset: query.offset.unwrap_or(0),
                limit: query.limit,
            },
        };
        debug!(set = metadata.set, access = ?plan.access, residual = plan.residual.len(), "resolved query");
        Ok(plan)
    }

    /// Resolves a paged scan of the whole set.
    ///
    /// Unlike [`resolve`](Self::resolve), an offset is accepted without a
    /// sort: the caller asked for "some `limit` records after `offset`".
    pub fn resolve_range(
        &self,
        metadata: &EntityMetadata,
        offset: u64,
        limit: u64,
        sort: Sort,
    ) -> CoreResult<ExecutionPlan> {
        metadata.validate()?;
        Ok(ExecutionPlan {
            access: AccessPath::FullScan,
            residual: Vec::new(),
            ordering: if sort.is_unsorted() {
                PlanOrdering::Unordered
            } else {
                PlanOrdering::ClientSide(sort)
            },
            window: Window {
                offset,
                limit: Some(limit),
            },
        })
    }

    fn select_access(
        &self,
        query: &Query,
        metadata: &EntityMetadata,
    ) -> (AccessPath, Vec<Criterion>) {
        let criteria = &query.criteria;

        if let [Criterion::Id(id)] = criteria.as_slice() {
            if query.is_unsorted() {
                return (AccessPath::ByKey(id.clone()), Vec::new());
            }
        }

        if criteria.iter().any(Criterion::is_identity) {
            let (identity, residual): (Vec<_>, Vec<_>) =
                criteria.iter().cloned().partition(Criterion::is_identity);
            return (AccessPath::ByKeys(intersect_ids(&identity)), residual);
        }

        for (position, criterion) in criteria.iter().enumerate() {
            if let Some(filter) = self.index_filter(criterion, metadata) {
                let mut residual = criteria.clone();
                residual.remove(position);
                return (AccessPath::IndexScan(filter), residual);
            }
        }

        if !criteria.is_empty() && self.scan_warnings {
            warn!(
                set = metadata.set,
                criteria = criteria.len(),
                "no secondary index serves this query, falling back to a full scan"
            );
        }
        (AccessPath::FullScan, criteria.clone())
    }

    fn index_filter(&self, criterion: &Criterion, metadata: &EntityMetadata) -> Option<IndexFilter> {
        let Criterion::Field { bin, condition } = criterion else {
            return None;
        };
        let index = self.catalog.find_index(&self.namespace, metadata.set, bin)?;
        let filter = match (index.kind, condition) {
            (IndexKind::String, Condition::Equal(value @ Value::Text(_))) => {
                IndexFilter::equal(bin.as_str(), value.clone())
            }
            (IndexKind::Numeric, condition) => numeric_filter(bin, condition)?,
            _ => return None,
        };
        Some(filter)
    }
}

fn numeric_filter(bin: &str, condition: &Condition) -> Option<IndexFilter> {
    let filter = match condition {
        Condition::Equal(Value::Integer(n)) => IndexFilter::equal(bin, *n),
        Condition::Between(Value::Integer(low), Value::Integer(high)) => {
            IndexFilter::range(bin, *low, *high)
        }
        Condition::GreaterThan(Value::Integer(n)) => {
            IndexFilter::range(bin, n.checked_add(1)?, i64::MAX)
        }
        Condition::GreaterThanOrEqual(Value::Integer(n)) => IndexFilter::range(bin, *n, i64::MAX),
        Condition::LessThan(Value::Integer(n)) => {
            IndexFilter::range(bin, i64::MIN, n.checked_sub(1)?)
        }
        Condition::LessThanOrEqual(Value::Integer(n)) => IndexFilter::range(bin, i64::MIN, *n),
        _ => return None,
    };
    Some(filter)
}

/// Intersects identity criteria, keeping first-occurrence order.
fn intersect_ids(identity: &[Criterion]) -> Vec<Value> {
    let mut result: Option<Vec<Value>> = None;
    for criterion in identity {
        let ids: &[Value] = match criterion {
            Criterion::Id(id) => std::slice::from_ref(id),
            Criterion::IdIn(ids) => ids,
            Criterion::Field { .. } => continue,
        };
        result = Some(match result {
            None => {
                let mut seen = HashSet::new();
                ids.iter().filter(|id| seen.insert(*id)).cloned().collect()
            }
            Some(current) => current.into_iter().filter(|id| ids.contains(id)).collect(),
        });
    }
    result.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ExpirationPolicy;
    use keyfind_storage::MemoryStore;

    const PERSON: EntityMetadata = EntityMetadata::new("person");

    fn resolver() -> CriteriaResolver {
        let store = MemoryStore::new();
        store
            .ensure_index("test", "person", "age_index", "age", IndexKind::Numeric)
            .unwrap();
        store
            .ensure_index("test", "person", "last_name_index", "lastname", IndexKind::String)
            .unwrap();
        CriteriaResolver::new("test", Arc::new(store), true)
    }

    #[test]
    fn unsorted_offset_is_rejected() {
        let query = Query::new().offset(1);
        let err = resolver().resolve(&query, &PERSON).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsorted query must not have offset value. For retrieving paged results use sorted query."
        );

        let empty_sort = Query::new().sort(Sort::unsorted()).offset(1);
        assert!(resolver().resolve(&empty_sort, &PERSON).is_err());
    }

    #[test]
    fn sorted_offset_is_accepted() {
        let query = Query::new().sort(Sort::asc("age")).offset(2).limit(3);
        let plan = resolver().resolve(&query, &PERSON).unwrap();
        assert_eq!(plan.ordering, PlanOrdering::ClientSide(Sort::asc("age")));
        assert_eq!(plan.window, Window { offset: 2, limit: Some(3) });
    }

    #[test]
    fn configuration_error_comes_first() {
        let metadata = EntityMetadata::new("doc")
            .touch_on_read()
            .expiration(ExpirationPolicy::Property);
        let err = resolver()
            .resolve(&Query::new().offset(1), &metadata)
            .unwrap_err();
        assert!(matches!(err, CoreError::Configuration { .. }));
    }

    #[test]
    fn lone_id_is_a_point_lookup() {
        let plan = resolver()
            .resolve(&Query::new().filter(Criterion::id("p1")), &PERSON)
            .unwrap();
        assert_eq!(plan.access, AccessPath::ByKey(Value::from("p1")));
        assert!(plan.residual.is_empty());
    }

    #[test]
    fn sorted_id_lookup_becomes_batch() {
        let query = Query::new().filter(Criterion::id("p1")).sort(Sort::asc("age"));
        let plan = resolver().resolve(&query, &PERSON).unwrap();
        assert_eq!(plan.access, AccessPath::ByKeys(vec![Value::from("p1")]));
    }

    #[test]
    fn id_in_dedups_and_keeps_residual() {
        let query = Query::new()
            .filter(Criterion::id_in(["b", "a", "b", "c"]))
            .filter(Criterion::equal("lastname", "Matthews"));
        let plan = resolver().resolve(&query, &PERSON).unwrap();
        assert_eq!(
            plan.access,
            AccessPath::ByKeys(vec![Value::from("b"), Value::from("a"), Value::from("c")])
        );
        assert_eq!(plan.residual, vec![Criterion::equal("lastname", "Matthews")]);
    }

    #[test]
    fn identity_criteria_intersect() {
        let query = Query::new()
            .filter(Criterion::id_in(["a", "b", "c"]))
            .filter(Criterion::id_in(["c", "a"]));
        let plan = resolver().resolve(&query, &PERSON).unwrap();
        assert_eq!(
            plan.access,
            AccessPath::ByKeys(vec![Value::from("a"), Value::from("c")])
        );
    }

    #[test]
    fn empty_id_in_is_an_empty_batch() {
        let query = Query::new().filter(Criterion::IdIn(Vec::new()));
        let plan = resolver().resolve(&query, &PERSON).unwrap();
        assert_eq!(plan.access, AccessPath::ByKeys(Vec::new()));
    }

    #[test]
    fn indexed_between_becomes_range_scan() {
        let query = Query::new()
            .filter(Criterion::equal("firstname", "Dave"))
            .filter(Criterion::between("age", 25, 30));
        let plan = resolver().resolve(&query, &PERSON).unwrap();
        assert_eq!(
            plan.access,
            AccessPath::IndexScan(IndexFilter::range("age", 25, 30))
        );
        assert_eq!(plan.residual, vec![Criterion::equal("firstname", "Dave")]);
    }

    #[test]
    fn string_index_serves_text_equality_only() {
        let plan = resolver()
            .resolve(&Query::new().filter(Criterion::equal("lastname", "Matthews")), &PERSON)
            .unwrap();
        assert_eq!(
            plan.access,
            AccessPath::IndexScan(IndexFilter::equal("lastname", "Matthews"))
        );

        let starts = Criterion::field("lastname", Condition::StartsWith("Ma".into()));
        let plan = resolver()
            .resolve(&Query::new().filter(starts.clone()), &PERSON)
            .unwrap();
        assert_eq!(plan.access, AccessPath::FullScan);
        assert_eq!(plan.residual, vec![starts]);
    }

    #[test]
    fn comparisons_map_to_ranges() {
        let resolver = resolver();
        let cases = [
            (Condition::GreaterThan(Value::from(5)), IndexFilter::range("age", 6, i64::MAX)),
            (Condition::GreaterThanOrEqual(Value::from(5)), IndexFilter::range("age", 5, i64::MAX)),
            (Condition::LessThan(Value::from(5)), IndexFilter::range("age", i64::MIN, 4)),
            (Condition::LessThanOrEqual(Value::from(5)), IndexFilter::range("age", i64::MIN, 5)),
            (Condition::Equal(Value::from(5)), IndexFilter::equal("age", 5)),
        ];
        for (condition, expected) in cases {
            let query = Query::new().filter(Criterion::field("age", condition));
            let plan = resolver.resolve(&query, &PERSON).unwrap();
            assert_eq!(plan.access, AccessPath::IndexScan(expected));
            assert!(plan.residual.is_empty());
        }
    }

    #[test]
    fn overflowing_comparison_falls_back_to_scan() {
        let query = Query::new().filter(Criterion::field(
            "age",
            Condition::GreaterThan(Value::Integer(i64::MAX)),
        ));
        let plan = resolver().resolve(&query, &PERSON).unwrap();
        assert_eq!(plan.access, AccessPath::FullScan);
        assert_eq!(plan.residual.len(), 1);
    }

    #[test]
    fn unindexed_set_scans_everything() {
        let metadata = EntityMetadata::new("customer");
        let query = Query::new().filter(Criterion::between("age", 25, 30));
        let plan = resolver().resolve(&query, &metadata).unwrap();
        assert_eq!(plan.access, AccessPath::FullScan);
        assert_eq!(plan.residual.len(), 1);
    }

    #[test]
    fn range_plan_allows_unsorted_offset() {
        let plan = resolver()
            .resolve_range(&PERSON, 3, 5, Sort::unsorted())
            .unwrap();
        assert_eq!(plan.access, AccessPath::FullScan);
        assert_eq!(plan.ordering, PlanOrdering::Unordered);
        assert_eq!(plan.window, Window { offset: 3, limit: Some(5) });
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn unsorted_offset_always_rejected(offset in any::<u64>(), ids in prop::collection::vec("[a-z]{1,4}", 0..5)) {
                let query = Query::new().filter(Criterion::id_in(ids)).offset(offset);
                let err = resolver().resolve(&query, &PERSON).unwrap_err();
                prop_assert_eq!(err, CoreError::unsorted_offset());
            }

            #[test]
            fn batch_keys_are_distinct_and_ordered(ids in prop::collection::vec("[a-e]", 0..12)) {
                let query = Query::new().filter(Criterion::id_in(ids.clone()));
                let plan = resolver().resolve(&query, &PERSON).unwrap();
                let AccessPath::ByKeys(keys) = plan.access else {
                    return Err(TestCaseError::fail("expected a batch read"));
                };
                let mut expected: Vec<Value> = Vec::new();
                for id in ids {
                    let id = Value::from(id);
                    if !expected.contains(&id) {
                        expected.push(id);
                    }
                }
                prop_assert_eq!(keys, expected);
            }
        }
    }
}
