//! Find-related scenarios against the in-memory store.

use futures::{StreamExt, TryStreamExt};
use keyfind_core::{
    AccessPath, CoreError, Criterion, DerivedQuery, EntityCodec, Query, Sort, TemplateConfig,
    UNSORTED_OFFSET_MESSAGE,
};
use keyfind_storage::{IndexKind, Key, MemoryStoreConfig, StoreClient, StoreError, Value};
use keyfind_testkit::*;
use std::collections::HashSet;

fn derived(method: &str, args: &[Value]) -> Query {
    DerivedQuery::parse(method)
        .and_then(|derived| derived.bind(args))
        .expect("Failed to derive query")
}

fn sorted_ids(people: &[Person]) -> Vec<String> {
    let mut ids: Vec<String> = people.iter().map(|p| p.id.clone()).collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn find_by_id_returns_existing() {
    init_tracing();
    let template = TestTemplate::new();
    let id = next_id();
    template
        .save(Person::new(id.clone(), "Dave", "Matthews", 42))
        .await
        .unwrap();

    let found: Person = template.find_by_id(id.as_str()).await.unwrap().unwrap();
    assert_eq!(found.firstname, "Dave");
    assert_eq!(found.lastname, "Matthews");
}

#[tokio::test]
async fn find_by_id_absent() {
    let template = TestTemplate::new();
    let found: Option<Person> = template.find_by_id("dave-is-absent").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn find_by_id_absent_with_touch_on_read() {
    let template = TestTemplate::new();
    let found: Option<TouchOnReadDocument> =
        template.find_by_id("foo-is-absent").await.unwrap();
    assert!(found.is_none());
    assert_eq!(template.stats().touches, 0);
}

#[tokio::test]
async fn touch_on_read_increases_version() {
    let template = TestTemplate::new();
    let document = template
        .save(TouchOnReadDocument::new(next_id(), "1"))
        .await
        .unwrap();
    let saved_version = document.version.unwrap();

    let found: TouchOnReadDocument = template
        .find_by_id(document.id.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.version, Some(saved_version + 1));
}

#[tokio::test]
async fn touch_on_read_versions_strictly_increase() {
    let template = TestTemplate::new();
    let document = template
        .insert(TouchOnReadDocument::new(next_id(), "x"))
        .await
        .unwrap();

    let mut previous = document.version.unwrap();
    for _ in 0..5 {
        let found: TouchOnReadDocument = template
            .find_by_id(document.id.as_str())
            .await
            .unwrap()
            .unwrap();
        let version = found.version.unwrap();
        assert_eq!(version, previous + 1);
        previous = version;
    }
}

#[tokio::test]
async fn touch_on_read_resets_expiration() {
    let template = TestTemplate::new();
    let document = template
        .insert(TouchOnReadDocument::new(next_id(), "x"))
        .await
        .unwrap();
    template.store.advance_clock(std::time::Duration::from_secs(50));

    let _: TouchOnReadDocument = template
        .find_by_id(document.id.as_str())
        .await
        .unwrap()
        .unwrap();
    let key = template.key_for::<TouchOnReadDocument>(document.id.as_str());
    let record = template.store.get(&key).await.unwrap().unwrap();
    assert_eq!(record.ttl, Some(TouchOnReadDocument::EXPIRATION));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_touch_on_read_versions_are_distinct() {
    let template = TestTemplate::new();
    let document = template
        .insert(TouchOnReadDocument::new(next_id(), "x"))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let inner = template.template.clone();
        let id = document.id.clone();
        handles.push(tokio::spawn(async move {
            inner
                .find_by_id::<TouchOnReadDocument>(id.as_str())
                .await
                .unwrap()
                .unwrap()
                .version
                .unwrap()
        }));
    }

    let mut versions = HashSet::new();
    for handle in handles {
        assert!(versions.insert(handle.await.unwrap()));
    }
    assert_eq!(versions.len(), 8);
    assert!(versions.iter().all(|v| (2..=9).contains(v)));
}

#[tokio::test]
async fn touch_on_read_with_expiration_property_fails() {
    let template = TestTemplate::new();
    let document = template
        .insert(TouchOnReadExpiringDocument::new(next_id(), 60))
        .await
        .unwrap();
    template.reset_stats();

    let err = template
        .find_by_id::<TouchOnReadExpiringDocument>(document.id.as_str())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Configuration { .. }));
    assert_eq!(template.stats().total_calls(), 0);
}

#[tokio::test]
async fn find_all_finds_all_existing() {
    let template = TestTemplate::new();
    let people: Vec<Person> = (1..=10)
        .map(|age| Person::random("Dave", "Matthews", age))
        .collect();
    template.insert_all(people.clone()).await.unwrap();

    let found = collect(template.find_all::<Person>().unwrap()).await.unwrap();
    assert_eq!(sorted_ids(&found), sorted_ids(&people));
}

#[tokio::test]
async fn find_all_finds_nothing() {
    let template = TestTemplate::new();
    let found = collect(template.find_all::<Person>().unwrap()).await.unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn find_by_ids_empty() {
    let template = TestTemplate::new();
    let count = template
        .find_by_ids::<Person, _, _>(Vec::<String>::new())
        .unwrap()
        .count()
        .await;
    assert_eq!(count, 0);
    assert_eq!(template.stats().total_calls(), 0);
}

#[tokio::test]
async fn find_by_ids_finds_existing() {
    let template = TestTemplate::new();
    let dave = Person::random("Dave", "Matthews", 42);
    let james = Person::random("James", "Bond", 39);
    let matt = Person::random("Matt", "Groening", 70);
    template
        .insert_all(vec![dave.clone(), james.clone(), matt])
        .await
        .unwrap();

    let ids = vec!["unknown".to_string(), dave.id.clone(), james.id.clone()];
    let found = collect(template.find_by_ids::<Person, _, _>(ids).unwrap())
        .await
        .unwrap();
    assert_eq!(found, vec![dave, james]);
}

#[tokio::test]
async fn find_by_ids_spans_batches_in_order() {
    let template = TestTemplate::with_config(
        TemplateConfig::default().batch_size(3).max_concurrency(4),
        MemoryStoreConfig::default(),
    );
    let people = template
        .insert_all(Person::family("Matthews", 10))
        .await
        .unwrap();
    template.reset_stats();

    let mut ids: Vec<String> = people.iter().rev().map(|p| p.id.clone()).collect();
    ids.push(people[9].id.clone());
    let found = collect(template.find_by_ids::<Person, _, _>(ids).unwrap())
        .await
        .unwrap();

    let expected: Vec<Person> = people.into_iter().rev().collect();
    assert_eq!(found, expected);
    assert_eq!(template.stats().batch_gets, 4);
}

#[tokio::test]
async fn find_in_range_finds_limited_number() {
    let template = TestTemplate::new();
    let people: Vec<Person> = (20..27)
        .map(|_| Person::random("Firstname", "Lastname", 1))
        .collect();
    template.insert_all(people.clone()).await.unwrap();

    let found = collect(
        template
            .find_in_range::<Person>(0, 5, Sort::unsorted())
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(found.len(), 5);
    assert!(found.iter().all(|p| people.contains(p)));
}

#[tokio::test]
async fn find_in_range_skips() {
    let template = TestTemplate::new();
    template
        .insert_all(Person::family("Lastname", 7))
        .await
        .unwrap();

    let first = collect(template.find_in_range::<Person>(0, 5, Sort::unsorted()).unwrap())
        .await
        .unwrap();
    let rest = collect(template.find_in_range::<Person>(5, 5, Sort::unsorted()).unwrap())
        .await
        .unwrap();
    assert_eq!(first.len(), 5);
    assert_eq!(rest.len(), 2);

    let sorted = collect(template.find_in_range::<Person>(2, 3, Sort::desc("age")).unwrap())
        .await
        .unwrap();
    let ages: Vec<i64> = sorted.iter().map(|p| p.age).collect();
    assert_eq!(ages, [25, 24, 23]);
}

#[tokio::test]
async fn unsorted_query_with_offset_is_rejected() {
    let template = TestTemplate::new();
    let mut query = Query::new();
    query.set_offset(1);

    let err = template.find::<Person>(&query).err().unwrap();
    assert!(matches!(err, CoreError::InvalidQuery { .. }));
    assert_eq!(err.to_string(), UNSORTED_OFFSET_MESSAGE);

    // every entity type, before any store access
    assert!(template.find::<VersionedDocument>(&query).is_err());
    assert!(template.find::<TouchOnReadDocument>(&query).is_err());
    assert!(template.count_query::<Person>(&query).await.is_err());
    assert_eq!(template.stats().total_calls(), 0);
}

#[tokio::test]
async fn filter_equal() {
    let template = TestTemplate::new();
    template
        .ensure_index::<Person>("first_name_index", "firstname", IndexKind::String)
        .unwrap();
    let people: Vec<Person> = (1..=10)
        .map(|_| Person::random("Dave", "Matthews", 30))
        .collect();
    template.insert_all(people.clone()).await.unwrap();

    let query = derived("findPersonByFirstname", &[Value::from("Dave")]);
    let plan = template.resolver().resolve(&query, &Person::metadata()).unwrap();
    assert!(matches!(plan.access, AccessPath::IndexScan(_)));

    let found = collect(template.find::<Person>(&query).unwrap()).await.unwrap();
    assert_eq!(sorted_ids(&found), sorted_ids(&people));
}

async fn matthews_by_firstname(method: &str, descending: bool) {
    let template = TestTemplate::with_person_indexes();
    let mut people: Vec<Person> = (1..=10)
        .map(|n| Person::random(&format!("Dave{n}"), "Matthews", 40))
        .collect();
    // shuffle insertion order deterministically
    people.rotate_left(3);
    people.swap(0, 7);
    template.insert_all(people.clone()).await.unwrap();
    template
        .insert(Person::random("Dave0", "Beauford", 40))
        .await
        .unwrap();

    people.sort_by(|a, b| a.firstname.cmp(&b.firstname));
    if descending {
        people.reverse();
    }

    let query = derived(method, &[Value::from("Matthews")]);
    let found = collect(template.find::<Person>(&query).unwrap()).await.unwrap();
    assert_eq!(found, people);
}

#[tokio::test]
async fn filter_equal_order_by_asc() {
    matthews_by_firstname("findByLastnameOrderByFirstnameAsc", false).await;
}

#[tokio::test]
async fn filter_equal_order_by_desc() {
    matthews_by_firstname("findByLastnameOrderByFirstnameDesc", true).await;
}

#[tokio::test]
async fn filter_range() {
    let template = TestTemplate::with_person_indexes();
    let people: Vec<Person> = (21..=30)
        .map(|age| Person::random(&format!("Dave{age}"), "Matthews", age))
        .collect();
    template.insert_all(people.clone()).await.unwrap();

    let query = derived("findCustomerByAgeBetween", &[Value::from(25), Value::from(30)]);
    let found = collect(template.find::<Person>(&query).unwrap()).await.unwrap();
    assert_eq!(found.len(), 6);
    assert_eq!(sorted_ids(&found), sorted_ids(&people[4..10]));

    let same = collect(
        template
            .find_derived::<Person>("findByAgeBetween", &[Value::from(25), Value::from(30)])
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(same.len(), 6);
}

#[tokio::test]
async fn residual_filters_apply_before_touch() {
    let template = TestTemplate::new();
    for n in 0..6 {
        template
            .insert(TouchOnReadDocument::new(format!("d{n}"), if n % 2 == 0 { "even" } else { "odd" }))
            .await
            .unwrap();
    }
    template.reset_stats();

    let query = Query::new().filter(Criterion::equal("content", "even"));
    let found = collect(template.find::<TouchOnReadDocument>(&query).unwrap())
        .await
        .unwrap();
    assert_eq!(found.len(), 3);
    assert_eq!(template.stats().touches, 3);
}

#[tokio::test]
async fn store_failure_mid_stream() {
    let template = TestTemplate::with_config(
        TemplateConfig::default().max_concurrency(1),
        MemoryStoreConfig::default().scan_page_size(3),
    );
    template
        .insert_all(Person::family("Matthews", 9))
        .await
        .unwrap();

    let mut stream = template.find_all::<Person>().unwrap();
    for _ in 0..3 {
        assert!(stream.next().await.unwrap().is_ok());
    }
    template.store.fail_next(StoreError::unavailable("node down"));
    let err = stream.next().await.unwrap().unwrap_err();
    assert!(matches!(err, CoreError::Store(StoreError::Unavailable { .. })));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn versions_track_generations() {
    let template = TestTemplate::new();
    let id = next_id();
    template
        .insert(VersionedDocument::new(id.clone(), "foobar"))
        .await
        .unwrap();
    template
        .update(VersionedDocument::new(id.clone(), "foobar1"))
        .await
        .unwrap();
    template
        .update(VersionedDocument::new(id.clone(), "foobar2"))
        .await
        .unwrap();

    let raw = template
        .store
        .get(&Key::new("test", "versioned-set", id.as_str()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(raw.generation, 3);

    let found: VersionedDocument = template.find_by_id(id.as_str()).await.unwrap().unwrap();
    assert_eq!(found.version, Some(3));
    assert_eq!(found.field, "foobar2");
}

#[tokio::test]
async fn dropping_a_stream_stops_the_scan() {
    let template = TestTemplate::with_config(
        TemplateConfig::default().max_concurrency(1),
        MemoryStoreConfig::default().scan_page_size(2),
    );
    template
        .insert_all(Person::family("Matthews", 10))
        .await
        .unwrap();
    template.reset_stats();

    let mut stream = template.find_all::<Person>().unwrap();
    assert!(stream.next().await.is_some());
    drop(stream);

    assert_eq!(template.store.active_scans(), 0);
    assert_eq!(template.stats().scan_pages, 1);
}
