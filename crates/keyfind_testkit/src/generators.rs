//! Property-based test generators using proptest.
//!
//! Provides strategies for generating people, id lists and sorts that
//! stay within the shapes the engine indexes and compares.

use crate::fixtures::Person;
use keyfind_core::{Direction, Order, Sort};
use proptest::prelude::*;

/// Last names drawn from a small pool so equality queries hit several people.
pub const LAST_NAMES: [&str; 4] = ["Matthews", "Beauford", "Tinsley", "Lessard"];

/// Strategy for generating valid user keys.
pub fn person_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9]{0,11}").expect("Invalid regex")
}

/// Strategy for generating ages.
pub fn age_strategy() -> impl Strategy<Value = i64> {
    0i64..100
}

/// Strategy for generating one person with a given id.
pub fn person_strategy(id: String) -> impl Strategy<Value = Person> {
    (
        prop::string::string_regex("[A-Z][a-z]{0,7}").expect("Invalid regex"),
        prop::sample::select(LAST_NAMES.to_vec()),
        age_strategy(),
    )
        .prop_map(move |(firstname, lastname, age)| Person::new(id.clone(), &firstname, lastname, age))
}

/// Strategy for generating people with distinct ids.
pub fn people_strategy(max: usize) -> impl Strategy<Value = Vec<Person>> {
    prop::collection::btree_set(person_id_strategy(), 0..=max).prop_flat_map(|ids| {
        ids.into_iter()
            .map(person_strategy)
            .collect::<Vec<_>>()
    })
}

/// Strategy for generating an inclusive age range, possibly inverted.
pub fn age_range_strategy() -> impl Strategy<Value = (i64, i64)> {
    (age_strategy(), age_strategy())
}

/// Strategy for generating a non-empty sort over person bins.
pub fn person_sort_strategy() -> impl Strategy<Value = Sort> {
    prop::collection::vec(
        (
            prop::sample::select(vec!["firstname", "lastname", "age"]),
            prop::bool::ANY,
        ),
        1..=3,
    )
    .prop_map(|keys| {
        Sort::by(
            keys.into_iter()
                .map(|(field, descending)| {
                    let direction = if descending {
                        Direction::Desc
                    } else {
                        Direction::Asc
                    };
                    Order::new(field, direction)
                })
                .collect(),
        )
    })
}

/// Strategy for generating lookup ids: a mix of known ids (with repeats)
/// and ids no person has.
pub fn lookup_ids_strategy(known: Vec<String>) -> impl Strategy<Value = Vec<String>> {
    let unknown = prop::string::string_regex("unknown-[0-9]{1,3}").expect("Invalid regex");
    let pick = if known.is_empty() {
        unknown.boxed()
    } else {
        prop_oneof![3 => prop::sample::select(known), 1 => unknown].boxed()
    };
    prop::collection::vec(pick, 0..20)
}
