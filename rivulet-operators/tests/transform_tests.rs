// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rivulet_core::{Observable, RivuletError};
use rivulet_operators::prelude::*;
use rivulet_test_utils::TestObserver;

#[test]
fn filter_then_map_over_a_range() {
    // range(1,5) | filter(even) | map(x -> x*10) => [20, 40]
    let observer = TestObserver::new();
    Observable::range(1, 5)
        .filter(|n| n % 2 == 0)
        .map(|n| n * 10)
        .subscribe(observer.arc());

    observer.assert_values(&[20, 40]);
    observer.assert_completed();
}

#[test]
fn map_panic_terminates_with_callback_error() {
    let observer = TestObserver::<u64>::new();
    Observable::range(1, 10)
        .map(|n| if n == 3 { panic!("bad value") } else { n })
        .subscribe(observer.arc());

    observer.assert_values(&[1, 2]);
    let error = observer.assert_error();
    assert!(error.is_callback());
}

#[test]
fn filter_panic_terminates_with_callback_error() {
    let observer = TestObserver::<u64>::new();
    Observable::range(1, 10)
        .filter(|n| if *n == 2 { panic!("bad predicate") } else { true })
        .subscribe(observer.arc());

    observer.assert_values(&[1]);
    assert!(observer.assert_error().is_callback());
}

#[test]
fn scan_emits_each_accumulator_update() {
    let observer = TestObserver::new();
    Observable::of(vec![1, 2, 3, 4, 5])
        .scan(0, |acc, n| acc + n)
        .subscribe(observer.arc());

    observer.assert_values(&[1, 3, 6, 10, 15]);
    observer.assert_completed();
}

#[test]
fn scan_with_emits_seed_and_every_intermediate() {
    // of(1..5) | scan_with(0, +) => [0, 1, 3, 6, 10, 15]
    let observer = TestObserver::new();
    Observable::of(vec![1, 2, 3, 4, 5])
        .scan_with(0, |acc, n| acc + n)
        .subscribe(observer.arc());

    observer.assert_values(&[0, 1, 3, 6, 10, 15]);
    observer.assert_completed();
}

#[test]
fn reduce_emits_the_final_accumulator_once() {
    let total = Observable::of(vec![1, 2, 3, 4])
        .reduce(0, |acc, n| acc + n)
        .blocking_get()
        .unwrap();
    assert_eq!(total, 10);
}

#[test]
fn distinct_suppresses_every_revisited_value() {
    let observer = TestObserver::new();
    Observable::of(vec![1, 2, 1, 3, 2, 4]).distinct().subscribe(observer.arc());
    observer.assert_values(&[1, 2, 3, 4]);
}

#[test]
fn distinct_until_changed_suppresses_consecutive_duplicates() {
    let observer = TestObserver::new();
    Observable::of(vec![1, 1, 2, 2, 2, 3, 2])
        .distinct_until_changed()
        .subscribe(observer.arc());
    observer.assert_values(&[1, 2, 3, 2]);
}

#[test]
fn to_list_gathers_the_whole_stream() {
    // of(a, b, c).to_list() delivers one value equal to [a, b, c]
    let list = Observable::of(vec!["a", "b", "c"]).to_list().blocking_get().unwrap();
    assert_eq!(list, vec!["a", "b", "c"]);
}

#[test]
fn to_set_deduplicates() {
    let set = Observable::of(vec![1, 2, 2, 3]).to_set().blocking_get().unwrap();
    assert_eq!(set.len(), 3);
    assert!(set.contains(&1) && set.contains(&2) && set.contains(&3));
}

#[test]
fn to_map_keys_by_the_derived_key() {
    let map = Observable::of(vec!["apple", "banana", "cherry"])
        .to_map(|word| word.len())
        .blocking_get()
        .unwrap();
    assert_eq!(map[&5], "apple");
    assert_eq!(map[&6], "cherry"); // later key overwrites "banana"
}

#[test]
fn collect_folds_into_a_supplied_container() {
    let joined = Observable::of(vec!["a", "b", "c"])
        .collect(String::new, |acc, word| acc.push_str(word))
        .blocking_get()
        .unwrap();
    assert_eq!(joined, "abc");
}

#[test]
fn collector_propagates_upstream_errors() {
    let result = Observable::<i32>::error(RivuletError::custom("boom"))
        .to_list()
        .blocking_get();
    assert!(result.is_err());
}

#[test]
fn take_truncates_and_completes_early() {
    let observer = TestObserver::new();
    Observable::range(1, 100).take(3).subscribe(observer.arc());
    observer.assert_values(&[1, 2, 3]);
    observer.assert_completed();
}

#[test]
fn take_zero_completes_immediately() {
    let observer = TestObserver::<u64>::new();
    Observable::range(1, 100).take(0).subscribe(observer.arc());
    assert_eq!(observer.value_count(), 0);
    observer.assert_completed();
}

#[test]
fn skip_drops_the_prefix() {
    let observer = TestObserver::new();
    Observable::range(1, 6).skip(4).subscribe(observer.arc());
    observer.assert_values(&[5, 6]);
    observer.assert_completed();
}

#[test]
fn take_while_stops_at_the_first_rejection() {
    let observer = TestObserver::new();
    Observable::of(vec![2, 4, 5, 6]).take_while(|n| n % 2 == 0).subscribe(observer.arc());
    observer.assert_values(&[2, 4]);
    observer.assert_completed();
}

#[test]
fn element_access_narrows_to_scalar_shapes() {
    let source = Observable::of(vec![10, 20, 30]);
    assert_eq!(source.first().blocking_get().unwrap(), Some(10));
    assert_eq!(source.last().blocking_get().unwrap(), Some(30));
    assert_eq!(source.element_at(1).blocking_get().unwrap(), Some(20));
    assert_eq!(source.element_at(9).blocking_get().unwrap(), None);
    assert_eq!(source.count().blocking_get().unwrap(), 3);
}

#[test]
fn ignore_elements_keeps_only_the_terminal() {
    Observable::of(vec![1, 2, 3]).ignore_elements().blocking_await().unwrap();

    let failing = Observable::<i32>::error(RivuletError::custom("boom")).ignore_elements();
    assert!(failing.blocking_await().is_err());
}

#[test]
fn sequence_equal_compares_element_wise() {
    let equal = Observable::of(vec![1, 2, 3])
        .sequence_equal(&Observable::of(vec![1, 2, 3]))
        .blocking_get()
        .unwrap();
    assert!(equal);

    let different = Observable::of(vec![1, 2, 3])
        .sequence_equal(&Observable::of(vec![1, 2]))
        .blocking_get()
        .unwrap();
    assert!(!different);
}
