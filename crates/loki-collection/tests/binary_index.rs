use bson::Bson;
use loki_collection::{BinaryIndex, CheckIndexOptions, RangeOp, RangeValue};

fn docs(ages: &[i32]) -> Vec<bson::Document> {
    ages.iter().map(|&age| bson::doc! {"age": age}).collect()
}

#[test]
fn adaptive_insert_keeps_permutation_sorted_by_field() {
    let data = docs(&[30, 10, 20]);
    let mut index = BinaryIndex::new("age");
    for position in 0..data.len() {
        index.adaptive_insert(&data, position);
    }

    let ages: Vec<i32> = index.values.iter().map(|&pos| data[pos].get_i32("age").unwrap()).collect();
    assert_eq!(ages, vec![10, 20, 30]);
}

#[test]
fn range_between_is_inclusive_on_both_ends_after_a_shift() {
    let mut data = docs(&[10, 20, 30, 40, 50]);
    let mut index = BinaryIndex::new("age");
    for position in 0..data.len() {
        index.adaptive_insert(&data, position);
    }

    // Remove position 0 (age 10), shifting every later position down by one.
    index.adaptive_remove(&data, 0);
    data.remove(0);

    let (lo, hi) = index
        .calculate_range(&data, RangeOp::Between, &RangeValue::Between(&Bson::Int32(20), &Bson::Int32(40)))
        .unwrap();
    let matched: Vec<i32> = index.values[lo..=hi].iter().map(|&pos| data[pos].get_i32("age").unwrap()).collect();
    assert_eq!(matched, vec![20, 30, 40]);
}

#[test]
fn check_index_detects_and_repairs_corruption() {
    let data = docs(&[10, 20, 30]);
    let mut index = BinaryIndex::new("age");
    for position in 0..data.len() {
        index.adaptive_insert(&data, position);
    }

    index.values.swap(0, 2);
    assert!(!index.check_index(&data, CheckIndexOptions::default()));

    let repair = CheckIndexOptions {
        repair: true,
        ..Default::default()
    };
    assert!(index.check_index(&data, repair));
    assert_eq!(index.values.iter().map(|&p| data[p].get_i32("age").unwrap()).collect::<Vec<_>>(), vec![10, 20, 30]);
}

#[test]
fn lazy_index_rebuilds_on_first_read_after_being_marked_dirty() {
    let data = docs(&[10, 20, 30]);
    let mut index = BinaryIndex::new("age");
    index.mark_dirty();
    assert!(index.dirty);

    index.ensure_built(&data);
    assert!(!index.dirty);
    assert_eq!(index.values.iter().map(|&p| data[p].get_i32("age").unwrap()).collect::<Vec<_>>(), vec![10, 20, 30]);
}
