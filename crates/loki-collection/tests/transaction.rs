use bson::{Bson, DateTime};
use loki_collection::{Collection, CollectionOptions};

fn now() -> DateTime {
    DateTime::from_millis(1_700_000_000_000)
}

fn unique_collection(transactional: bool) -> Collection {
    let mut opts = CollectionOptions::new("c");
    opts.unique = vec!["email".to_string()];
    opts.transactional = transactional;
    Collection::new(opts).unwrap()
}

#[test]
fn transactional_batch_insert_rolls_back_entirely_on_collision() {
    let mut collection = unique_collection(true);

    let err = collection
        .insert_many(
            vec![
                Bson::Document(bson::doc! {"email": "a"}),
                Bson::Document(bson::doc! {"email": "b"}),
                Bson::Document(bson::doc! {"email": "a"}),
            ],
            now(),
        )
        .unwrap_err();
    assert!(matches!(err, loki_collection::CollectionError::ConstraintError(_)));

    assert_eq!(collection.len(), 0);
    assert_eq!(collection.max_id(), 0);
    assert!(collection.get(1).is_none());
}

#[test]
fn non_transactional_batch_insert_keeps_the_successful_prefix() {
    let mut collection = unique_collection(false);

    let err = collection
        .insert_many(
            vec![
                Bson::Document(bson::doc! {"email": "a"}),
                Bson::Document(bson::doc! {"email": "b"}),
                Bson::Document(bson::doc! {"email": "a"}),
            ],
            now(),
        )
        .unwrap_err();
    assert!(matches!(err, loki_collection::CollectionError::ConstraintError(_)));

    assert_eq!(collection.len(), 2);
    assert_eq!(collection.max_id(), 2);
}

#[test]
fn successful_transaction_commits_normally() {
    let mut collection = unique_collection(true);
    let inserted = collection
        .insert_many(
            vec![
                Bson::Document(bson::doc! {"email": "a"}),
                Bson::Document(bson::doc! {"email": "b"}),
            ],
            now(),
        )
        .unwrap();
    assert_eq!(inserted.len(), 2);
    assert_eq!(collection.len(), 2);
    assert_eq!(collection.max_id(), 2);
}
