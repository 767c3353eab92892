// Copyright 2024 Vincent Chan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use docwrite_core::bson::{doc, Bson, Document};
use docwrite_core::{Driver, DriverError, Error, IndexOptions, IndexSpec, Safety};
use crate::common::{index_names, prepare_db, prepare_scripted_db};

mod common;

#[test]
fn test_create_index_derives_name() {
    let db = prepare_db();
    let col = db.collection::<Document>("people");

    let name = col.create_index(vec![("a", 1), ("b", -1)], IndexOptions::default()).unwrap();
    assert_eq!(name, "a_1_b_-1");

    let infos = col.index_information().unwrap();
    assert_eq!(index_names(&infos), vec!["_id_", "a_1_b_-1"]);
    assert_eq!(infos["a_1_b_-1"].keys, doc! { "a": 1, "b": -1 });
}

#[test]
fn test_create_index_from_bare_name() {
    let db = prepare_db();
    let col = db.collection::<Document>("people");

    let name = col.create_index("age", IndexOptions::default()).unwrap();
    assert_eq!(name, "age");

    let infos = col.index_information().unwrap();
    assert_eq!(infos["age"].keys, doc! { "age": 1 });
}

#[test]
fn test_explicit_name_is_sent_once() {
    let db = prepare_scripted_db();
    let col = db.collection::<Document>("people");

    let options = IndexOptions::from_document(doc! {
        "name": "by_location",
        "background": true,
        "bits": 26,
    }).unwrap();
    let name = col.create_index(vec![("loc", Bson::String("2d".into()))], options).unwrap();
    assert_eq!(name, "by_location");

    let sent = db.driver().index_options();
    assert_eq!(sent, vec![doc! {
        "name": "by_location",
        "background": true,
        "bits": 26,
    }]);
}

#[test]
fn test_name_passed_as_raw_option() {
    let db = prepare_scripted_db();
    let col = db.collection::<Document>("people");

    let options = IndexOptions::builder()
        .option("name", "other").unwrap()
        .option("sparse", true).unwrap()
        .build();
    let name = col.create_index(vec![("a", 1)], options).unwrap();
    assert_eq!(name, "other");

    assert_eq!(db.driver().index_options(), vec![doc! { "name": "other", "sparse": true }]);
    let infos = col.index_information().unwrap();
    assert_eq!(index_names(&infos), vec!["_id_", "other"]);
}

#[test]
fn test_legacy_drop_dups_is_normalized() {
    let db = prepare_scripted_db();
    let col = db.collection::<Document>("people");

    let options = IndexOptions::from_document(doc! {
        "unique": true,
        "drop_dups": true,
    }).unwrap();
    col.create_index("email", options).unwrap();

    let sent = db.driver().index_options();
    assert_eq!(sent[0], doc! {
        "name": "email",
        "unique": true,
        "dropDups": true,
    });
}

#[test]
fn test_duplicates_are_ignored_with_drop_dups() {
    let db = prepare_scripted_db();
    let col = db.collection::<Document>("people");

    db.driver().fail_next(
        "create_index",
        DriverError::new("E11000 duplicate key error index: test.people.$name_1 dup key: { : \"David\" }"),
    );
    let name = col.create_index(
        vec![("name", 1)],
        IndexOptions::builder().unique(true).drop_dups(true).build(),
    ).unwrap();
    assert_eq!(name, "name_1");
}

#[test]
fn test_duplicates_fail_without_drop_dups() {
    let db = prepare_db();
    let col = db.collection::<Document>("people");

    col.insert_many(vec![
        doc! { "name": "David" },
        doc! { "name": "David" },
    ], Default::default(), true).unwrap();

    let err = col.create_index(
        vec![("name", 1)],
        IndexOptions::builder().unique(true).build(),
    ).unwrap_err();
    assert!(matches!(err, Error::OperationFailure(_)));
    let message = err.to_string();
    assert!(message.contains("create index"));
    assert!(message.contains("\"name\": 1"));
    assert!(message.contains("E11000"));
}

#[test]
fn test_other_failures_are_not_swallowed() {
    let db = prepare_scripted_db();
    let col = db.collection::<Document>("people");

    db.driver().fail_next("create_index", DriverError::with_code(13, "not authorized"));
    let err = col.create_index(
        "name",
        IndexOptions::builder().unique(true).drop_dups(true).build(),
    ).unwrap_err();
    assert!(matches!(err, Error::OperationFailure(_)));
    assert!(err.to_string().contains("not authorized"));
}

#[test]
fn test_invalid_spec_makes_no_call() {
    let db = prepare_scripted_db();
    let col = db.collection::<Document>("people");

    let err = col.create_index(vec![("age", 2)], IndexOptions::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidSpec(_)));

    let err = col.drop_index(vec![("age", "asc")]).unwrap_err();
    assert!(matches!(err, Error::InvalidSpec(_)));

    assert!(db.driver().calls().is_empty());
}

#[test]
fn test_drop_index_round_trip() {
    let db = prepare_db();
    let col = db.collection::<Document>("people");

    let spec = IndexSpec::from(vec![("author.age", 1), ("title", -1)]);
    col.create_index(spec.clone(), IndexOptions::default()).unwrap();
    assert_eq!(col.index_information().unwrap().len(), 2);

    col.drop_index(spec).unwrap();
    assert_eq!(index_names(&col.index_information().unwrap()), vec!["_id_"]);
}

#[test]
fn test_drop_index_by_stored_keys() {
    let db = prepare_scripted_db();
    let col = db.collection::<Document>("people");

    // created under a name that does not follow the derived convention
    db.driver().inner.create_index(
        "people",
        &doc! { "a": 1, "b": -1 },
        &doc! { "name": "custom_idx" },
    ).unwrap();

    col.drop_index(vec![("a", 1), ("b", -1)]).unwrap();
    assert_eq!(db.driver().dropped(), vec!["custom_idx"]);
}

#[test]
fn test_drop_index_by_name() {
    let db = prepare_scripted_db();
    let col = db.collection::<Document>("people");

    col.create_index(vec![("age", 1)], IndexOptions::builder().name("by_age").build()).unwrap();
    col.drop_index("by_age").unwrap();
    assert_eq!(db.driver().dropped(), vec!["by_age"]);
}

#[test]
fn test_drop_missing_index() {
    let db = prepare_scripted_db();
    let col = db.collection::<Document>("people");
    col.create_index("age", IndexOptions::default()).unwrap();

    let err = col.drop_index(vec![("age", -1)]).unwrap_err();
    match err {
        Error::IndexNotFound(name) => assert_eq!(name, "age_-1"),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(db.driver().count("drop_index"), 0);
}

#[test]
fn test_drop_indexes_keeps_primary_key() {
    let db = prepare_db();
    let col = db.collection::<Document>("people");
    col.create_index("age", IndexOptions::default()).unwrap();
    col.create_index(vec![("name", 1), ("age", -1)], IndexOptions::default()).unwrap();

    col.drop_indexes().unwrap();
    assert_eq!(index_names(&col.index_information().unwrap()), vec!["_id_"]);
}

#[test]
fn test_unique_index_rejects_insert() {
    let db = prepare_db();
    let col = db.collection::<Document>("people");

    col.create_index("name", IndexOptions::builder().unique(true).build()).unwrap();
    col.insert(doc! { "name": "David" }, Safety::Safe).unwrap();

    let err = col.insert(doc! { "name": "David" }, Safety::Safe).unwrap_err();
    assert!(err.is_duplicate_key());
    assert_eq!(db.driver().count("people").unwrap(), 1);
}
