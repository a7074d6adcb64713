//! Possibility queries against the on-disk fixture model.

use std::sync::Arc;

use serde_json::json;

use facade::{Error, Generator};
use scenario_tests::write_model;

fn fixture() -> (tempfile::TempDir, Generator) {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = write_model(dir.path(), false);
    (dir, Generator::new(Arc::new(model)))
}

#[test]
fn scalar_node_query_returns_deduped_list() {
    let (_dir, generator) = fixture();
    let out = generator.query("navigator.productsub").unwrap();

    let list = out.as_array().expect("scalar possibilities are a list");
    assert!(!list.is_empty());
    assert!(list.iter().all(serde_json::Value::is_string));
    assert_eq!(list.len(), 2, "duplicates collapse");
}

#[test]
fn prefix_query_returns_nested_possibility_lists() {
    let (_dir, generator) = fixture();
    let out = generator.query("navigator").unwrap();

    let map = out.as_object().expect("prefix query nests");
    assert_eq!(map.len(), 2);
    assert!(map["language"].as_array().is_some_and(|l| !l.is_empty()));
    assert!(map["ProductSub"].as_array().is_some_and(|l| !l.is_empty()));
}

#[test]
fn object_valued_node_merges_into_possibility_map() {
    let (_dir, generator) = fixture();
    let out = generator.query("screen").unwrap();

    let map = out.as_object().expect("merged possibilities");
    assert_eq!(
        map["width"].as_array().unwrap().len(),
        3,
        "three distinct widths"
    );
    assert_eq!(map["colordepth"], json!([24, 30]));
    // Nested dicts merge recursively.
    assert_eq!(map["orientation"]["type"], json!(["landscape"]));
}

#[test]
fn sub_path_query_descends_into_values() {
    let (_dir, generator) = fixture();
    let out = generator.query("screen.width").unwrap();
    assert_eq!(out, json!([1920, 1280, 2560]));
}

#[test]
fn sort_orders_scalar_groups() {
    let (_dir, generator) = fixture();
    let out = generator.query_with("screen.width", false, true).unwrap();
    assert_eq!(out, json!([1280, 1920, 2560]));
}

#[test]
fn flatten_joins_merged_keys_with_dots() {
    let (_dir, generator) = fixture();
    let out = generator.query_with("screen", true, false).unwrap();

    let map = out.as_object().expect("flattened map");
    assert!(map.contains_key("width"));
    assert!(map.contains_key("orientation.type"));
    assert!(!map.contains_key("orientation"));
}

#[test]
fn missing_sub_path_is_a_path_error() {
    let (_dir, generator) = fixture();
    let err = generator.query("screen.widtha").unwrap_err();
    assert!(
        matches!(err, Error::NodePath { ref segment } if segment == "widtha"),
        "got {err:?}"
    );
}

#[test]
fn unknown_target_is_invalid_node() {
    let (_dir, generator) = fixture();
    let err = generator.query("keyboard").unwrap_err();
    assert!(matches!(err, Error::InvalidNode(_)), "got {err:?}");
}

#[test]
fn query_is_case_insensitive() {
    let (_dir, generator) = fixture();
    let out = generator.query("NAVIGATOR.PRODUCTSUB").unwrap();
    assert_eq!(out.as_array().unwrap().len(), 2);
}
