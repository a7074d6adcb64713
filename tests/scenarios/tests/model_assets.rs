//! Asset loading variants and the process-wide default model.

use std::sync::Arc;

use serde_json::json;

use facade::{
    generate, install_default_model, query, trace, ConstraintMap, Error, GenerateRequest,
    Generator, TraceRequest,
};
use facade_model::Model;
use scenario_tests::write_model;

#[test]
fn compressed_assets_behave_like_plain_ones() {
    let plain_dir = tempfile::tempdir().expect("tempdir");
    let zst_dir = tempfile::tempdir().expect("tempdir");
    let plain = Generator::new(Arc::new(write_model(plain_dir.path(), false)));
    let compressed = Generator::new(Arc::new(write_model(zst_dir.path(), true)));

    let constraints = ConstraintMap::new().set("os", "ChromeOS");
    let from_plain = plain
        .trace_with(
            &["browser"],
            TraceRequest::new().constraints(constraints.clone()),
        )
        .unwrap();
    let from_zst = compressed
        .trace_with(&["browser"], TraceRequest::new().constraints(constraints))
        .unwrap();
    assert_eq!(from_plain, from_zst);

    // Value decoding reads through the zstd cache transparently.
    assert_eq!(
        compressed.query("navigator.productsub").unwrap(),
        plain.query("navigator.productsub").unwrap(),
    );
}

#[test]
fn missing_assets_name_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = Model::open(dir.path()).unwrap_err();
    assert!(
        err.to_string().contains("fingerprint-network.json"),
        "got {err}"
    );
}

#[test]
fn free_functions_require_an_installed_model() {
    // Runs in the same process as the install test below would, so keep
    // everything about the default model inside this one test.
    let err = query("os", false, false).unwrap_err();
    let uninstalled = matches!(err, Error::Network(_));

    // Install once; the fixture directory is persisted because the
    // process-wide model outlives this test.
    let dir = tempfile::tempdir().expect("tempdir").keep();
    let model = Arc::new(write_model(&dir, false));
    if install_default_model(Arc::clone(&model)).is_ok() {
        assert!(uninstalled, "free call before install must fail");
    }
    assert!(
        install_default_model(model).is_err(),
        "second install is rejected"
    );

    let possibilities = query("os", false, true).unwrap();
    assert_eq!(possibilities, json!(["ChromeOS", "Linux", "MacOS"]));

    let dist = trace("browser", TraceRequest::new()).unwrap();
    assert_eq!(dist[0].value, json!("Chrome"));

    let fingerprint = generate(GenerateRequest::new().seed(1)).unwrap();
    assert!(fingerprint["os"].is_string());
}
