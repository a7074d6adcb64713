//! Trace behavior against the on-disk fixture model.

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use serde_json::json;

use facade::{ConstraintMap, Error, Generator, TraceRequest, TraceTree};
use scenario_tests::write_model;

fn fixture() -> (tempfile::TempDir, Generator) {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = write_model(dir.path(), false);
    (dir, Generator::new(Arc::new(model)))
}

fn distribution(
    generator: &Generator,
    target: &str,
    constraints: ConstraintMap,
) -> Result<Vec<facade::TraceResult>, Error> {
    match generator.trace_with(&[target], TraceRequest::new().constraints(constraints))? {
        TraceTree::Distribution(dist) => Ok(dist),
        TraceTree::Branch(_) => panic!("expected a single distribution for '{target}'"),
    }
}

#[test]
fn chromeos_forces_chrome() {
    let (_dir, generator) = fixture();
    let dist = distribution(
        &generator,
        "browser",
        ConstraintMap::new().set("os", "ChromeOS"),
    )
    .unwrap();

    assert_eq!(dist.len(), 1);
    assert_eq!(dist[0].value, json!("Chrome"));
    assert_abs_diff_eq!(dist[0].probability, 1.0, epsilon = 1e-9);
}

#[test]
fn firefox_or_safari_on_chromeos_is_infeasible() {
    let (_dir, generator) = fixture();
    let err = distribution(
        &generator,
        "browser",
        ConstraintMap::new()
            .set("os", "ChromeOS")
            .any_of("browser", ["Firefox", "Safari"]),
    )
    .unwrap_err();

    assert!(
        matches!(err, Error::RestrictiveConstraints(_)),
        "got {err:?}"
    );
}

#[test]
fn allow_list_restricts_and_renormalizes() {
    let (_dir, generator) = fixture();
    let dist = distribution(
        &generator,
        "browser",
        ConstraintMap::new().any_of("browser", ["Firefox", "Safari"]),
    )
    .unwrap();

    assert_eq!(dist.len(), 2);
    for result in &dist {
        assert!(
            result.value == json!("Firefox") || result.value == json!("Safari"),
            "unexpected value {}",
            result.value
        );
    }
    let total: f64 = dist.iter().map(|r| r.probability).sum();
    assert_abs_diff_eq!(total, 1.0, epsilon = 1e-6);
}

#[test]
fn unconditioned_marginal_matches_hand_computation() {
    let (_dir, generator) = fixture();
    let dist = distribution(&generator, "browser", ConstraintMap::new()).unwrap();

    // Sorted by descending probability.
    assert_eq!(dist[0].value, json!("Chrome"));
    assert_abs_diff_eq!(dist[0].probability, 0.74, epsilon = 1e-9);
    assert_eq!(dist[1].value, json!("Firefox"));
    assert_abs_diff_eq!(dist[1].probability, 0.14, epsilon = 1e-9);
    assert_eq!(dist[2].value, json!("Safari"));
    assert_abs_diff_eq!(dist[2].probability, 0.12, epsilon = 1e-9);
}

#[test]
fn conditioning_on_each_own_value_is_idempotent() {
    let (_dir, generator) = fixture();
    for os in ["Linux", "MacOS", "ChromeOS"] {
        let dist =
            distribution(&generator, "os", ConstraintMap::new().set("os", os)).unwrap();
        assert_eq!(dist.len(), 1, "os={os}");
        assert_eq!(dist[0].value, json!(os));
        assert_abs_diff_eq!(dist[0].probability, 1.0, epsilon = 1e-9);
    }
}

#[test]
fn evidence_below_the_target_propagates_upward() {
    // Gecko productsub only ships with Firefox, so conditioning on it
    // pins the browser.
    let (_dir, generator) = fixture();
    let dist = distribution(
        &generator,
        "browser",
        ConstraintMap::new().nested(
            "navigator",
            ConstraintMap::new().set("productsub", "20100101"),
        ),
    )
    .unwrap();

    assert_eq!(dist.len(), 1);
    assert_eq!(dist[0].value, json!("Firefox"));
}

#[test]
fn nested_constraints_reach_inside_structured_values() {
    // colordepth 30 only appears on the QHD screen, which only MacOS has.
    let (_dir, generator) = fixture();
    let dist = distribution(
        &generator,
        "os",
        ConstraintMap::new().nested("screen", ConstraintMap::new().set("colordepth", 30)),
    )
    .unwrap();

    assert_eq!(dist.len(), 1);
    assert_eq!(dist[0].value, json!("MacOS"));
}

#[test]
fn scalar_matching_is_case_insensitive() {
    let (_dir, generator) = fixture();
    let dist = distribution(
        &generator,
        "browser",
        ConstraintMap::new().set("os", "chromeos"),
    )
    .unwrap();
    assert_eq!(dist[0].value, json!("Chrome"));
}

#[test]
fn prefix_target_produces_a_tree_of_distributions() {
    let (_dir, generator) = fixture();
    let tree = generator
        .trace_with(&["navigator"], TraceRequest::new())
        .unwrap();

    let TraceTree::Branch(branches) = tree else {
        panic!("expected a branch for a prefix target");
    };
    // Two navigator nodes, nested under their display-name segments.
    let inner: Vec<&TraceTree> = branches.values().collect();
    assert_eq!(inner.len(), 2);
    for sub in inner {
        let TraceTree::Branch(leaves) = sub else {
            panic!("expected nested branches under 'navigator'");
        };
        for leaf in leaves.values() {
            let dist = leaf.as_distribution().expect("leaf distribution");
            let total: f64 = dist.iter().map(|r| r.probability).sum();
            assert_abs_diff_eq!(total, 1.0, epsilon = 1e-6);
        }
    }
}

#[test]
fn flattened_multi_target_keys_by_root_name() {
    let (_dir, generator) = fixture();
    let tree = generator
        .trace_with(&["navigator"], TraceRequest::new().flatten(true))
        .unwrap();

    let TraceTree::Branch(branches) = tree else {
        panic!("expected a branch");
    };
    let keys: Vec<&String> = branches.keys().collect();
    assert_eq!(keys, vec!["Navigator.ProductSub", "navigator.language"]);
    for leaf in branches.values() {
        assert!(leaf.as_distribution().is_some(), "flat leaves are distributions");
    }
}

#[test]
fn unknown_target_is_invalid_node() {
    let (_dir, generator) = fixture();
    let err = generator
        .trace_with(&["keyboard"], TraceRequest::new())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidNode(_)), "got {err:?}");
}

#[test]
fn generator_base_constraints_apply_to_trace() {
    let (_dir, base) = fixture();
    let generator = Generator::builder(Arc::clone(base.model()))
        .constraints(ConstraintMap::new().set("os", "ChromeOS"))
        .build()
        .unwrap();

    let dist = match generator.trace_with(&["browser"], TraceRequest::new()).unwrap() {
        TraceTree::Distribution(dist) => dist,
        TraceTree::Branch(_) => panic!("expected distribution"),
    };
    assert_eq!(dist.len(), 1);
    assert_eq!(dist[0].value, json!("Chrome"));
}
