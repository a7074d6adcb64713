//! The empirical distribution of generated values approaches the traced
//! marginal. Seeded draws keep the comparison reproducible.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use facade::{ConstraintMap, GenerateRequest, Generator, TraceRequest, TraceTree};
use scenario_tests::write_model;

const TRIALS: u64 = 2000;
const TOLERANCE: f64 = 0.04;

fn fixture() -> (tempfile::TempDir, Generator) {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = write_model(dir.path(), false);
    (dir, Generator::new(Arc::new(model)))
}

fn empirical(
    generator: &Generator,
    target: &str,
    constraints: &ConstraintMap,
) -> HashMap<String, f64> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for seed in 0..TRIALS {
        let value = generator
            .generate_with(
                GenerateRequest::new()
                    .constraints(constraints.clone())
                    .target(target)
                    .seed(seed),
            )
            .expect("generate");
        let Value::String(value) = value else {
            panic!("expected a scalar draw for '{target}'");
        };
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(value, count)| (value, count as f64 / TRIALS as f64))
        .collect()
}

fn traced(
    generator: &Generator,
    target: &str,
    constraints: &ConstraintMap,
) -> HashMap<String, f64> {
    let tree = generator
        .trace_with(
            &[target],
            TraceRequest::new().constraints(constraints.clone()),
        )
        .expect("trace");
    let TraceTree::Distribution(dist) = tree else {
        panic!("expected a distribution for '{target}'");
    };
    dist.into_iter()
        .map(|r| {
            let Value::String(value) = r.value else {
                panic!("expected string values");
            };
            (value, r.probability)
        })
        .collect()
}

fn assert_agreement(expected: &HashMap<String, f64>, observed: &HashMap<String, f64>) {
    for (value, &probability) in expected {
        let seen = observed.get(value).copied().unwrap_or(0.0);
        assert!(
            (seen - probability).abs() < TOLERANCE,
            "P({value}): traced {probability:.3}, observed {seen:.3}"
        );
    }
    for value in observed.keys() {
        assert!(
            expected.contains_key(value),
            "sampled '{value}' has zero traced probability"
        );
    }
}

#[test]
fn unconditioned_browser_draws_track_the_marginal() {
    let (_dir, generator) = fixture();
    let constraints = ConstraintMap::new();
    let expected = traced(&generator, "browser", &constraints);
    let observed = empirical(&generator, "browser", &constraints);
    assert_agreement(&expected, &observed);
}

#[test]
fn conditioned_browser_draws_track_the_conditional() {
    let (_dir, generator) = fixture();
    let constraints = ConstraintMap::new().any_of("os", ["Linux", "MacOS"]);
    let expected = traced(&generator, "browser", &constraints);
    let observed = empirical(&generator, "browser", &constraints);
    assert_agreement(&expected, &observed);
}

#[test]
fn conditioned_language_draws_track_the_conditional() {
    let (_dir, generator) = fixture();
    let constraints = ConstraintMap::new().set("os", "ChromeOS");
    let expected = traced(&generator, "navigator.language", &constraints);
    let observed = empirical(&generator, "navigator.language", &constraints);
    assert_agreement(&expected, &observed);
}
