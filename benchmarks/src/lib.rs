//! Shared helpers for the facade benchmark suite.

use std::sync::Arc;

use facade::Generator;
use scenario_tests::write_model;

/// Build a generator over the fixture model in a persisted temp directory.
///
/// The directory outlives the returned generator (benchmarks run for the
/// whole process), so value-store lookups keep a live data file.
///
/// # Panics
///
/// Panics if the fixture cannot be written. Benchmark setup failures are
/// fatal.
#[must_use]
pub fn bench_generator(compress: bool) -> Generator {
    let dir = tempfile::tempdir().expect("tempdir").keep();
    Generator::new(Arc::new(write_model(&dir, compress)))
}
