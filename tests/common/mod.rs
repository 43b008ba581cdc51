#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

pub use franken_deferred::test_utils::{init_test_logging, run_test, run_timed, test_runtime};

use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use std::time::Duration;

/// Default seed for property tests when none is supplied.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED_5EED;

const PROPTEST_SEED_ENV: &str = "FRANKEN_DEFERRED_PROPTEST_SEED";

/// Build a ProptestConfig with a deterministic seed.
///
/// `PROPTEST_RNG_SEED` wins if set; otherwise `FRANKEN_DEFERRED_PROPTEST_SEED`,
/// then [`DEFAULT_PROPTEST_SEED`].
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    let mut config = ProptestConfig::with_cases(cases);
    if matches!(config.rng_seed, RngSeed::Random) {
        let seed = std::env::var(PROPTEST_SEED_ENV)
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(DEFAULT_PROPTEST_SEED);
        config.rng_seed = RngSeed::Fixed(seed);
    }
    config
}

/// Milliseconds as a `Duration`.
#[must_use]
pub const fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}
