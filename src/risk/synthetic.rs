//! Synthetic training data for the risk model
//!
//! Stand-in for a real historical-data pipeline: labels come from a fixed
//! deterministic linear combination of the raw features, min-max rescaled
//! to the [0, 10] score range. The served model is only as good as this
//! placeholder until real project history feeds training.

use crate::risk::features::FEATURE_COUNT;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Samples generated for one startup training batch
pub const SYNTHETIC_SAMPLES: usize = 1000;

/// Generate a labeled batch of `samples` rows
///
/// Deterministic for a given seed. Feature ranges mirror the declared
/// input domain: complexity and availability in [0, 10), dependency count
/// 0-9, delays 0-4, hours 1-99, priority 1-4, days until due 1-59,
/// completion in [0, 100).
pub fn synthetic_training_set(seed: u64, samples: usize) -> (Vec<[f64; FEATURE_COUNT]>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut rows = Vec::with_capacity(samples);
    for _ in 0..samples {
        rows.push([
            rng.gen::<f64>() * 10.0,
            rng.gen::<f64>() * 10.0,
            f64::from(rng.gen_range(0..10u32)),
            f64::from(rng.gen_range(0..5u32)),
            f64::from(rng.gen_range(1..100u32)),
            f64::from(rng.gen_range(1..5u32)),
            f64::from(rng.gen_range(1..60u32)),
            rng.gen::<f64>() * 100.0,
        ]);
    }

    let mut targets: Vec<f64> = rows.iter().map(|x| raw_label(x)).collect();

    // Min-max rescale the batch onto the [0, 10] score range
    let min = targets.iter().copied().fold(f64::INFINITY, f64::min);
    let max = targets.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max > min {
        for y in &mut targets {
            *y = 10.0 * (*y - min) / (max - min);
        }
    }

    (rows, targets)
}

/// Fixed label function: positive weight on complexity, dependencies,
/// delays, and priority; negative on availability and completion;
/// log-dampened negative on days until due
fn raw_label(x: &[f64; FEATURE_COUNT]) -> f64 {
    0.2 * x[0] - 0.15 * x[1] + 0.1 * x[2] + 0.15 * x[3] + 0.05 * x[4] / 10.0 + 0.2 * x[5]
        - 0.1 * x[6].ln_1p()
        - 0.05 * x[7] / 10.0
}
