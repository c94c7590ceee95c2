//! Random-forest regression over the fixed feature vector
//!
//! Many randomized regression trees, each fit on a bootstrap resample and
//! considering a random feature subset at every split; prediction is the
//! mean of the per-tree outputs. Fitted state serializes verbatim with
//! bincode for the optional on-disk artifact.

use crate::error::Result;
use crate::risk::features::{FeatureVector, FEATURE_COUNT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default ensemble size
pub const DEFAULT_TREES: usize = 100;
/// Default maximum tree depth
pub const DEFAULT_MAX_DEPTH: usize = 10;
/// Fixed seed for reproducible training
pub const DEFAULT_SEED: u64 = 42;

/// Features considered at each split (floor of sqrt(8), rounded up to
/// keep splits informative on so few features)
const SPLIT_FEATURES: usize = 3;
/// Nodes with fewer samples become leaves
const MIN_SAMPLES_SPLIT: usize = 2;

/// One node of a regression tree
#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// A single regression tree
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Tree {
    root: Node,
}

impl Tree {
    fn predict(&self, x: &[f64; FEATURE_COUNT]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

/// Ensemble regressor with fixed hyperparameters
///
/// `fit` replaces the fitted state destructively; there is no online
/// update. Callers needing concurrent reads wrap the forest in a lock
/// and hold write access for the rare train/load operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    n_trees: usize,
    max_depth: usize,
    seed: u64,
    trees: Vec<Tree>,
    importances: Option<[f64; FEATURE_COUNT]>,
}

impl RandomForest {
    /// Create an untrained forest
    pub fn new(n_trees: usize, max_depth: usize, seed: u64) -> Self {
        Self {
            n_trees,
            max_depth,
            seed,
            trees: Vec::new(),
            importances: None,
        }
    }

    /// Create an untrained forest with the standard hyperparameters
    /// (100 trees, depth 10, seed 42)
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_TREES, DEFAULT_MAX_DEPTH, DEFAULT_SEED)
    }

    /// Whether the forest has been trained
    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Fit the ensemble, replacing any previous fitted state
    pub fn fit(&mut self, rows: &[[f64; FEATURE_COUNT]], targets: &[f64]) {
        debug_assert_eq!(rows.len(), targets.len());
        self.trees.clear();
        self.importances = None;
        if rows.is_empty() {
            return;
        }

        let mut raw_importance = [0.0; FEATURE_COUNT];
        let mut master = StdRng::seed_from_u64(self.seed);

        for _ in 0..self.n_trees {
            let mut rng = StdRng::seed_from_u64(master.gen());
            let samples: Vec<usize> = (0..rows.len())
                .map(|_| rng.gen_range(0..rows.len()))
                .collect();

            let mut builder = TreeBuilder {
                rows,
                targets,
                max_depth: self.max_depth,
                importance: &mut raw_importance,
            };
            let root = builder.grow(samples, 0, &mut rng);
            self.trees.push(Tree { root });
        }

        // Normalize accumulated impurity decrease to weights summing to 1
        let total: f64 = raw_importance.iter().sum();
        if total > 0.0 {
            for w in &mut raw_importance {
                *w /= total;
            }
        }
        self.importances = Some(raw_importance);
    }

    /// Ensemble mean for one input vector
    ///
    /// Returns 0.0 for an unfitted forest; the service facade never
    /// serves one.
    pub fn predict(&self, vector: &FeatureVector) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(&vector.0)).sum();
        sum / self.trees.len() as f64
    }

    /// Per-feature importance weights (each >=0, summing to 1), or None
    /// when the forest is unfitted
    pub fn feature_importances(&self) -> Option<[f64; FEATURE_COUNT]> {
        self.importances
    }

    /// Persist the fitted state to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let bytes = bincode::serialize(self)?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Restore fitted state from disk
    ///
    /// Callers treat any error here as "no usable artifact" and fall back
    /// to fresh training.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let forest = bincode::deserialize(&bytes)?;
        Ok(forest)
    }
}

/// Grows one tree over borrowed training data, accumulating impurity
/// decrease into the shared importance array
struct TreeBuilder<'a> {
    rows: &'a [[f64; FEATURE_COUNT]],
    targets: &'a [f64],
    max_depth: usize,
    importance: &'a mut [f64; FEATURE_COUNT],
}

impl TreeBuilder<'_> {
    fn grow(&mut self, samples: Vec<usize>, depth: usize, rng: &mut StdRng) -> Node {
        let (mean, sse) = mean_and_sse(self.targets, &samples);

        if depth >= self.max_depth || samples.len() < MIN_SAMPLES_SPLIT || sse <= 1e-12 {
            return Node::Leaf { value: mean };
        }

        let candidates = rand::seq::index::sample(rng, FEATURE_COUNT, SPLIT_FEATURES);
        let mut best: Option<(usize, f64, f64)> = None; // (feature, threshold, gain)

        for feature in candidates {
            let mut order = samples.clone();
            order.sort_by(|&a, &b| {
                self.rows[a][feature]
                    .partial_cmp(&self.rows[b][feature])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            // Running sums let each candidate split be scored in O(1)
            let total_sum: f64 = order.iter().map(|&i| self.targets[i]).sum();
            let total_sq: f64 = order.iter().map(|&i| self.targets[i] * self.targets[i]).sum();
            let n = order.len() as f64;

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for (count, window) in order.windows(2).enumerate() {
                let i = window[0];
                left_sum += self.targets[i];
                left_sq += self.targets[i] * self.targets[i];

                let lo = self.rows[i][feature];
                let hi = self.rows[window[1]][feature];
                if hi <= lo {
                    continue;
                }

                let n_left = (count + 1) as f64;
                let n_right = n - n_left;
                let sse_left = left_sq - left_sum * left_sum / n_left;
                let right_sum = total_sum - left_sum;
                let sse_right = (total_sq - left_sq) - right_sum * right_sum / n_right;
                let gain = sse - (sse_left + sse_right);

                if gain > best.map_or(0.0, |(_, _, g)| g) {
                    best = Some((feature, (lo + hi) / 2.0, gain));
                }
            }
        }

        let Some((feature, threshold, gain)) = best else {
            return Node::Leaf { value: mean };
        };

        self.importance[feature] += gain;

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| self.rows[i][feature] <= threshold);

        let left = self.grow(left_samples, depth + 1, rng);
        let right = self.grow(right_samples, depth + 1, rng);

        Node::Split {
            feature,
            threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

/// Mean and sum of squared deviations of the targets at the given sample
/// indices
fn mean_and_sse(targets: &[f64], samples: &[usize]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|&i| targets[i]).sum::<f64>() / n;
    let sse = samples
        .iter()
        .map(|&i| {
            let d = targets[i] - mean;
            d * d
        })
        .sum();
    (mean, sse)
}
