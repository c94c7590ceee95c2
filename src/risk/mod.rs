//! Task risk scoring
//!
//! The service facade wires the feature extractor, the random-forest
//! regressor, and the rule-based explainer together. One `RiskService`
//! is constructed at startup and injected into request handlers; the
//! fitted model is shared read-mostly behind an `RwLock`, with write
//! access taken only for the rare train/load administration paths.

pub mod explain;
pub mod features;
pub mod forest;
pub mod synthetic;

use crate::error::Result;
use crate::types::{RiskFactors, RiskLevel, RiskPrediction, Task};
use features::{factors_from_task, FeatureVector};
use forest::RandomForest;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use synthetic::{synthetic_training_set, SYNTHETIC_SAMPLES};
use tracing::{info, warn};

/// Risk prediction service
///
/// Never serves an untrained model: construction either restores a fitted
/// artifact from disk or trains fresh on one synthetic batch.
pub struct RiskService {
    model: RwLock<RandomForest>,
    model_path: Option<PathBuf>,
}

impl RiskService {
    /// Construct the service, loading the artifact at `model_path` when
    /// one is usable and falling back to fresh synthetic training
    /// otherwise. Load failures are recovered locally, never surfaced.
    pub fn new(model_path: Option<PathBuf>) -> Self {
        let model = match &model_path {
            Some(path) => match RandomForest::load(path) {
                Ok(forest) if forest.is_fitted() => {
                    info!("Loaded risk model from {}", path.display());
                    forest
                }
                Ok(_) => {
                    warn!(
                        "Model artifact at {} is unfitted, training fresh",
                        path.display()
                    );
                    Self::train_fresh()
                }
                Err(e) => {
                    warn!(
                        "Could not load model from {} ({}), training fresh",
                        path.display(),
                        e
                    );
                    Self::train_fresh()
                }
            },
            None => Self::train_fresh(),
        };

        Self {
            model: RwLock::new(model),
            model_path,
        }
    }

    /// Train a fresh forest on one synthetic batch
    fn train_fresh() -> RandomForest {
        info!(
            "Training risk model on {} synthetic samples",
            SYNTHETIC_SAMPLES
        );
        let mut forest = RandomForest::with_defaults();
        let (rows, targets) = synthetic_training_set(forest::DEFAULT_SEED, SYNTHETIC_SAMPLES);
        forest.fit(&rows, &targets);
        forest
    }

    /// Predict from caller-supplied factors
    ///
    /// Input is assumed validated at the API boundary; prediction is
    /// deterministic for fixed model state.
    pub fn predict_from_factors(&self, factors: &RiskFactors) -> RiskPrediction {
        let vector = FeatureVector::from_factors(factors);
        let model = self.model.read().expect("risk model lock poisoned");

        let risk_score = model.predict(&vector).clamp(0.0, 10.0);
        let weights = model.feature_importances();

        RiskPrediction {
            risk_score,
            risk_level: RiskLevel::from_score(risk_score),
            contributing_factors: explain::importance_map(weights.as_ref()),
            mitigation_suggestions: explain::suggest(risk_score, factors, weights.as_ref()),
        }
    }

    /// Score a task directly from its task-derived feature vector
    pub fn score_task(&self, task: &Task) -> f64 {
        let vector = FeatureVector::from_task(task);
        let model = self.model.read().expect("risk model lock poisoned");
        model.predict(&vector).clamp(0.0, 10.0)
    }

    /// Full prediction for a task
    ///
    /// Importances and suggestions come from the factor path (with the
    /// placeholder inputs tasks cannot supply), while the task-derived
    /// score is authoritative for `risk_score`. The two score paths may
    /// legitimately disagree.
    pub fn predict_for_task(&self, task: &Task) -> RiskPrediction {
        let factors = factors_from_task(task);
        let mut prediction = self.predict_from_factors(&factors);
        prediction.risk_score = self.score_task(task);
        prediction
    }

    /// Persist the fitted model to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let model = self.model.read().expect("risk model lock poisoned");
        model.save(path)?;
        info!("Saved risk model to {}", path.display());
        Ok(())
    }

    /// Retrain on a fresh synthetic batch, replacing the fitted state
    ///
    /// Administrative operation; in-flight predictions finish against the
    /// old state before the write lock is granted.
    pub fn retrain(&self) {
        let forest = Self::train_fresh();
        let mut model = self.model.write().expect("risk model lock poisoned");
        *model = forest;
    }

    /// Configured artifact path, if any
    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }
}
