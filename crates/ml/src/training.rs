//! Candidate model fitting over the accumulated training dataset.
//!
//! Samples are ordered by game date and split temporally: the oldest games
//! train, the newest are held out. Hyperparameters are chosen on an inner
//! temporal validation split by ROC-AUC, then the winner is refit on the whole
//! training portion and scored once on the held-out games.

use courtside_models::{CourtsideError, FeatureSchema, Result, TrainingSample};
use linfa::traits::Fit;
use linfa::Dataset;
use linfa_logistic::LogisticRegression;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::evaluation::{roc_auc, EvaluationReport};
use crate::models::{Estimator, LogisticPipeline, LogisticWeights, StandardScaler};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub test_fraction: f64,
    pub validation_fraction: f64,
    pub min_training_samples: usize,
    pub alphas: Vec<f64>,
    pub max_iterations: Vec<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            validation_fraction: 0.2,
            min_training_samples: 100,
            alphas: vec![0.0, 0.001, 0.01, 0.1, 1.0],
            max_iterations: vec![100, 300],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HyperParams {
    pub alpha: f64,
    pub max_iterations: u64,
}

#[derive(Debug, Clone)]
pub struct TrainedCandidate {
    pub pipeline: LogisticPipeline,
    pub report: EvaluationReport,
    pub best_params: HyperParams,
    pub validation_auc: f64,
    pub training_samples: usize,
    pub test_samples: usize,
}

/// Fits a candidate model. Synchronous and CPU-bound; async callers should
/// run it on a blocking thread.
pub trait ModelTrainer: Send + Sync {
    fn train(&self, samples: &[TrainingSample], schema: &FeatureSchema) -> Result<TrainedCandidate>;
}

#[derive(Debug, Clone, Default)]
pub struct LogisticTrainer {
    config: TrainerConfig,
}

struct Split {
    records: Array2<f64>,
    labels: Vec<bool>,
}

impl Split {
    fn from_samples(samples: &[&TrainingSample], n_features: usize) -> Result<Self> {
        let flat: Vec<f64> = samples
            .iter()
            .flat_map(|s| s.features.iter().copied())
            .collect();
        let records = Array2::from_shape_vec((samples.len(), n_features), flat)
            .map_err(|e| CourtsideError::TrainingFailed {
                reason: format!("cannot shape training matrix: {e}"),
            })?;
        Ok(Self {
            records,
            labels: samples.iter().map(|s| s.home_won).collect(),
        })
    }

    fn len(&self) -> usize {
        self.labels.len()
    }

    fn has_both_classes(&self) -> bool {
        self.labels.iter().any(|l| *l) && self.labels.iter().any(|l| !*l)
    }
}

fn holdout_size(total: usize, fraction: f64) -> usize {
    let size = (total as f64 * fraction).ceil() as usize;
    size.clamp(1, total.saturating_sub(1))
}

impl LogisticTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    fn grid(&self) -> Vec<HyperParams> {
        self.config
            .alphas
            .iter()
            .flat_map(|alpha| {
                self.config.max_iterations.iter().map(|iters| HyperParams {
                    alpha: *alpha,
                    max_iterations: *iters,
                })
            })
            .collect()
    }

    fn fit(split: &Split, params: HyperParams) -> Result<LogisticPipeline> {
        let scaler = StandardScaler::fit(&split.records);
        let dataset = Dataset::new(
            scaler.transform(&split.records),
            Array1::from(split.labels.clone()),
        );

        let fitted = LogisticRegression::<f64>::default()
            .alpha(params.alpha)
            .max_iterations(params.max_iterations)
            .fit(&dataset)
            .map_err(|e| CourtsideError::TrainingFailed {
                reason: e.to_string(),
            })?;

        // linfa picks the more frequent label as the positive class. Stored
        // weights always score a home win.
        let sign = if fitted.labels().pos.class { 1.0 } else { -1.0 };

        Ok(LogisticPipeline::new(
            scaler,
            LogisticWeights {
                coefficients: fitted.params().iter().map(|w| sign * w).collect(),
                intercept: sign * fitted.intercept(),
            },
        ))
    }

    fn score(pipeline: &LogisticPipeline, split: &Split) -> Vec<f64> {
        split
            .records
            .rows()
            .into_iter()
            .map(|row| pipeline.predict_home_win(&row.to_vec()))
            .collect()
    }

    fn search(&self, train: &[&TrainingSample], n_features: usize) -> Result<(HyperParams, f64)> {
        let grid = self.grid();
        let fallback = grid.first().copied().ok_or_else(|| CourtsideError::TrainingFailed {
            reason: "hyperparameter grid is empty".to_string(),
        })?;

        let n_val = holdout_size(train.len(), self.config.validation_fraction);
        let (inner, validation) = train.split_at(train.len() - n_val);
        let inner = Split::from_samples(inner, n_features)?;
        let validation = Split::from_samples(validation, n_features)?;

        if !inner.has_both_classes() {
            warn!("Inner training split has a single class, skipping hyperparameter search");
            return Ok((fallback, 0.5));
        }

        let mut best: Option<(HyperParams, f64)> = None;
        for params in grid {
            match Self::fit(&inner, params) {
                Ok(pipeline) => {
                    let auc = roc_auc(&Self::score(&pipeline, &validation), &validation.labels);
                    debug!(alpha = params.alpha, max_iterations = params.max_iterations, auc, "Grid point scored");
                    if best.map_or(true, |(_, best_auc)| auc > best_auc) {
                        best = Some((params, auc));
                    }
                }
                Err(e) => {
                    warn!(alpha = params.alpha, max_iterations = params.max_iterations, error = %e, "Grid point failed to fit");
                }
            }
        }

        best.ok_or_else(|| CourtsideError::TrainingFailed {
            reason: "no hyperparameter combination could be fitted".to_string(),
        })
    }
}

impl ModelTrainer for LogisticTrainer {
    fn train(&self, samples: &[TrainingSample], schema: &FeatureSchema) -> Result<TrainedCandidate> {
        let n_features = schema.len();
        let mut usable: Vec<&TrainingSample> = samples
            .iter()
            .filter(|s| {
                s.schema_version == schema.version
                    && s.features.len() == n_features
                    && s.features.iter().all(|v| v.is_finite())
            })
            .collect();
        if usable.len() < samples.len() {
            warn!(
                skipped = samples.len() - usable.len(),
                schema = %schema.version,
                "Skipping samples that do not match the feature schema"
            );
        }

        let required = self.config.min_training_samples.max(4);
        if usable.len() < required {
            return Err(CourtsideError::InsufficientTrainingData {
                available: usable.len(),
                required,
            });
        }

        usable.sort_by_key(|s| (s.game_date, s.collected_at));
        let n_test = holdout_size(usable.len(), self.config.test_fraction);
        let (train, test) = usable.split_at(usable.len() - n_test);

        let train_split = Split::from_samples(train, n_features)?;
        if !train_split.has_both_classes() {
            return Err(CourtsideError::InsufficientTrainingData {
                available: train_split.len(),
                required,
            });
        }
        let test_split = Split::from_samples(test, n_features)?;

        let (best_params, validation_auc) = self.search(train, n_features)?;
        let pipeline = Self::fit(&train_split, best_params)?;
        let report = EvaluationReport::from_scores(&Self::score(&pipeline, &test_split), &test_split.labels);

        info!(
            training_samples = train_split.len(),
            test_samples = test_split.len(),
            alpha = best_params.alpha,
            max_iterations = best_params.max_iterations,
            accuracy = report.accuracy,
            roc_auc = report.roc_auc,
            "Candidate model trained"
        );

        Ok(TrainedCandidate {
            pipeline,
            report,
            best_params,
            validation_auc,
            training_samples: train_split.len(),
            test_samples: test_split.len(),
        })
    }
}
