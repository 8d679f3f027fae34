//! Estimators that turn a feature vector into a home-win probability.

use std::fmt;

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Contract every model family satisfies: a fixed-size numeric vector in,
/// the probability that the home side wins out.
pub trait Estimator: Send + Sync + fmt::Debug {
    fn model_name(&self) -> &str;
    fn n_features(&self) -> usize;
    fn predict_home_win(&self, features: &[f64]) -> f64;
}

/// Z-score normalizer fitted on the training split.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(records: &Array2<f64>) -> Self {
        let n_features = records.ncols();
        if records.nrows() == 0 {
            return Self {
                means: vec![0.0; n_features],
                stds: vec![1.0; n_features],
            };
        }
        let means = records
            .mean_axis(Axis(0))
            .map(|m| m.to_vec())
            .unwrap_or_else(|| vec![0.0; n_features]);
        let stds = records.std_axis(Axis(0), 0.0).to_vec();
        Self { means, stds }
    }

    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }

    fn scale_value(&self, idx: usize, value: f64) -> f64 {
        match (self.means.get(idx), self.stds.get(idx)) {
            // Constant columns carry no signal.
            (Some(mean), Some(std)) if *std > 1e-10 => (value - mean) / std,
            _ => 0.0,
        }
    }

    pub fn transform_row(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        row.iter()
            .enumerate()
            .map(|(idx, value)| self.scale_value(idx, *value))
            .collect()
    }

    pub fn transform(&self, records: &Array2<f64>) -> Array2<f64> {
        let mut scaled = records.clone();
        for mut row in scaled.rows_mut() {
            for (idx, value) in row.iter_mut().enumerate() {
                *value = self.scale_value(idx, *value);
            }
        }
        scaled
    }
}

/// Coefficients of a fitted binary logistic regression.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogisticWeights {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticWeights {
    pub fn probability(&self, scaled: &[f64]) -> f64 {
        let z = self.intercept
            + self
                .coefficients
                .iter()
                .zip(scaled)
                .map(|(w, x)| w * x)
                .sum::<f64>();
        sigmoid(z)
    }
}

/// Scaler followed by logistic regression; the estimator the trainer produces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogisticPipeline {
    pub scaler: StandardScaler,
    pub weights: LogisticWeights,
}

impl LogisticPipeline {
    pub fn new(scaler: StandardScaler, weights: LogisticWeights) -> Self {
        Self { scaler, weights }
    }

    /// Scaler and coefficient dimensions agree with each other.
    pub fn is_consistent(&self) -> bool {
        self.scaler.means.len() == self.scaler.stds.len()
            && self.scaler.len() == self.weights.coefficients.len()
    }
}

impl Estimator for LogisticPipeline {
    fn model_name(&self) -> &str {
        "LogisticRegression"
    }

    fn n_features(&self) -> usize {
        self.weights.coefficients.len()
    }

    fn predict_home_win(&self, features: &[f64]) -> f64 {
        let scaled = self.scaler.transform_row(ArrayView1::from(features));
        self.weights.probability(&scaled)
    }
}

pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
