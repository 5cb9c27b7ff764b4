//! Trained model artifact produced by the calibration trainer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DistanceMetricConfig;
use crate::constants::store;
use crate::errors::CodingError;
use crate::index::CodingIndex;

/// Estimated correctness probability for one similarity-score bucket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBucket {
    /// Inclusive lower bound of the bucket's score range.
    pub lower: f64,
    /// Exclusive upper bound of the bucket's score range (inclusive for the top bucket).
    pub upper: f64,
    /// Mean probability, across draws, that the top candidate at this score is correct.
    pub probability: f64,
    /// Across-draw standard deviation of the per-draw probabilities.
    pub std_error: f64,
    /// Number of base observations that fell into this bucket.
    pub observations: usize,
    /// Set when the normality screen flagged this bucket's draw distribution.
    pub low_reliability: bool,
}

impl CalibrationBucket {
    /// True when `score` falls inside this bucket's range. The top bucket
    /// closes at 1.0 so exact matches (score 1.0) stay in domain.
    pub fn contains(&self, score: f64) -> bool {
        if score < self.lower {
            return false;
        }
        if (self.upper - 1.0).abs() < f64::EPSILON {
            score <= self.upper
        } else {
            score < self.upper
        }
    }
}

/// Immutable trained model: metric parameters, decision threshold, and the
/// calibration table. Retraining produces a new instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    /// Artifact format version for the model store.
    #[serde(default = "default_format_version")]
    pub format_version: u8,
    /// Metric configuration the model was trained under.
    pub metric: DistanceMetricConfig,
    /// Candidate list length used during training and prediction.
    pub num_allowed_codes: usize,
    /// Number of bootstrap draws used during training.
    pub n_draws: usize,
    /// Seed the draws were generated from.
    pub seed: u64,
    /// Probability a bucket must reach before predictions commit.
    pub acceptance_probability: f64,
    /// Lowest score from which every calibration bucket reaches the
    /// acceptance bar, so "score >= threshold" and "bucket confidence clears
    /// the bar" agree; `None` means no such score exists and the predictor
    /// always abstains.
    pub decision_threshold: Option<f64>,
    /// Score-bucket → correctness-probability table, ascending by `lower`.
    pub calibration: Vec<CalibrationBucket>,
    /// Fingerprint of the coding index the model was trained against.
    pub index_fingerprint: u64,
    /// When training completed.
    pub trained_at: DateTime<Utc>,
}

fn default_format_version() -> u8 {
    store::MODEL_FORMAT_VERSION
}

impl TrainedModel {
    /// Calibrated confidence for a similarity score, plus the bucket's
    /// reliability flag. `None` when the score lies outside the domain the
    /// table was built over; callers degrade that to abstention.
    pub fn confidence_for(&self, score: f64) -> Option<(f64, bool)> {
        self.calibration
            .iter()
            .find(|bucket| bucket.contains(score))
            .map(|bucket| (bucket.probability, bucket.low_reliability))
    }

    /// Reject pairing this model with an index it was not trained against.
    pub fn check_compatible(&self, index: &CodingIndex) -> Result<(), CodingError> {
        if self.index_fingerprint != index.fingerprint() {
            return Err(CodingError::IndexMismatch {
                model: self.index_fingerprint,
                index: index.fingerprint(),
            });
        }
        Ok(())
    }
}
