use serde::{Deserialize, Serialize};

use crate::constants::{calibration, distance};
use crate::errors::CodingError;

/// Per-operation costs for the weighted edit distance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EditWeights {
    /// Cost of inserting a character.
    pub insertion: f64,
    /// Cost of deleting a character.
    pub deletion: f64,
    /// Cost of substituting one character for another.
    pub substitution: f64,
    /// Cost of transposing two adjacent characters.
    pub transposition: f64,
}

impl Default for EditWeights {
    fn default() -> Self {
        Self {
            insertion: distance::DEFAULT_EDIT_WEIGHT,
            deletion: distance::DEFAULT_EDIT_WEIGHT,
            substitution: distance::DEFAULT_EDIT_WEIGHT,
            transposition: distance::DEFAULT_EDIT_WEIGHT,
        }
    }
}

impl EditWeights {
    fn all_finite_and_non_negative(&self) -> bool {
        [
            self.insertion,
            self.deletion,
            self.substitution,
            self.transposition,
        ]
        .iter()
        .all(|weight| weight.is_finite() && *weight >= 0.0)
    }
}

/// Selects the distance algorithm and its parameters. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "metric", rename_all = "snake_case")]
pub enum DistanceMetricConfig {
    /// Weighted edit distance evaluated per word pair, optionally capped.
    Wordwise {
        /// Edit operation costs.
        weights: EditWeights,
        /// Distances above this cap are reported as no-match.
        max_threshold: Option<f64>,
    },
    /// Graded containment distance over normalized titles.
    Substring,
}

impl Default for DistanceMetricConfig {
    fn default() -> Self {
        Self::Wordwise {
            weights: EditWeights::default(),
            max_threshold: Some(distance::DEFAULT_WORDWISE_CAP),
        }
    }
}

impl DistanceMetricConfig {
    /// Reject metric parameters the distance engine cannot operate under.
    pub fn validate(&self) -> Result<(), CodingError> {
        match self {
            Self::Wordwise {
                weights,
                max_threshold,
            } => {
                if !weights.all_finite_and_non_negative() {
                    return Err(CodingError::InvalidModelType(
                        "edit weights must be finite and non-negative".to_string(),
                    ));
                }
                if let Some(cap) = max_threshold {
                    if !cap.is_finite() || *cap <= 0.0 {
                        return Err(CodingError::InvalidModelType(
                            "max_threshold must be a positive finite number".to_string(),
                        ));
                    }
                }
                Ok(())
            }
            Self::Substring => Ok(()),
        }
    }
}

/// Training knobs for the calibration trainer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Distance metric the model is trained under.
    pub metric: DistanceMetricConfig,
    /// Candidate list length per ranked example.
    pub num_allowed_codes: usize,
    /// Number of bootstrap draws over the labeled set.
    pub n_draws: usize,
    /// Screen per-bucket draw distributions for normality deviations.
    pub check_normality: bool,
    /// Probability a score bucket must reach before predictions commit.
    pub acceptance_probability: f64,
    /// Seed that controls deterministic bootstrap resampling.
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            metric: DistanceMetricConfig::default(),
            num_allowed_codes: calibration::DEFAULT_NUM_ALLOWED_CODES,
            n_draws: calibration::DEFAULT_N_DRAWS,
            check_normality: false,
            acceptance_probability: calibration::DEFAULT_ACCEPTANCE_PROBABILITY,
            seed: calibration::DEFAULT_SEED,
        }
    }
}
