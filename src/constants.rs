/// Constants used by the distance engine.
pub mod distance {
    /// Default cost applied to every edit operation when no weights are given.
    pub const DEFAULT_EDIT_WEIGHT: f64 = 1.0;
    /// Substring-metric distance for an exact title match.
    pub const SUBSTRING_EXACT: f64 = 0.0;
    /// Substring-metric distance for contiguous containment (either direction).
    pub const SUBSTRING_CONTIGUOUS: f64 = 1.0;
    /// Substring-metric distance for token-subset containment (either direction).
    pub const SUBSTRING_TOKEN_SUBSET: f64 = 2.0;
    /// Wordwise cap used by the default (model-free) prediction config.
    pub const DEFAULT_WORDWISE_CAP: f64 = 3.0;
}

/// Constants used by the calibration trainer.
pub mod calibration {
    /// Number of equal-width score buckets over the (0, 1] similarity domain.
    pub const NUM_BUCKETS: usize = 20;
    /// Minimum distinct labeled titles required before bootstrap draws are meaningful.
    pub const MIN_TRAINING_EXAMPLES: usize = 2;
    /// Default number of allowed candidate codes per ranked example.
    pub const DEFAULT_NUM_ALLOWED_CODES: usize = 1291;
    /// Default number of bootstrap draws.
    pub const DEFAULT_N_DRAWS: usize = 250;
    /// Default probability a bucket must reach before predictions commit.
    pub const DEFAULT_ACCEPTANCE_PROBABILITY: f64 = 0.8;
    /// Default seed for the draw RNG.
    pub const DEFAULT_SEED: u64 = 42;
    /// Absolute skewness above which a bucket's draw distribution is flagged.
    pub const NORMALITY_SKEW_LIMIT: f64 = 1.0;
    /// Absolute excess kurtosis above which a bucket's draw distribution is flagged.
    pub const NORMALITY_KURTOSIS_LIMIT: f64 = 2.0;
    /// Minimum per-bucket draw samples before the normality screen applies.
    pub const NORMALITY_MIN_SAMPLES: usize = 8;
}

/// Constants used by the predictor.
pub mod predict {
    /// Candidate list length for model-free nearest-match prediction.
    pub const DEFAULT_TOP_K: usize = 10;
}

/// Constants used by the model store.
pub mod store {
    /// Version tag embedded in persisted model artifacts.
    pub const MODEL_FORMAT_VERSION: u8 = 1;
}
