use std::io;

use thiserror::Error;

/// Error type for index construction, training, prediction, and persistence failures.
#[derive(Debug, Error)]
pub enum CodingError {
    /// Index construction was given zero reference entries.
    #[error("coding index cannot be built from zero reference entries")]
    EmptyIndex,
    /// The requested distance metric configuration is unusable.
    #[error("invalid distance metric configuration: {0}")]
    InvalidModelType(String),
    /// The labeled training set is too small for the requested resampling.
    #[error("insufficient training data: {0}")]
    InsufficientData(String),
    /// A prediction query was empty or whitespace-only.
    #[error("prediction query is empty or whitespace-only")]
    EmptyQuery,
    /// A trained model was paired with an index it was not trained against.
    #[error(
        "trained model fingerprint {model:#018x} does not match coding index fingerprint {index:#018x}"
    )]
    IndexMismatch {
        /// Fingerprint recorded in the trained model.
        model: u64,
        /// Fingerprint of the index supplied at prediction time.
        index: u64,
    },
    /// A model artifact could not be serialized or deserialized.
    #[error("model persistence failure: {0}")]
    Persistence(String),
    /// Filesystem failure while saving or loading a model artifact.
    #[error(transparent)]
    Io(#[from] io::Error),
}
