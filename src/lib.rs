#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Draw-based calibration trainer.
pub mod calibrate;
/// Metric and training configuration types.
pub mod config;
/// Centralized constants used across normalization, distance, and calibration.
pub mod constants;
/// Distance metrics and candidate ranking.
pub mod distance;
/// Immutable coding index over the reference taxonomy.
pub mod index;
/// Trained model artifact types.
pub mod model;
/// Title normalization and tokenization.
pub mod normalize;
/// Prediction protocol (single and batch).
pub mod predict;
/// Model artifact serialization and atomic file persistence.
pub mod store;
/// Taxonomy row types and parsing helpers.
pub mod taxonomy;
/// Shared type aliases.
pub mod types;

mod errors;

pub use calibrate::train;
pub use config::{DistanceMetricConfig, EditWeights, TrainingConfig};
pub use distance::{CandidateMatch, rank};
pub use errors::CodingError;
pub use index::{CodingIndex, ReferenceEntry};
pub use model::{CalibrationBucket, TrainedModel};
pub use normalize::normalize;
pub use predict::{Decision, PredictionResult, predict, predict_batch};
pub use taxonomy::{TaxonomyRow, parse_taxonomy_rows};
pub use types::{Code, NormalizedString, Title, Token};
