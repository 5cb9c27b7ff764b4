//! Prediction protocol: normalize, rank, then commit or abstain.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DistanceMetricConfig;
use crate::constants::predict as consts;
use crate::distance::{CandidateMatch, rank};
use crate::errors::CodingError;
use crate::index::CodingIndex;
use crate::model::TrainedModel;
use crate::normalize::normalize;
use crate::types::Code;

/// Terminal outcome of a single prediction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Confidence cleared the acceptance bar; `predicted_code` is set.
    Committed,
    /// Confidence fell short (or no candidates matched); no code is returned,
    /// but candidates remain available for inspection.
    Abstained,
}

/// Result of coding one query string. One per query; not retained by the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// The raw query as supplied by the caller.
    pub query: String,
    /// Committed occupation code, when the decision committed.
    pub predicted_code: Option<Code>,
    /// Calibrated probability (with a model) or raw similarity (without).
    pub confidence: f64,
    /// Ranked candidates, best first.
    pub candidates: Vec<CandidateMatch>,
    /// Commit-or-abstain outcome.
    pub decision: Decision,
}

/// Code a single query against `index`, optionally guided by a trained model.
///
/// With a model: the top candidate's score is looked up in the calibration
/// table and the prediction commits only when the resulting confidence
/// reaches the model's acceptance bar; scores outside the calibration domain
/// abstain. Without a model: raw nearest-match coding, committing the top
/// candidate unconditionally (only an empty candidate list abstains).
pub fn predict(
    query: &str,
    model: Option<&TrainedModel>,
    index: &CodingIndex,
) -> Result<PredictionResult, CodingError> {
    if query.trim().is_empty() {
        return Err(CodingError::EmptyQuery);
    }
    if let Some(model) = model {
        model.check_compatible(index)?;
    }

    let normalized = normalize(query);
    match model {
        Some(model) => {
            let candidates = rank(&normalized, index, &model.metric, model.num_allowed_codes);
            Ok(calibrated_result(query, candidates, model))
        }
        None => {
            let config = DistanceMetricConfig::default();
            let candidates = rank(&normalized, index, &config, consts::DEFAULT_TOP_K);
            Ok(nearest_match_result(query, candidates))
        }
    }
}

fn calibrated_result(
    query: &str,
    candidates: Vec<CandidateMatch>,
    model: &TrainedModel,
) -> PredictionResult {
    let (decision, predicted_code, confidence) = match candidates.first() {
        Some(top) => match model.confidence_for(top.normalized_score) {
            Some((probability, low_reliability)) => {
                if probability >= model.acceptance_probability {
                    if low_reliability {
                        debug!(
                            query,
                            probability, "committing on a lower-reliability calibration bucket"
                        );
                    }
                    (Decision::Committed, Some(top.code.clone()), probability)
                } else {
                    (Decision::Abstained, None, probability)
                }
            }
            // Score outside the calibrated domain: abstain rather than guess.
            None => (Decision::Abstained, None, 0.0),
        },
        None => (Decision::Abstained, None, 0.0),
    };
    PredictionResult {
        query: query.to_string(),
        predicted_code,
        confidence,
        candidates,
        decision,
    }
}

fn nearest_match_result(query: &str, candidates: Vec<CandidateMatch>) -> PredictionResult {
    match candidates.first() {
        Some(top) => PredictionResult {
            query: query.to_string(),
            predicted_code: Some(top.code.clone()),
            confidence: top.normalized_score,
            decision: Decision::Committed,
            candidates,
        },
        None => PredictionResult {
            query: query.to_string(),
            predicted_code: None,
            confidence: 0.0,
            candidates,
            decision: Decision::Abstained,
        },
    }
}

/// Code many queries, independently, preserving input order.
///
/// All queries are validated before any work happens, so a blank input fails
/// the whole batch with `EmptyQuery` and never returns partial results.
/// Per-query computation runs in parallel; ordering of the output matches the
/// input exactly.
pub fn predict_batch(
    queries: &[String],
    model: Option<&TrainedModel>,
    index: &CodingIndex,
) -> Result<Vec<PredictionResult>, CodingError> {
    if queries.iter().any(|query| query.trim().is_empty()) {
        return Err(CodingError::EmptyQuery);
    }
    queries
        .par_iter()
        .map(|query| predict(query, model, index))
        .collect()
}
