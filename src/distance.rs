//! Distance computation between a normalized query and reference entries.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{DistanceMetricConfig, EditWeights};
use crate::constants::distance as consts;
use crate::index::{CodingIndex, ReferenceEntry};
use crate::normalize::tokens;
use crate::types::{Code, NormalizedString, Token};

/// One scored reference entry for a single query. Ephemeral; ranked and
/// discarded after prediction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateMatch {
    /// Position of the matched entry within the coding index.
    pub index: usize,
    /// Code of the matched entry.
    pub code: Code,
    /// Normalized title of the matched entry.
    pub title: NormalizedString,
    /// Metric distance; lower is more similar.
    pub raw_distance: f64,
    /// Similarity in (0, 1]: `1 / (1 + raw_distance)`.
    pub normalized_score: f64,
}

/// Map a raw distance into the (0, 1] similarity domain shared with the
/// calibration table.
pub fn normalized_score(raw_distance: f64) -> f64 {
    1.0 / (1.0 + raw_distance)
}

/// Score one entry against a normalized query. `None` means no match (above
/// the wordwise cap, or outside the substring containment grades). Defined
/// only for non-empty queries; an empty token list never matches.
pub fn score(
    query: &NormalizedString,
    entry: &ReferenceEntry,
    config: &DistanceMetricConfig,
) -> Option<f64> {
    let query_tokens = tokens(query);
    let entry_tokens = tokens(&entry.normalized_title);
    score_tokens(&query_tokens, &entry_tokens, config)
}

fn score_tokens(
    query_tokens: &[Token],
    entry_tokens: &[Token],
    config: &DistanceMetricConfig,
) -> Option<f64> {
    if query_tokens.is_empty() || entry_tokens.is_empty() {
        return None;
    }
    match config {
        DistanceMetricConfig::Wordwise {
            weights,
            max_threshold,
        } => wordwise_distance(query_tokens, entry_tokens, weights, *max_threshold),
        DistanceMetricConfig::Substring => substring_distance(query_tokens, entry_tokens),
    }
}

/// Minimum weighted OSA distance over all query-word × title-word pairs. One
/// well-matching word suffices. Distances above `cap` report no-match.
fn wordwise_distance(
    query_tokens: &[Token],
    entry_tokens: &[Token],
    weights: &EditWeights,
    cap: Option<f64>,
) -> Option<f64> {
    let mut best: Option<f64> = None;
    for query_token in query_tokens {
        for entry_token in entry_tokens {
            let distance = osa_distance(query_token, entry_token, weights);
            if distance == 0.0 {
                // Perfect word match; nothing can beat it, caps are positive.
                return Some(0.0);
            }
            best = Some(match best {
                Some(current) if current <= distance => current,
                _ => distance,
            });
        }
    }
    match (best, cap) {
        (Some(distance), Some(cap)) if distance > cap => None,
        (result, _) => result,
    }
}

/// Weighted optimal string alignment distance over characters: insertion,
/// deletion, substitution, and adjacent transposition, each at its configured
/// cost.
fn osa_distance(a: &str, b: &str, weights: &EditWeights) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len() as f64 * weights.insertion;
    }
    if b.is_empty() {
        return a.len() as f64 * weights.deletion;
    }

    let cols = b.len() + 1;
    let mut two_ago = vec![0.0_f64; cols];
    let mut one_ago = vec![0.0_f64; cols];
    let mut current = vec![0.0_f64; cols];

    for (j, slot) in one_ago.iter_mut().enumerate() {
        *slot = j as f64 * weights.insertion;
    }

    for i in 1..=a.len() {
        current[0] = i as f64 * weights.deletion;
        for j in 1..=b.len() {
            let substitution_cost = if a[i - 1] == b[j - 1] {
                0.0
            } else {
                weights.substitution
            };
            let mut best = (one_ago[j] + weights.deletion)
                .min(current[j - 1] + weights.insertion)
                .min(one_ago[j - 1] + substitution_cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(two_ago[j - 2] + weights.transposition);
            }
            current[j] = best;
        }
        std::mem::swap(&mut two_ago, &mut one_ago);
        std::mem::swap(&mut one_ago, &mut current);
    }
    one_ago[b.len()]
}

/// Graded token-level containment: equal sequences, contiguous run in either
/// direction, or token subset in either direction.
fn substring_distance(query_tokens: &[Token], entry_tokens: &[Token]) -> Option<f64> {
    if query_tokens == entry_tokens {
        return Some(consts::SUBSTRING_EXACT);
    }
    if contains_contiguous(entry_tokens, query_tokens)
        || contains_contiguous(query_tokens, entry_tokens)
    {
        return Some(consts::SUBSTRING_CONTIGUOUS);
    }
    if is_token_subset(query_tokens, entry_tokens) || is_token_subset(entry_tokens, query_tokens) {
        return Some(consts::SUBSTRING_TOKEN_SUBSET);
    }
    None
}

fn contains_contiguous(haystack: &[Token], needle: &[Token]) -> bool {
    !needle.is_empty()
        && needle.len() <= haystack.len()
        && haystack.windows(needle.len()).any(|window| window == needle)
}

fn is_token_subset(subset: &[Token], superset: &[Token]) -> bool {
    !subset.is_empty()
        && subset
            .iter()
            .all(|token| superset.iter().any(|other| other == token))
}

/// Rank reference entries for a normalized query.
///
/// Candidates come from the index prefilter, are scored in parallel, and are
/// sorted by ascending distance with ties broken by shorter normalized title
/// then index order. The final sort is total, so output is identical
/// regardless of thread scheduling.
pub fn rank(
    query: &NormalizedString,
    index: &CodingIndex,
    config: &DistanceMetricConfig,
    top_k: usize,
) -> Vec<CandidateMatch> {
    let query_tokens = tokens(query);
    let candidate_indices = index.candidates_for(query, config);

    let mut matches: Vec<CandidateMatch> = candidate_indices
        .par_iter()
        .filter_map(|&idx| {
            let entry_tokens = index.tokens_of(idx);
            let raw_distance = score_tokens(&query_tokens, entry_tokens, config)?;
            let entry = index.entry(idx)?;
            Some(CandidateMatch {
                index: idx,
                code: entry.code.clone(),
                title: entry.normalized_title.clone(),
                raw_distance,
                normalized_score: normalized_score(raw_distance),
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        a.raw_distance
            .total_cmp(&b.raw_distance)
            .then_with(|| a.title.chars().count().cmp(&b.title.chars().count()))
            .then_with(|| a.index.cmp(&b.index))
    });
    matches.truncate(top_k);
    matches
}
