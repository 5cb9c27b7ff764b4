//! Draw-based calibration of a distance metric against labeled examples.
//!
//! For every labeled (title, true code) pair the trainer ranks candidates and
//! records whether the top-ranked code was correct at its similarity score.
//! Bootstrap resampling over those observations ("draws") estimates, per
//! score bucket, the probability that the top candidate is correct.

use std::collections::BTreeSet;

use chrono::Utc;
use rand::Rng;
use tracing::{info, warn};

use crate::config::TrainingConfig;
use crate::constants::{calibration as consts, store};
use crate::distance::rank;
use crate::errors::CodingError;
use crate::index::CodingIndex;
use crate::model::{CalibrationBucket, TrainedModel};
use crate::normalize::normalize;
use crate::types::{Code, Title};

/// Small deterministic RNG (splitmix64) driving reproducible bootstrap draws.
/// Seeded explicitly from the training config; never ambient state.
#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64_internal(&mut self) -> u64 {
        let mut z = self.state.wrapping_add(0x9E3779B97F4A7C15);
        self.state = z;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }
}

impl rand::RngCore for DeterministicRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64_internal() as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next_u64_internal()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut offset = 0;
        while offset < dest.len() {
            let value = self.next_u64_internal();
            let bytes = value.to_le_bytes();
            let remaining = dest.len() - offset;
            let copy_len = remaining.min(bytes.len());
            dest[offset..offset + copy_len].copy_from_slice(&bytes[..copy_len]);
            offset += copy_len;
        }
    }
}

/// One base observation: the score bucket of the top-ranked candidate for a
/// labeled example, and whether its code matched the truth.
#[derive(Clone, Copy, Debug)]
struct Observation {
    bucket: usize,
    correct: bool,
}

/// Train a calibration model for `config.metric` against `index`.
///
/// Never mutates the index; returns a new immutable model or an error.
/// Identical inputs (including the seed) always produce an identical model.
pub fn train(
    index: &CodingIndex,
    labeled: &[(Title, Code)],
    config: &TrainingConfig,
) -> Result<TrainedModel, CodingError> {
    config.metric.validate()?;
    validate_training_set(labeled, config)?;

    info!(
        examples = labeled.len(),
        n_draws = config.n_draws,
        num_allowed_codes = config.num_allowed_codes,
        check_normality = config.check_normality,
        "training similarity-based model (this can take some time)"
    );

    let observations = observe(index, labeled, config);
    let draws = run_draws(&observations, config);
    let calibration = build_table(&observations, &draws, config);
    let decision_threshold = derive_threshold(&calibration, config.acceptance_probability);

    info!(
        buckets = calibration.len(),
        threshold = ?decision_threshold,
        "training complete"
    );

    Ok(TrainedModel {
        format_version: store::MODEL_FORMAT_VERSION,
        metric: config.metric.clone(),
        num_allowed_codes: config.num_allowed_codes,
        n_draws: config.n_draws,
        seed: config.seed,
        acceptance_probability: config.acceptance_probability,
        decision_threshold,
        calibration,
        index_fingerprint: index.fingerprint(),
        trained_at: Utc::now(),
    })
}

fn validate_training_set(
    labeled: &[(Title, Code)],
    config: &TrainingConfig,
) -> Result<(), CodingError> {
    if labeled.is_empty() {
        return Err(CodingError::InsufficientData(
            "labeled example set is empty".to_string(),
        ));
    }
    let distinct: BTreeSet<&str> = labeled.iter().map(|(title, _)| title.as_str()).collect();
    if distinct.len() < consts::MIN_TRAINING_EXAMPLES {
        return Err(CodingError::InsufficientData(format!(
            "{} distinct titles, need at least {}",
            distinct.len(),
            consts::MIN_TRAINING_EXAMPLES
        )));
    }
    if config.n_draws == 0 {
        return Err(CodingError::InsufficientData(
            "n_draws must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Rank each labeled example and record the top candidate's bucket and hit.
/// Examples with no candidates at all count as misses in the lowest bucket.
fn observe(
    index: &CodingIndex,
    labeled: &[(Title, Code)],
    config: &TrainingConfig,
) -> Vec<Observation> {
    labeled
        .iter()
        .map(|(title, true_code)| {
            let query = normalize(title);
            let ranked = rank(&query, index, &config.metric, config.num_allowed_codes);
            match ranked.first() {
                Some(top) => Observation {
                    bucket: bucket_of(top.normalized_score),
                    correct: top.code == *true_code,
                },
                None => Observation {
                    bucket: 0,
                    correct: false,
                },
            }
        })
        .collect()
}

/// Index of the equal-width bucket covering `score` within (0, 1].
fn bucket_of(score: f64) -> usize {
    let clamped = score.clamp(0.0, 1.0);
    ((clamped * consts::NUM_BUCKETS as f64) as usize).min(consts::NUM_BUCKETS - 1)
}

fn bucket_bounds(bucket: usize) -> (f64, f64) {
    let width = 1.0 / consts::NUM_BUCKETS as f64;
    (bucket as f64 * width, (bucket + 1) as f64 * width)
}

/// Per-bucket correctness fractions from `n_draws` bootstrap resamples of the
/// observation set. A bucket contributes a sample only in draws where it was
/// actually drawn.
fn run_draws(observations: &[Observation], config: &TrainingConfig) -> Vec<Vec<f64>> {
    let mut rng = DeterministicRng::new(config.seed);
    let mut per_bucket: Vec<Vec<f64>> = vec![Vec::new(); consts::NUM_BUCKETS];

    for _ in 0..config.n_draws {
        let mut hits = [0usize; consts::NUM_BUCKETS];
        let mut totals = [0usize; consts::NUM_BUCKETS];
        for _ in 0..observations.len() {
            let pick = observations[rng.random_range(0..observations.len())];
            totals[pick.bucket] += 1;
            if pick.correct {
                hits[pick.bucket] += 1;
            }
        }
        for bucket in 0..consts::NUM_BUCKETS {
            if totals[bucket] > 0 {
                per_bucket[bucket].push(hits[bucket] as f64 / totals[bucket] as f64);
            }
        }
    }
    per_bucket
}

fn build_table(
    observations: &[Observation],
    draws: &[Vec<f64>],
    config: &TrainingConfig,
) -> Vec<CalibrationBucket> {
    let mut table = Vec::new();
    for bucket in 0..consts::NUM_BUCKETS {
        let base_count = observations.iter().filter(|o| o.bucket == bucket).count();
        if base_count == 0 {
            continue;
        }
        let samples = &draws[bucket];
        let (probability, std_error) = if samples.is_empty() {
            // Bucket never appeared in any draw; fall back to the base fraction.
            let hits = observations
                .iter()
                .filter(|o| o.bucket == bucket && o.correct)
                .count();
            (hits as f64 / base_count as f64, 0.0)
        } else {
            (mean(samples), std_dev(samples))
        };
        let low_reliability = config.check_normality && violates_normality(samples, bucket);
        let (lower, upper) = bucket_bounds(bucket);
        table.push(CalibrationBucket {
            lower,
            upper,
            probability,
            std_error,
            observations: base_count,
            low_reliability,
        });
    }
    table
}

/// Skewness / excess-kurtosis screen over a bucket's across-draw probability
/// samples. Deviations are advisory: the bucket is flagged, never rejected.
fn violates_normality(samples: &[f64], bucket: usize) -> bool {
    if samples.len() < consts::NORMALITY_MIN_SAMPLES {
        return false;
    }
    let m = mean(samples);
    let sd = std_dev(samples);
    if sd == 0.0 {
        return false;
    }
    let n = samples.len() as f64;
    let m3 = samples.iter().map(|x| (x - m).powi(3)).sum::<f64>() / n;
    let m4 = samples.iter().map(|x| (x - m).powi(4)).sum::<f64>() / n;
    let skewness = m3 / sd.powi(3);
    let excess_kurtosis = m4 / sd.powi(4) - 3.0;
    let violated = skewness.abs() > consts::NORMALITY_SKEW_LIMIT
        || excess_kurtosis.abs() > consts::NORMALITY_KURTOSIS_LIMIT;
    if violated {
        warn!(
            bucket,
            skewness, excess_kurtosis, "normality deviation; bucket flagged lower-reliability"
        );
    }
    violated
}

/// Lowest bucket lower-bound from which every higher bucket also reaches the
/// acceptance bar. Bucket probabilities need not be monotonic in score, so a
/// lone low bucket crossing the bar below failing buckets must not become the
/// threshold. `None` when no such suffix exists.
fn derive_threshold(table: &[CalibrationBucket], acceptance: f64) -> Option<f64> {
    let mut threshold = None;
    for bucket in table {
        if bucket.probability >= acceptance {
            threshold.get_or_insert(bucket.lower);
        } else {
            threshold = None;
        }
    }
    threshold
}

fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}

fn std_dev(samples: &[f64]) -> f64 {
    let m = mean(samples);
    (samples.iter().map(|x| (x - m).powi(2)).sum::<f64>() / samples.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistanceMetricConfig;
    use crate::taxonomy::TaxonomyRow;

    fn sample_index() -> CodingIndex {
        CodingIndex::build(vec![
            TaxonomyRow::new("Bürokauffrau", "71402"),
            TaxonomyRow::new("Abschleifer", "24222"),
            TaxonomyRow::new("Maschinenbauingenieur", "25104"),
            TaxonomyRow::new("Krankenpfleger", "81302"),
        ])
        .expect("index")
    }

    fn labeled() -> Vec<(String, String)> {
        vec![
            ("Bürokauffrau".to_string(), "71402".to_string()),
            ("Abschleifer".to_string(), "24222".to_string()),
            ("Maschinenbauing.".to_string(), "25104".to_string()),
            ("Krankenpflegerin".to_string(), "81302".to_string()),
        ]
    }

    fn config() -> TrainingConfig {
        TrainingConfig {
            num_allowed_codes: 4,
            n_draws: 50,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn train_rejects_empty_labeled_set() {
        let index = sample_index();
        let err = train(&index, &[], &config()).unwrap_err();
        assert!(matches!(err, CodingError::InsufficientData(_)));
    }

    #[test]
    fn train_rejects_single_distinct_title() {
        let index = sample_index();
        let repeated = vec![
            ("Bürokauffrau".to_string(), "71402".to_string()),
            ("Bürokauffrau".to_string(), "71402".to_string()),
        ];
        let err = train(&index, &repeated, &config()).unwrap_err();
        assert!(matches!(err, CodingError::InsufficientData(_)));
    }

    #[test]
    fn train_rejects_zero_draws() {
        let index = sample_index();
        let bad = TrainingConfig {
            n_draws: 0,
            ..config()
        };
        let err = train(&index, &labeled(), &bad).unwrap_err();
        assert!(matches!(err, CodingError::InsufficientData(_)));
    }

    #[test]
    fn train_rejects_invalid_metric_parameters() {
        let index = sample_index();
        let bad = TrainingConfig {
            metric: DistanceMetricConfig::Wordwise {
                weights: crate::config::EditWeights {
                    insertion: f64::NAN,
                    ..Default::default()
                },
                max_threshold: None,
            },
            ..config()
        };
        let err = train(&index, &labeled(), &bad).unwrap_err();
        assert!(matches!(err, CodingError::InvalidModelType(_)));
    }

    #[test]
    fn identical_seeds_produce_identical_models() {
        let index = sample_index();
        let first = train(&index, &labeled(), &config()).expect("model");
        let second = train(&index, &labeled(), &config()).expect("model");
        assert_eq!(first.calibration, second.calibration);
        assert_eq!(first.decision_threshold, second.decision_threshold);
    }

    #[test]
    fn different_seeds_may_shift_estimates_but_keep_domain() {
        let index = sample_index();
        let other = TrainingConfig {
            seed: 7,
            ..config()
        };
        let model = train(&index, &labeled(), &other).expect("model");
        for bucket in &model.calibration {
            assert!(bucket.lower >= 0.0 && bucket.upper <= 1.0 + f64::EPSILON);
            assert!((0.0..=1.0).contains(&bucket.probability));
            assert!(bucket.observations > 0);
        }
    }

    #[test]
    fn exact_matches_calibrate_to_a_committing_threshold() {
        let index = sample_index();
        let exact: Vec<(String, String)> = vec![
            ("Bürokauffrau".to_string(), "71402".to_string()),
            ("Abschleifer".to_string(), "24222".to_string()),
            ("Krankenpfleger".to_string(), "81302".to_string()),
        ];
        let model = train(&index, &exact, &config()).expect("model");
        // Every observation is an exact match: top bucket probability 1.0.
        let threshold = model.decision_threshold.expect("threshold");
        assert!(threshold > 0.9);
        assert_eq!(model.confidence_for(1.0), Some((1.0, false)));
    }

    #[test]
    fn substring_metric_trains_too() {
        let index = sample_index();
        let substring = TrainingConfig {
            metric: DistanceMetricConfig::Substring,
            ..config()
        };
        let model = train(&index, &labeled(), &substring).expect("model");
        assert_eq!(model.metric, DistanceMetricConfig::Substring);
        assert!(!model.calibration.is_empty());
    }

    #[test]
    fn normality_screen_flags_skewed_draw_distributions() {
        let mut skewed = vec![0.9; 9];
        skewed.push(0.1);
        assert!(violates_normality(&skewed, 19));

        let symmetric = [0.4, 0.45, 0.5, 0.5, 0.5, 0.5, 0.55, 0.6];
        assert!(!violates_normality(&symmetric, 10));

        // Degenerate and undersized samples are never flagged.
        assert!(!violates_normality(&[1.0; 10], 19));
        assert!(!violates_normality(&[0.0, 1.0], 0));
    }

    #[test]
    fn flagged_buckets_surface_low_reliability_in_the_table() {
        let observations = vec![Observation {
            bucket: consts::NUM_BUCKETS - 1,
            correct: true,
        }];
        let mut draws = vec![Vec::new(); consts::NUM_BUCKETS];
        let mut samples = vec![0.9; 9];
        samples.push(0.1);
        draws[consts::NUM_BUCKETS - 1] = samples;

        let screened = TrainingConfig {
            check_normality: true,
            ..config()
        };
        let flagged = build_table(&observations, &draws, &screened);
        assert_eq!(flagged.len(), 1);
        assert!(flagged[0].low_reliability);

        // Same draws without the screen: the flag stays clear.
        let unflagged = build_table(&observations, &draws, &config());
        assert!(!unflagged[0].low_reliability);
    }

    fn bucket(lower: f64, upper: f64, probability: f64) -> CalibrationBucket {
        CalibrationBucket {
            lower,
            upper,
            probability,
            std_error: 0.0,
            observations: 10,
            low_reliability: false,
        }
    }

    #[test]
    fn threshold_ignores_stray_low_crossings() {
        let table = vec![
            bucket(0.40, 0.45, 0.9),
            bucket(0.50, 0.55, 0.3),
            bucket(0.90, 0.95, 0.95),
            bucket(0.95, 1.0, 1.0),
        ];
        // The 0.4 bucket crosses the bar but sits below a failing bucket, so
        // only the all-crossing suffix counts.
        assert_eq!(derive_threshold(&table, 0.8), Some(0.90));
        assert_eq!(derive_threshold(&table, 0.99), Some(0.95));
        assert_eq!(derive_threshold(&table, 1.1), None);
    }

    #[test]
    fn bucket_of_covers_the_unit_interval() {
        assert_eq!(bucket_of(0.0), 0);
        assert_eq!(bucket_of(1.0), consts::NUM_BUCKETS - 1);
        assert_eq!(bucket_of(0.049), 0);
        assert_eq!(bucket_of(0.051), 1);
    }
}
