use occucode::{
    CodingError, CodingIndex, Decision, DistanceMetricConfig, TaxonomyRow, TrainingConfig,
    normalize, predict, rank, train,
};

fn build_index() -> CodingIndex {
    CodingIndex::build(vec![
        TaxonomyRow::new("Bürokauffrau", "71402"),
        TaxonomyRow::new("Bürokaufmann", "71402"),
        TaxonomyRow::new("Abschleifer", "24222"),
        TaxonomyRow::new("Krankenpfleger", "81302"),
        TaxonomyRow::new("Maschinenbauingenieur", "25104"),
        TaxonomyRow::new("Stadtjugendpfleger", "86412"),
    ])
    .expect("index")
}

fn exact_training_set() -> Vec<(String, String)> {
    vec![
        ("Bürokauffrau".to_string(), "71402".to_string()),
        ("Abschleifer".to_string(), "24222".to_string()),
        ("Krankenpfleger".to_string(), "81302".to_string()),
        ("Stadtjugendpfleger".to_string(), "86412".to_string()),
    ]
}

#[test]
fn normalization_is_idempotent_and_diacritic_free() {
    for input in [
        "Bürokauffrau",
        "Straßenbauer",
        "  Kfz -  Mechatroniker ",
        "ÄÖÜ äöü ß",
        "",
    ] {
        let once = normalize(input);
        assert_eq!(normalize(&once), once);
        assert!(!once.chars().any(|ch| "äöüÄÖÜß".contains(ch)));
    }
}

#[test]
fn empty_index_fails_to_build() {
    assert!(matches!(
        CodingIndex::build(Vec::new()),
        Err(CodingError::EmptyIndex)
    ));
}

#[test]
fn rank_is_sorted_and_byte_identical_across_calls() {
    let index = build_index();
    for config in [DistanceMetricConfig::default(), DistanceMetricConfig::Substring] {
        let query = normalize("Bürokaufman");
        let first = rank(&query, &index, &config, 10);
        let second = rank(&query, &index, &config, 10);
        assert_eq!(first, second);
        assert!(
            first
                .windows(2)
                .all(|pair| pair[0].raw_distance <= pair[1].raw_distance)
        );

        let first_json = serde_json::to_vec(&first).expect("json");
        let second_json = serde_json::to_vec(&second).expect("json");
        assert_eq!(first_json, second_json);
    }
}

#[test]
fn rank_truncates_to_top_k() {
    let index = build_index();
    let query = normalize("Pfleger");
    let ranked = rank(&query, &index, &DistanceMetricConfig::default(), 2);
    assert!(ranked.len() <= 2);
}

#[test]
fn scores_outside_calibration_domain_abstain() {
    let index = build_index();
    // Exact-match training only: the calibration table covers just the top bucket.
    let model = train(
        &index,
        &exact_training_set(),
        &TrainingConfig {
            num_allowed_codes: 6,
            n_draws: 50,
            ..TrainingConfig::default()
        },
    )
    .expect("model");

    // One character off: score 0.5, far below the calibrated domain.
    let result = predict("Bürokaufrau", Some(&model), &index).expect("result");
    assert_eq!(result.decision, Decision::Abstained);
    assert_eq!(result.predicted_code, None);
    assert_eq!(result.confidence, 0.0);
    assert!(!result.candidates.is_empty());
}

#[test]
fn model_index_pairing_is_enforced() {
    let index = build_index();
    let model = train(
        &index,
        &exact_training_set(),
        &TrainingConfig {
            num_allowed_codes: 6,
            n_draws: 20,
            ..TrainingConfig::default()
        },
    )
    .expect("model");

    let other = CodingIndex::build(vec![TaxonomyRow::new("Gärtner", "11102")]).expect("index");
    assert!(matches!(
        predict("Bürokauffrau", Some(&model), &other),
        Err(CodingError::IndexMismatch { .. })
    ));
}
