use serde_json::{json, Value};
use std::fs;
use std::path::Path;

use protein_rank::config::parse_spec;
use protein_rank::facts::{fact_file_path, load_fact_dir, FactRecord};
use protein_rank::scoring::{ProductScores, Scorer, SpikingRule, BUILTIN_SPEC};

fn scorer() -> Scorer {
    Scorer::new(&parse_spec(BUILTIN_SPEC).unwrap()).unwrap()
}

/// 24 g protein in a 29 g scoop, 110 kcal, clean amino profile.
fn lean(brand: &str) -> Value {
    json!({
        "brand": brand,
        "nutrients": { "extracted_fields": {
            "serving_size_g": 29.0,
            "energy_kcal_per_serving": 110.0,
            "protein_g_per_serving": 24.0,
            "carbohydrates_g_per_serving": 2.0,
            "total_fat_g_per_serving": 1.0,
            "sodium_mg_per_serving": 80.0,
            "added_sugar_g_per_serving": 0.0,
            "heavy_metals_tested": true
        }},
        "aminoacids": { "extracted_fields": {
            "serving_basis": "per_serving",
            "eaas": { "total_g": 12.5, "bcaas": { "total_g": 5.4, "leucine_g": 2.7 } },
            "seaas": { "glycine_g": 0.5 }
        }},
        "quality": { "confidence": 0.9 }
    })
}

fn fixtures() -> Vec<Value> {
    let mut untested = lean("b_untested");
    untested["nutrients"]["extracted_fields"]
        .as_object_mut()
        .unwrap()
        .remove("heavy_metals_tested");

    let mut zero_sodium = lean("c_zero_sodium");
    zero_sodium["nutrients"]["extracted_fields"]["sodium_mg_per_serving"] = json!(0.0);

    let mut spiked = lean("d_spiked");
    spiked["aminoacids"]["extracted_fields"]["eaas"] =
        json!({ "total_g": 8.4, "bcaas": { "total_g": 6.0, "leucine_g": 2.7 } });

    let mut low_ratio = lean("e_low_ratio");
    low_ratio["nutrients"]["extracted_fields"]["protein_g_per_serving"] = json!(15.0);
    low_ratio["nutrients"]["extracted_fields"]["energy_kcal_per_serving"] = json!(100.0);

    vec![lean("a_lean"), untested, zero_sodium, spiked, low_ratio]
}

fn write_fixtures(dir: &Path) {
    for fixture in fixtures() {
        let brand = fixture["brand"].as_str().unwrap().to_string();
        fs::create_dir_all(dir.join(&brand)).unwrap();
        fs::write(fact_file_path(dir, &brand), fixture.to_string()).unwrap();
    }
}

fn score_dir() -> Vec<ProductScores> {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());
    let records = load_fact_dir(dir.path()).unwrap();
    assert_eq!(records.len(), 5);
    scorer().score_batch(&records)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn total(results: &[ProductScores], brand: &str, mode: &str) -> f64 {
    results
        .iter()
        .find(|p| p.brand == brand)
        .and_then(|p| p.mode(mode))
        .map(|m| m.total_score)
        .unwrap()
}

#[test]
fn test_lean_product_scores_every_mode() {
    let results = score_dir();
    assert_eq!(results[0].brand, "a_lean");
    assert!(!results[0].amino_spiking.suspected);

    assert!(close(total(&results, "a_lean", "cut"), 0.82));
    assert!(close(total(&results, "a_lean", "bulk"), 0.92));
    assert!(close(total(&results, "a_lean", "clean"), 0.98));
}

#[test]
fn test_unknown_heavy_metals_rejects_clean_only() {
    let results = score_dir();
    let product = results.iter().find(|p| p.brand == "b_untested").unwrap();

    let clean = product.mode("clean").unwrap();
    assert!(clean.hard_rejected);
    assert_eq!(clean.total_score, 0.0);
    assert_eq!(clean.rejection_reason.as_deref(), Some("safety_flags_unmet"));

    assert!(close(product.mode("cut").unwrap().total_score, 0.82));
    assert!(!product.mode("bulk").unwrap().hard_rejected);
}

#[test]
fn test_zero_sodium_is_a_credibility_issue() {
    let results = score_dir();
    let product = results.iter().find(|p| p.brand == "c_zero_sodium").unwrap();
    assert!(product.metrics.sodium_reported_zero);

    // Flat penalties for cut and bulk, outright rejection for clean
    assert!(close(product.mode("cut").unwrap().total_score, 0.738));
    assert!(close(product.mode("bulk").unwrap().total_score, 0.874));
    assert_eq!(
        product.mode("clean").unwrap().rejection_reason.as_deref(),
        Some("label_credibility_issues")
    );

    let cut = product.mode("cut").unwrap();
    let last = cut.penalties.last().unwrap();
    assert_eq!(last.source.to_string(), "label_credibility");
    assert!(close(last.deduction, 0.10));
}

#[test]
fn test_spiked_profile_rejected_by_clean() {
    let results = score_dir();
    let product = results.iter().find(|p| p.brand == "d_spiked").unwrap();

    assert!(product.amino_spiking.suspected);
    assert_eq!(
        product.amino_spiking.triggered_rules,
        vec![SpikingRule::LowEaas, SpikingRule::BcaasDominant]
    );
    assert_eq!(
        product.mode("clean").unwrap().rejection_reason.as_deref(),
        Some("amino_spiking_suspected")
    );
    // eaas_pct of 0.35 normalizes to zero for cut
    assert!(close(product.mode("cut").unwrap().total_score, 0.72));
}

#[test]
fn test_low_protein_per_calorie_rejected_by_cut() {
    let results = score_dir();
    let product = results.iter().find(|p| p.brand == "e_low_ratio").unwrap();
    let cut = product.mode("cut").unwrap();
    assert!(cut.hard_rejected);
    assert_eq!(cut.rejection_reason.as_deref(), Some("protein_per_100_kcal <18"));
    assert!(!product.mode("bulk").unwrap().hard_rejected);
}

#[test]
fn test_cut_leaderboard() {
    let scorer = scorer();
    let results = score_dir();
    let board = scorer.leaderboard(&results, "cut").unwrap();

    let brands: Vec<_> = board.iter().map(|e| e.brand.as_str()).collect();
    assert_eq!(
        brands,
        vec!["a_lean", "b_untested", "c_zero_sodium", "d_spiked", "e_low_ratio"]
    );
    let ranks: Vec<_> = board.iter().map(|e| e.rank).collect();
    assert_eq!(ranks, vec![Some(1), Some(2), Some(3), Some(4), None]);
}

#[test]
fn test_breakdown_reproduces_total() {
    for product in score_dir() {
        for score in product.modes.iter().filter(|m| !m.hard_rejected) {
            let base: f64 = score.components.iter().map(|c| c.contribution).sum();
            let penalty: f64 = score.penalties.iter().map(|p| p.deduction).sum();
            let expected = base * (1.0 - penalty).max(0.0);

            assert!(close(score.base_score, base), "{} {}", product.brand, score.mode);
            assert!(
                (score.total_score - expected).abs() < 1e-4,
                "{} {}: {} vs {}",
                product.brand,
                score.mode,
                score.total_score,
                expected
            );
        }
    }
}

#[test]
fn test_per_100g_aminos_scale_to_serving() {
    let record: FactRecord = serde_json::from_value(json!({
        "brand": "bulk_tub",
        "nutrients": { "extracted_fields": {
            "serving_size_g": 50.0,
            "energy_kcal_per_serving": 190.0,
            "protein_g_per_serving": 36.0,
            "carbohydrates_g_per_serving": 6.0,
            "total_fat_g_per_serving": 2.0,
            "sodium_mg_per_serving": 120.0,
            "heavy_metals_tested": true
        }},
        "aminoacids": { "extracted_fields": {
            "serving_basis": "per_100g",
            "eaas": { "total_g": 36.0, "bcaas": { "total_g": 16.0, "leucine_g": 8.0 } }
        }}
    }))
    .unwrap();

    let result = scorer().score(&record);
    assert_eq!(result.metrics.leucine_g_per_serving, Some(4.0));
    assert!(close(result.metrics.eaas_pct.unwrap(), 0.5));

    let bulk = result.mode("bulk").unwrap();
    let leucine = bulk
        .components
        .iter()
        .find(|c| c.metric.as_str() == "leucine_g_per_serving")
        .unwrap();
    assert_eq!(leucine.normalized, 1.0);
}

#[test]
fn test_empty_record_is_scored_not_failed() {
    let result = scorer().score(&FactRecord::default());
    assert_eq!(result.brand, "unknown");
    assert_eq!(result.modes.len(), 3);

    // No facts means no thresholds fire; missing macros still reject clean
    let cut = result.mode("cut").unwrap();
    assert!(!cut.hard_rejected);
    assert_eq!(cut.total_score, 0.0);
    assert!(result.mode("clean").unwrap().hard_rejected);
}
