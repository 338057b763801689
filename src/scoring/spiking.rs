use serde::Serialize;
use std::fmt;

use super::metrics::{glycine_g_per_serving, ComputedMetrics};
use crate::facts::FactRecord;

const GLYCINE_RATIO_MAX: f64 = 0.05;
const EAAS_PCT_MIN: f64 = 0.40;
const BCAAS_PCT_OF_EAAS_MAX: f64 = 0.60;

/// Label patterns that suggest cheap amino acids were added to inflate
/// the protein figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpikingRule {
    /// Glycine above 5% of protein mass
    GlycineDisproportion,
    /// Essential aminos below 40% of protein
    LowEaas,
    /// BCAAs above 60% of essential aminos
    BcaasDominant,
    /// More essential amino mass than protein mass
    EaasExceedProtein,
    /// Any taurine listed in the amino profile
    TaurinePresent,
}

impl SpikingRule {
    pub const ALL: [SpikingRule; 5] = [
        SpikingRule::GlycineDisproportion,
        SpikingRule::LowEaas,
        SpikingRule::BcaasDominant,
        SpikingRule::EaasExceedProtein,
        SpikingRule::TaurinePresent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpikingRule::GlycineDisproportion => "glycine_disproportion",
            SpikingRule::LowEaas => "low_eaas",
            SpikingRule::BcaasDominant => "bcaas_dominant",
            SpikingRule::EaasExceedProtein => "eaas_exceed_protein",
            SpikingRule::TaurinePresent => "taurine_present",
        }
    }
}

impl fmt::Display for SpikingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AminoSpikingResult {
    pub suspected: bool,
    pub triggered_rules: Vec<SpikingRule>,
    /// Glycine / protein mass, when both are known
    pub glycine_ratio: Option<f64>,
}

fn above(value: Option<f64>, limit: f64) -> bool {
    value.is_some_and(|v| v > limit)
}

/// Evaluate every spiking rule; spiking is suspected once at least
/// `min_rules_required` of them fire. Each rule counts once.
pub fn detect_amino_spiking(
    metrics: &ComputedMetrics,
    record: &FactRecord,
    min_rules_required: usize,
) -> AminoSpikingResult {
    let mut result = AminoSpikingResult::default();

    let glycine_g = glycine_g_per_serving(record).filter(|g| *g > 0.0);
    let protein_g = metrics.protein_g_per_serving.filter(|p| *p > 0.0);
    if let (Some(glycine), Some(protein)) = (glycine_g, protein_g) {
        result.glycine_ratio = Some(glycine / protein);
    }

    for rule in SpikingRule::ALL {
        let triggered = match rule {
            SpikingRule::GlycineDisproportion => above(result.glycine_ratio, GLYCINE_RATIO_MAX),
            // An unknown or zero fraction says nothing about spiking
            SpikingRule::LowEaas => metrics
                .eaas_pct
                .is_some_and(|v| v > 0.0 && v < EAAS_PCT_MIN),
            SpikingRule::BcaasDominant => above(metrics.bcaas_pct_of_eaas, BCAAS_PCT_OF_EAAS_MAX),
            SpikingRule::EaasExceedProtein => above(metrics.eaas_pct_raw, 1.0),
            SpikingRule::TaurinePresent => above(metrics.taurine_g, 0.0),
        };
        if triggered {
            result.triggered_rules.push(rule);
        }
    }

    result.suspected = result.triggered_rules.len() >= min_rules_required;
    if result.suspected {
        tracing::debug!(
            brand = record.brand_name(),
            rules = ?result.triggered_rules,
            "amino spiking suspected"
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::metrics::compute_metrics;
    use serde_json::json;

    fn metrics_with(eaas_pct: Option<f64>, bcaas_pct: Option<f64>) -> ComputedMetrics {
        ComputedMetrics {
            eaas_pct,
            eaas_pct_raw: eaas_pct,
            bcaas_pct_of_eaas: bcaas_pct,
            ..Default::default()
        }
    }

    #[test]
    fn test_low_eaas_and_bcaas_dominant_is_suspected() {
        let metrics = metrics_with(Some(0.35), Some(0.65));
        let result = detect_amino_spiking(&metrics, &FactRecord::default(), 2);
        assert_eq!(
            result.triggered_rules,
            vec![SpikingRule::LowEaas, SpikingRule::BcaasDominant]
        );
        assert!(result.suspected);
    }

    #[test]
    fn test_single_rule_below_threshold() {
        let metrics = metrics_with(Some(0.35), Some(0.5));
        let result = detect_amino_spiking(&metrics, &FactRecord::default(), 2);
        assert_eq!(result.triggered_rules, vec![SpikingRule::LowEaas]);
        assert!(!result.suspected);

        let lenient = detect_amino_spiking(&metrics, &FactRecord::default(), 1);
        assert!(lenient.suspected);
    }

    #[test]
    fn test_boundaries_are_strict() {
        let metrics = metrics_with(Some(0.40), Some(0.60));
        let result = detect_amino_spiking(&metrics, &FactRecord::default(), 1);
        assert!(result.triggered_rules.is_empty());
        assert!(!result.suspected);
    }

    #[test]
    fn test_unknown_metrics_trigger_nothing() {
        let result =
            detect_amino_spiking(&ComputedMetrics::default(), &FactRecord::default(), 1);
        assert!(result.triggered_rules.is_empty());
        assert_eq!(result.glycine_ratio, None);
    }

    #[test]
    fn test_glycine_and_taurine_rules_from_record() {
        let record: FactRecord = serde_json::from_value(json!({
            "nutrients": { "extracted_fields": {
                "serving_size_g": 50.0,
                "protein_g_per_serving": 20.0
            }},
            "aminoacids": { "extracted_fields": {
                "serving_basis": "per_100g",
                "eaas": { "total_g": 44.0 },
                "seaas": { "glycine_g": 4.0, "taurine_g": 0.2 }
            }}
        }))
        .unwrap();
        let metrics = compute_metrics(&record);
        let result = detect_amino_spiking(&metrics, &record, 2);

        // 4g per 100g of a 50g serving is 2g of glycine against 20g protein
        assert!((result.glycine_ratio.unwrap() - 0.1).abs() < 1e-9);
        assert_eq!(
            result.triggered_rules,
            vec![
                SpikingRule::GlycineDisproportion,
                SpikingRule::EaasExceedProtein,
                SpikingRule::TaurinePresent
            ]
        );
        assert!(result.suspected);
    }

    #[test]
    fn test_rule_names_serialize_snake_case() {
        for rule in SpikingRule::ALL {
            let json = serde_json::to_string(&rule).unwrap();
            assert_eq!(json, format!("\"{}\"", rule.as_str()));
        }
    }
}
