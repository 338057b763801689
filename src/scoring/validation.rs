use std::collections::HashSet;

use super::config::{HardRejectRule, ScoringSpec};
use super::engine::RejectFlag;
use super::metrics::Metric;
use super::range::RangeOp;
use super::spiking::SpikingRule;
use super::table::OrderedTable;

/// Validate a scoring spec at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_spec(spec: &ScoringSpec) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    for (metric, table) in &spec.normalization_ranges {
        let path = format!("normalization_ranges.{}", metric);
        check_metric_name(&mut errors, &path, metric);
        check_range_table(&mut errors, &path, table);
    }

    for (metric, table) in &spec.penalties {
        let path = format!("penalties.{}", metric);
        check_metric_name(&mut errors, &path, metric);
        check_range_table(&mut errors, &path, table);
    }

    if spec.modes.is_empty() {
        errors.push("modes: at least one mode is required".to_string());
    }
    check_duplicate_keys(&mut errors, "modes", &spec.modes);

    for (mode, mode_spec) in spec.modes.iter() {
        check_duplicate_keys(&mut errors, &format!("modes.{}.weights", mode), &mode_spec.weights);
        check_duplicate_keys(
            &mut errors,
            &format!("modes.{}.penalty_weights", mode),
            &mode_spec.penalty_weights,
        );

        for (metric, weight) in mode_spec.weights.iter() {
            let path = format!("modes.{}.weights.{}", mode, metric);
            check_metric_name(&mut errors, &path, metric);
            check_weight(&mut errors, &path, *weight);
            if !spec.normalization_ranges.contains_key(metric) {
                errors.push(format!("{}: no normalization_ranges table for this metric", path));
            }
        }

        for (metric, weight) in mode_spec.penalty_weights.iter() {
            let path = format!("modes.{}.penalty_weights.{}", mode, metric);
            check_metric_name(&mut errors, &path, metric);
            check_weight(&mut errors, &path, *weight);
            if !spec.penalties.contains_key(metric)
                && !spec.normalization_ranges.contains_key(metric)
            {
                errors.push(format!(
                    "{}: no penalties or normalization_ranges table for this metric",
                    path
                ));
            }
        }

        for (name, rule) in mode_spec.hard_reject.iter() {
            let path = format!("modes.{}.hard_reject.{}", mode, name);
            match (name.parse::<RejectFlag>(), rule) {
                (Ok(_), HardRejectRule::Flag(_)) => {}
                (Ok(_), HardRejectRule::Range(token)) => {
                    errors.push(format!("{}: expects true or false, got '{}'", path, token));
                }
                (Err(_), HardRejectRule::Flag(_)) => {
                    check_metric_name(&mut errors, &path, name);
                    errors.push(format!("{}: expects a range token, got a boolean", path));
                }
                (Err(_), HardRejectRule::Range(token)) => {
                    check_metric_name(&mut errors, &path, name);
                    check_token(&mut errors, &path, token);
                }
            }
        }
    }

    let min_rules = spec.amino_spiking_detection.trigger.min_rules_required;
    if min_rules == 0 || min_rules > SpikingRule::ALL.len() {
        errors.push(format!(
            "amino_spiking_detection.trigger.min_rules_required: must be between 1 and {}, got {}",
            SpikingRule::ALL.len(),
            min_rules
        ));
    }

    for (mode, effect) in &spec.label_credibility.effects {
        let path = format!("label_credibility.effects.{}", mode);
        if !spec.modes.contains_key(mode) {
            errors.push(format!("{}: unknown mode '{}'", path, mode));
        }
        if let Some(penalty) = effect.penalty {
            if !(0.0..=1.0).contains(&penalty) {
                errors.push(format!("{}.penalty: must be within 0-1, got {}", path, penalty));
            }
        }
    }

    for mode in spec.safety_flags.enforcement.keys() {
        if !spec.modes.contains_key(mode) {
            errors.push(format!("safety_flags.enforcement.{}: unknown mode '{}'", mode, mode));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_metric_name(errors: &mut Vec<String>, path: &str, name: &str) {
    if let Err(e) = name.parse::<Metric>() {
        errors.push(format!("{}: {}", path, e));
    }
}

fn check_token(errors: &mut Vec<String>, path: &str, token: &str) {
    match RangeOp::parse(token) {
        Ok(range) if range.is_empty() => {
            errors.push(format!("{}: range '{}' can never match (low > high)", path, token));
        }
        Ok(_) => {}
        Err(e) => errors.push(format!("{}: {}", path, e)),
    }
}

fn check_range_table(errors: &mut Vec<String>, path: &str, table: &OrderedTable<f64>) {
    for (token, value) in table.iter() {
        let entry = format!("{}['{}']", path, token);
        check_token(errors, &entry, token);
        if !(0.0..=1.0).contains(value) {
            errors.push(format!("{}: must be within 0-1, got {}", entry, value));
        }
    }
}

fn check_weight(errors: &mut Vec<String>, path: &str, weight: f64) {
    if !weight.is_finite() || weight < 0.0 {
        errors.push(format!("{}: weight must be non-negative, got {}", path, weight));
    }
}

fn check_duplicate_keys<V>(errors: &mut Vec<String>, path: &str, table: &OrderedTable<V>) {
    let mut seen = HashSet::new();
    for key in table.keys() {
        if !seen.insert(key) {
            errors.push(format!("{}.{}: defined more than once", path, key));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::config::{BUILTIN_SPEC, SpecDocument};

    fn parse(yaml: &str) -> ScoringSpec {
        serde_saphyr::from_str::<SpecDocument>(yaml).unwrap().scoring_spec
    }

    fn minimal() -> &'static str {
        r#"
scoring_spec:
  normalization_ranges:
    protein_pct: { "<65": 0.2, ">=65": 1.0 }
  modes:
    bulk:
      weights: { protein_pct: 1.0 }
  amino_spiking_detection:
    trigger: { min_rules_required: 2 }
"#
    }

    #[test]
    fn test_builtin_spec_is_valid() {
        let spec = parse(BUILTIN_SPEC);
        assert_eq!(validate_spec(&spec), Ok(()));
    }

    #[test]
    fn test_minimal_spec_is_valid() {
        assert!(validate_spec(&parse(minimal())).is_ok());
    }

    #[test]
    fn test_invalid_range_token() {
        let spec = parse(&minimal().replace("\"<65\"", "\"<6x5\""));
        let errors = validate_spec(&spec).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("normalization_ranges.protein_pct['<6x5']"));
    }

    #[test]
    fn test_inverted_range_token() {
        let spec = parse(&minimal().replace("\">=65\"", "\"80-65\""));
        let errors = validate_spec(&spec).unwrap_err();
        assert!(errors[0].contains("can never match"));
    }

    #[test]
    fn test_normalized_score_out_of_bounds() {
        let spec = parse(&minimal().replace("\">=65\": 1.0", "\">=65\": 1.5"));
        let errors = validate_spec(&spec).unwrap_err();
        assert!(errors[0].contains("must be within 0-1"));
    }

    #[test]
    fn test_unknown_weighted_metric() {
        let spec = parse(&minimal().replace("weights: { protein_pct: 1.0 }", "weights: { protein_percent: 1.0 }"));
        let errors = validate_spec(&spec).unwrap_err();
        assert!(errors[0].contains("modes.bulk.weights.protein_percent"));
        assert!(errors[0].contains("Unknown metric"));
    }

    #[test]
    fn test_weighted_metric_without_normalization_table() {
        let spec = parse(&minimal().replace("weights: { protein_pct: 1.0 }", "weights: { sodium_mg: 1.0 }"));
        let errors = validate_spec(&spec).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("no normalization_ranges table"));
    }

    #[test]
    fn test_penalty_weight_accepts_complement_fallback() {
        let spec = parse(&minimal().replace(
            "weights: { protein_pct: 1.0 }",
            "weights: { protein_pct: 1.0 }\n      penalty_weights: { protein_pct: 0.1 }",
        ));
        assert!(validate_spec(&spec).is_ok());

        let spec = parse(&minimal().replace(
            "weights: { protein_pct: 1.0 }",
            "weights: { protein_pct: 1.0 }\n      penalty_weights: { sodium_mg: 0.1 }",
        ));
        let errors = validate_spec(&spec).unwrap_err();
        assert!(errors[0].contains("modes.bulk.penalty_weights.sodium_mg"));
    }

    #[test]
    fn test_hard_reject_rule_shapes() {
        let spec = parse(&minimal().replace(
            "weights: { protein_pct: 1.0 }",
            r#"weights: { protein_pct: 1.0 }
      hard_reject:
        amino_spiking_suspected: "<2"
        sodium_mg: true
        leucine_g_per_serving: "<2.2"
        added_sugar_present: true"#,
        ));
        let errors = validate_spec(&spec).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("amino_spiking_suspected: expects true or false"));
        assert!(errors[1].contains("sodium_mg: expects a range token"));
    }

    #[test]
    fn test_negative_weight() {
        let spec = parse(&minimal().replace("protein_pct: 1.0 }", "protein_pct: -1.0 }"));
        let errors = validate_spec(&spec).unwrap_err();
        assert!(errors[0].contains("weight must be non-negative"));
    }

    #[test]
    fn test_min_rules_required_bounds() {
        let spec = parse(&minimal().replace("min_rules_required: 2", "min_rules_required: 0"));
        assert!(validate_spec(&spec).unwrap_err()[0].contains("min_rules_required"));

        let spec = parse(&minimal().replace("min_rules_required: 2", "min_rules_required: 6"));
        assert!(validate_spec(&spec).unwrap_err()[0].contains("min_rules_required"));
    }

    #[test]
    fn test_side_tables_must_name_known_modes() {
        let yaml = format!(
            "{}  label_credibility:\n    effects:\n      cut: {{ penalty: 0.1 }}\n  safety_flags:\n    enforcement:\n      clean: {{ hard_reject_if_unknown: true }}\n",
            minimal()
        );
        let errors = validate_spec(&parse(&yaml)).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("label_credibility.effects.cut"));
        assert!(errors[1].contains("safety_flags.enforcement.clean"));
    }

    #[test]
    fn test_credibility_penalty_bounds() {
        let yaml = format!(
            "{}  label_credibility:\n    effects:\n      bulk: {{ penalty: 1.5 }}\n",
            minimal()
        );
        let errors = validate_spec(&parse(&yaml)).unwrap_err();
        assert!(errors[0].contains("label_credibility.effects.bulk.penalty"));
    }

    #[test]
    fn test_no_modes() {
        let yaml = r#"
scoring_spec:
  modes: {}
  amino_spiking_detection:
    trigger: { min_rules_required: 2 }
"#;
        let errors = validate_spec(&parse(yaml)).unwrap_err();
        assert!(errors[0].contains("at least one mode"));
    }

    #[test]
    fn test_collects_all_errors() {
        let yaml = r#"
scoring_spec:
  normalization_ranges:
    protein_pct: { "bad": 0.5 }
  modes:
    bulk:
      weights: { nonsense: 1.0 }
  amino_spiking_detection:
    trigger: { min_rules_required: 0 }
"#;
        let errors = validate_spec(&parse(yaml)).unwrap_err();
        // bad token, unknown metric, missing normalization table, min_rules_required
        assert_eq!(errors.len(), 4);
    }
}
