use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use super::table::OrderedTable;

/// Scoring spec shipped with the binary, used when no spec file is found.
pub const BUILTIN_SPEC: &str = include_str!("../../scoring_spec.yaml");

/// Top-level YAML document. Everything lives under a single `scoring_spec` key.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SpecDocument {
    pub scoring_spec: ScoringSpec,
}

/// Declarative scoring specification.
///
/// Example YAML:
/// ```yaml
/// scoring_spec:
///   normalization_ranges:
///     protein_pct: { "<65": 0.2, "65-72": 0.5, ">72": 1.0 }
///   penalties:
///     sodium_mg: { "<=150": 0.0, ">150": 1.0 }
///   modes:
///     cut:
///       weights: { protein_pct: 1.0 }
///       penalty_weights: { sodium_mg: 0.1 }
///       hard_reject: { protein_per_100_kcal: "<18", amino_spiking_suspected: true }
///   amino_spiking_detection:
///     trigger: { min_rules_required: 2 }
///   label_credibility:
///     effects: { cut: { penalty: 0.1 } }
///   safety_flags:
///     enforcement: { cut: { hard_reject_if_unknown: true } }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoringSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Metric name -> ordered range table of normalized scores in [0, 1]
    #[serde(default)]
    pub normalization_ranges: BTreeMap<String, OrderedTable<f64>>,

    /// Metric name -> ordered range table of penalty magnitudes in [0, 1].
    /// Metrics without an entry here fall back to `1 - normalized score`.
    #[serde(default)]
    pub penalties: BTreeMap<String, OrderedTable<f64>>,

    /// Mode name -> mode rules, in display order
    pub modes: OrderedTable<ModeSpec>,

    pub amino_spiking_detection: AminoSpikingSpec,

    #[serde(default)]
    pub label_credibility: LabelCredibilitySpec,

    #[serde(default)]
    pub safety_flags: SafetyFlagsSpec,
}

/// Rules for a single evaluation mode.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Metric -> weight applied to its normalized score
    #[serde(default)]
    pub weights: OrderedTable<f64>,

    /// Metric -> weight applied to its penalty magnitude
    #[serde(default)]
    pub penalty_weights: OrderedTable<f64>,

    /// Metric or flag name -> rejection rule, checked in order
    #[serde(default)]
    pub hard_reject: OrderedTable<HardRejectRule>,
}

/// A `hard_reject` entry: a range token tested against a metric, or a
/// boolean switch for one of the flag rules.
#[derive(Debug, Clone, PartialEq)]
pub enum HardRejectRule {
    Flag(bool),
    Range(String),
}

impl Serialize for HardRejectRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HardRejectRule::Flag(b) => serializer.serialize_bool(*b),
            HardRejectRule::Range(token) => serializer.serialize_str(token),
        }
    }
}

struct HardRejectRuleVisitor;

impl<'de> Visitor<'de> for HardRejectRuleVisitor {
    type Value = HardRejectRule;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a range token such as \"<18\" or a boolean")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(HardRejectRule::Flag(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(HardRejectRule::Range(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(HardRejectRule::Range(v))
    }

    // A bare number means exact equality
    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(HardRejectRule::Range(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(HardRejectRule::Range(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(HardRejectRule::Range(v.to_string()))
    }
}

impl<'de> Deserialize<'de> for HardRejectRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(HardRejectRuleVisitor)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AminoSpikingSpec {
    pub trigger: SpikingTrigger,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SpikingTrigger {
    /// How many spiking rules must fire before spiking is suspected
    pub min_rules_required: usize,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct LabelCredibilitySpec {
    /// Mode name -> what a missing-macros or zero-sodium label does to that mode
    #[serde(default)]
    pub effects: BTreeMap<String, CredibilityEffect>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CredibilityEffect {
    #[serde(default)]
    pub hard_reject: bool,

    /// Flat penalty fraction added when a credibility flag is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub penalty: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SafetyFlagsSpec {
    /// Mode name -> safety enforcement for that mode
    #[serde(default)]
    pub enforcement: BTreeMap<String, SafetyEnforcement>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SafetyEnforcement {
    /// Reject when heavy-metal testing is not confirmed
    #[serde(default)]
    pub hard_reject_if_unknown: bool,
}
