use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use super::config::{CredibilityEffect, HardRejectRule, SafetyEnforcement, ScoringSpec};
use super::metrics::{ComputedMetrics, Metric};
use super::range::RangeOp;
use super::spiking::AminoSpikingResult;
use super::table::OrderedTable;
use crate::error::SpecError;

pub const LABEL_CREDIBILITY_REASON: &str = "label_credibility_issues";
pub const SAFETY_REASON: &str = "safety_flags_unmet";

/// Boolean `hard_reject` entries that are not plain metric thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectFlag {
    /// Reject when the spiking detector's verdict is positive
    AminoSpikingSuspected,
    /// Reject when added sugar is known to be above zero
    AddedSugarPresent,
}

impl RejectFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectFlag::AminoSpikingSuspected => "amino_spiking_suspected",
            RejectFlag::AddedSugarPresent => "added_sugar_present",
        }
    }

    fn is_set(&self, metrics: &ComputedMetrics, spiking: &AminoSpikingResult) -> bool {
        match self {
            RejectFlag::AminoSpikingSuspected => spiking.suspected,
            RejectFlag::AddedSugarPresent => metrics.added_sugar_g.is_some_and(|g| g > 0.0),
        }
    }
}

impl FromStr for RejectFlag {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "amino_spiking_suspected" => Ok(RejectFlag::AminoSpikingSuspected),
            "added_sugar_present" => Ok(RejectFlag::AddedSugarPresent),
            _ => Err(SpecError::UnknownMetric {
                name: s.to_string(),
            }),
        }
    }
}

/// A range table with every token parsed. First match wins.
#[derive(Debug, Clone)]
struct RangeTable(Vec<(RangeOp, f64)>);

impl RangeTable {
    fn compile<'a>(entries: impl Iterator<Item = (&'a str, &'a f64)>) -> Result<Self, SpecError> {
        entries
            .map(|(token, value)| Ok((RangeOp::parse(token)?, *value)))
            .collect::<Result<Vec<_>, SpecError>>()
            .map(RangeTable)
    }

    fn lookup(&self, value: f64) -> Option<f64> {
        self.0
            .iter()
            .find(|(range, _)| range.matches(value))
            .map(|(_, score)| *score)
    }
}

#[derive(Debug, Clone)]
enum RejectCheck {
    Flag(RejectFlag),
    Threshold {
        metric: Metric,
        range: RangeOp,
        token: String,
    },
}

/// One mode's rules with names resolved and tokens parsed.
#[derive(Debug, Clone)]
pub struct CompiledMode {
    name: String,
    weights: Vec<(Metric, f64)>,
    penalty_weights: Vec<(Metric, f64)>,
    hard_reject: Vec<RejectCheck>,
    credibility: CredibilityEffect,
    safety: SafetyEnforcement,
}

impl CompiledMode {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A scoring spec ready for scoring: nothing left to parse or look up by string.
#[derive(Debug, Clone)]
pub struct CompiledSpec {
    normalization: HashMap<Metric, RangeTable>,
    penalties: HashMap<Metric, RangeTable>,
    modes: Vec<CompiledMode>,
    min_rules_required: usize,
}

fn compile_tables(
    tables: &BTreeMap<String, OrderedTable<f64>>,
) -> Result<HashMap<Metric, RangeTable>, SpecError> {
    tables
        .iter()
        .map(|(name, table)| Ok((name.parse::<Metric>()?, RangeTable::compile(table.iter())?)))
        .collect()
}

fn compile_weights(weights: &OrderedTable<f64>) -> Result<Vec<(Metric, f64)>, SpecError> {
    weights
        .iter()
        .map(|(name, weight)| Ok((name.parse::<Metric>()?, *weight)))
        .collect()
}

impl CompiledSpec {
    pub fn compile(spec: &ScoringSpec) -> Result<Self, SpecError> {
        let mut modes = Vec::with_capacity(spec.modes.len());

        for (name, mode) in spec.modes.iter() {
            let mut hard_reject = Vec::with_capacity(mode.hard_reject.len());
            for (key, rule) in mode.hard_reject.iter() {
                match (key.parse::<RejectFlag>(), rule) {
                    (Ok(flag), HardRejectRule::Flag(true)) => hard_reject.push(RejectCheck::Flag(flag)),
                    (Ok(_), HardRejectRule::Flag(false)) => {}
                    (Err(_), HardRejectRule::Range(token)) => hard_reject.push(RejectCheck::Threshold {
                        metric: key.parse()?,
                        range: RangeOp::parse(token)?,
                        token: token.clone(),
                    }),
                    _ => {
                        return Err(SpecError::Invalid(vec![format!(
                            "modes.{}.hard_reject.{}: rule does not fit this entry",
                            name, key
                        )]))
                    }
                }
            }

            modes.push(CompiledMode {
                name: name.to_string(),
                weights: compile_weights(&mode.weights)?,
                penalty_weights: compile_weights(&mode.penalty_weights)?,
                hard_reject,
                credibility: spec
                    .label_credibility
                    .effects
                    .get(name)
                    .cloned()
                    .unwrap_or_default(),
                safety: spec
                    .safety_flags
                    .enforcement
                    .get(name)
                    .cloned()
                    .unwrap_or_default(),
            });
        }

        Ok(Self {
            normalization: compile_tables(&spec.normalization_ranges)?,
            penalties: compile_tables(&spec.penalties)?,
            modes,
            min_rules_required: spec.amino_spiking_detection.trigger.min_rules_required,
        })
    }

    pub fn modes(&self) -> &[CompiledMode] {
        &self.modes
    }

    pub fn mode(&self, name: &str) -> Result<&CompiledMode, SpecError> {
        self.modes
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| SpecError::UnknownMode(name.to_string()))
    }

    pub fn min_rules_required(&self) -> usize {
        self.min_rules_required
    }

    /// Normalized score in [0, 1]. Unknown values and values outside
    /// every range score 0.0.
    pub fn normalize(&self, metric: Metric, value: Option<f64>) -> f64 {
        match (value, self.normalization.get(&metric)) {
            (Some(v), Some(table)) => table.lookup(v).unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Penalty magnitude in [0, 1].
    ///
    /// Uses the metric's penalty table when there is one; otherwise falls
    /// back to `1 - normalized score` when the metric has a normalization
    /// table, so a perfect score means no penalty.
    pub fn penalty(&self, metric: Metric, value: Option<f64>) -> f64 {
        let Some(v) = value else {
            return 0.0;
        };
        if let Some(table) = self.penalties.get(&metric) {
            return table.lookup(v).unwrap_or(0.0);
        }
        if self.normalization.contains_key(&metric) {
            return 1.0 - self.normalize(metric, Some(v));
        }
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentScore {
    pub metric: Metric,
    pub raw_value: Option<f64>,
    pub normalized: f64,
    pub weight: f64,
    pub contribution: f64,
}

/// What a penalty line was charged for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltySource {
    Metric(Metric),
    LabelCredibility,
}

impl fmt::Display for PenaltySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PenaltySource::Metric(m) => f.write_str(m.as_str()),
            PenaltySource::LabelCredibility => f.write_str("label_credibility"),
        }
    }
}

impl Serialize for PenaltySource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PenaltyScore {
    pub source: PenaltySource,
    pub raw_value: Option<f64>,
    pub penalty: f64,
    pub weight: f64,
    pub deduction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeScore {
    pub mode: String,
    /// Final score, or exactly 0.0 when rejected
    pub total_score: f64,
    pub hard_rejected: bool,
    pub rejection_reason: Option<String>,
    /// Weighted sum of normalized components, before penalties
    pub base_score: f64,
    pub components: Vec<ComponentScore>,
    pub penalties: Vec<PenaltyScore>,
    /// Total penalty fraction, rounded to 4 places
    pub penalty_deduction: f64,
}

impl ModeScore {
    fn rejected(mode: &str, reason: String) -> Self {
        Self {
            mode: mode.to_string(),
            total_score: 0.0,
            hard_rejected: true,
            rejection_reason: Some(reason),
            base_score: 0.0,
            components: Vec::new(),
            penalties: Vec::new(),
            penalty_deduction: 0.0,
        }
    }
}

pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// First hard-reject rule that fires, in cascade order: the mode's own
/// rules, then label credibility, then safety.
fn rejection_reason(
    mode: &CompiledMode,
    metrics: &ComputedMetrics,
    spiking: &AminoSpikingResult,
) -> Option<String> {
    for check in &mode.hard_reject {
        match check {
            RejectCheck::Flag(flag) => {
                if flag.is_set(metrics, spiking) {
                    return Some(flag.as_str().to_string());
                }
            }
            RejectCheck::Threshold {
                metric,
                range,
                token,
            } => {
                if metric.value(metrics).is_some_and(|v| range.matches(v)) {
                    return Some(format!("{} {}", metric, token));
                }
            }
        }
    }

    if mode.credibility.hard_reject && metrics.has_credibility_issue() {
        return Some(LABEL_CREDIBILITY_REASON.to_string());
    }

    if mode.safety.hard_reject_if_unknown && metrics.heavy_metals_tested != Some(true) {
        return Some(SAFETY_REASON.to_string());
    }

    None
}

/// Score one mode: rejection cascade, weighted sum, then penalties.
pub fn score_mode(
    spec: &CompiledSpec,
    mode: &CompiledMode,
    metrics: &ComputedMetrics,
    spiking: &AminoSpikingResult,
) -> ModeScore {
    if let Some(reason) = rejection_reason(mode, metrics, spiking) {
        tracing::debug!(mode = %mode.name, reason = %reason, "hard rejected");
        return ModeScore::rejected(&mode.name, reason);
    }

    let mut base_score = 0.0;
    let mut components = Vec::with_capacity(mode.weights.len());
    for &(metric, weight) in &mode.weights {
        let raw_value = metric.value(metrics);
        let normalized = spec.normalize(metric, raw_value);
        let contribution = normalized * weight;
        base_score += contribution;
        components.push(ComponentScore {
            metric,
            raw_value,
            normalized,
            weight,
            contribution,
        });
    }

    let mut total_penalty = 0.0;
    let mut penalties = Vec::with_capacity(mode.penalty_weights.len() + 1);
    for &(metric, weight) in &mode.penalty_weights {
        let raw_value = metric.value(metrics);
        let penalty = spec.penalty(metric, raw_value);
        let deduction = penalty * weight;
        total_penalty += deduction;
        penalties.push(PenaltyScore {
            source: PenaltySource::Metric(metric),
            raw_value,
            penalty,
            weight,
            deduction,
        });
    }

    if let Some(flat) = mode.credibility.penalty.filter(|p| *p > 0.0) {
        if metrics.has_credibility_issue() {
            total_penalty += flat;
            penalties.push(PenaltyScore {
                source: PenaltySource::LabelCredibility,
                raw_value: Some(1.0),
                penalty: flat,
                weight: 1.0,
                deduction: flat,
            });
        }
    }

    // Penalties shrink the score toward zero but never flip its sign
    let final_score = base_score * (1.0 - total_penalty).max(0.0);

    ModeScore {
        mode: mode.name.clone(),
        total_score: round4(final_score),
        hard_rejected: false,
        rejection_reason: None,
        base_score,
        components,
        penalties,
        penalty_deduction: round4(total_penalty),
    }
}
