use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;

use super::config::ScoringSpec;
use super::engine::{score_mode, CompiledSpec, ModeScore};
use super::metrics::{compute_metrics, ComputedMetrics};
use super::spiking::{detect_amino_spiking, AminoSpikingResult};
use super::validation::validate_spec;
use crate::error::SpecError;
use crate::facts::FactRecord;

/// Everything computed for one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductScores {
    pub brand: String,
    pub metrics: ComputedMetrics,
    pub amino_spiking: AminoSpikingResult,
    /// One entry per configured mode, in spec order
    pub modes: Vec<ModeScore>,
}

impl ProductScores {
    pub fn mode(&self, name: &str) -> Option<&ModeScore> {
        self.modes.iter().find(|m| m.mode == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based rank; rejected products are unranked
    pub rank: Option<usize>,
    pub brand: String,
    pub score: f64,
    pub hard_rejected: bool,
    pub rejection_reason: Option<String>,
}

/// Scores fact records against a validated, compiled scoring spec.
///
/// Holds no mutable state, so one `Scorer` can be shared across threads.
#[derive(Debug, Clone)]
pub struct Scorer {
    spec: CompiledSpec,
}

impl Scorer {
    /// Validate and compile a scoring spec. Every problem found is reported
    /// at once through [`SpecError::Invalid`].
    pub fn new(spec: &ScoringSpec) -> Result<Self, SpecError> {
        validate_spec(spec).map_err(SpecError::Invalid)?;
        Ok(Self {
            spec: CompiledSpec::compile(spec)?,
        })
    }

    pub fn mode_names(&self) -> impl Iterator<Item = &str> {
        self.spec.modes().iter().map(|m| m.name())
    }

    pub fn compiled(&self) -> &CompiledSpec {
        &self.spec
    }

    pub fn detect_amino_spiking(
        &self,
        metrics: &ComputedMetrics,
        record: &FactRecord,
    ) -> AminoSpikingResult {
        detect_amino_spiking(metrics, record, self.spec.min_rules_required())
    }

    /// Score a single mode from already-computed metrics.
    pub fn score_mode(
        &self,
        mode: &str,
        metrics: &ComputedMetrics,
        spiking: &AminoSpikingResult,
    ) -> Result<ModeScore, SpecError> {
        let mode = self.spec.mode(mode)?;
        Ok(score_mode(&self.spec, mode, metrics, spiking))
    }

    /// Metrics, spiking verdict and every mode's score for one record.
    pub fn score(&self, record: &FactRecord) -> ProductScores {
        let metrics = compute_metrics(record);
        let amino_spiking = self.detect_amino_spiking(&metrics, record);
        let modes = self
            .spec
            .modes()
            .iter()
            .map(|mode| score_mode(&self.spec, mode, &metrics, &amino_spiking))
            .collect();

        ProductScores {
            brand: record.brand_name().to_string(),
            metrics,
            amino_spiking,
            modes,
        }
    }

    /// Score many records in parallel. Output order matches input order.
    pub fn score_batch(&self, records: &[FactRecord]) -> Vec<ProductScores> {
        tracing::debug!(count = records.len(), "scoring batch");
        records.par_iter().map(|record| self.score(record)).collect()
    }

    /// Rank products for one mode: non-rejected first by score descending,
    /// then rejected ones. Ties keep input order.
    pub fn leaderboard(
        &self,
        results: &[ProductScores],
        mode: &str,
    ) -> Result<Vec<LeaderboardEntry>, SpecError> {
        self.spec.mode(mode)?;

        let mut entries: Vec<LeaderboardEntry> = results
            .iter()
            .filter_map(|product| {
                product.mode(mode).map(|score| LeaderboardEntry {
                    rank: None,
                    brand: product.brand.clone(),
                    score: score.total_score,
                    hard_rejected: score.hard_rejected,
                    rejection_reason: score.rejection_reason.clone(),
                })
            })
            .collect();

        // sort_by is stable, so equal entries keep encounter order
        entries.sort_by(|a, b| {
            a.hard_rejected.cmp(&b.hard_rejected).then_with(|| {
                b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
            })
        });

        for (i, entry) in entries.iter_mut().enumerate() {
            if !entry.hard_rejected {
                entry.rank = Some(i + 1);
            }
        }

        Ok(entries)
    }
}
