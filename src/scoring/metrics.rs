use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::SpecError;
use crate::facts::{AminoAcidFacts, FactRecord, NutrientFacts, ServingBasis};

/// Metrics derived from a fact record.
///
/// `None` means unknown. Unknown metrics contribute nothing downstream,
/// which is not the same as scoring them as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComputedMetrics {
    pub protein_pct: Option<f64>,
    pub protein_per_100_kcal: Option<f64>,
    /// Essential aminos / protein, uncapped. Above 1.0 means the label is wrong.
    pub eaas_pct_raw: Option<f64>,
    /// `eaas_pct_raw` capped at 1.0; this is the one that gets scored.
    pub eaas_pct: Option<f64>,
    pub bcaas_pct_of_eaas: Option<f64>,
    pub non_protein_macros_g: Option<f64>,
    pub leucine_g_per_serving: Option<f64>,
    pub protein_g_per_serving: Option<f64>,
    pub sodium_mg: Option<f64>,
    pub added_sugar_g: Option<f64>,
    pub taurine_g: Option<f64>,
    pub heavy_metals_tested: Option<bool>,
    pub missing_macros: bool,
    pub sodium_reported_zero: bool,
}

impl ComputedMetrics {
    /// Either label-credibility flag is set.
    pub fn has_credibility_issue(&self) -> bool {
        self.missing_macros || self.sodium_reported_zero
    }
}

/// Metric names the scoring spec may refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    ProteinPct,
    #[serde(rename = "protein_per_100_kcal")]
    ProteinPer100Kcal,
    EaasPctRaw,
    EaasPct,
    BcaasPctOfEaas,
    NonProteinMacrosG,
    LeucineGPerServing,
    ProteinGPerServing,
    SodiumMg,
    AddedSugarG,
    TaurineG,
    HeavyMetalsTested,
    MissingMacros,
    SodiumReportedZero,
}

impl Metric {
    pub const ALL: [Metric; 14] = [
        Metric::ProteinPct,
        Metric::ProteinPer100Kcal,
        Metric::EaasPctRaw,
        Metric::EaasPct,
        Metric::BcaasPctOfEaas,
        Metric::NonProteinMacrosG,
        Metric::LeucineGPerServing,
        Metric::ProteinGPerServing,
        Metric::SodiumMg,
        Metric::AddedSugarG,
        Metric::TaurineG,
        Metric::HeavyMetalsTested,
        Metric::MissingMacros,
        Metric::SodiumReportedZero,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::ProteinPct => "protein_pct",
            Metric::ProteinPer100Kcal => "protein_per_100_kcal",
            Metric::EaasPctRaw => "eaas_pct_raw",
            Metric::EaasPct => "eaas_pct",
            Metric::BcaasPctOfEaas => "bcaas_pct_of_eaas",
            Metric::NonProteinMacrosG => "non_protein_macros_g",
            Metric::LeucineGPerServing => "leucine_g_per_serving",
            Metric::ProteinGPerServing => "protein_g_per_serving",
            Metric::SodiumMg => "sodium_mg",
            Metric::AddedSugarG => "added_sugar_g",
            Metric::TaurineG => "taurine_g",
            Metric::HeavyMetalsTested => "heavy_metals_tested",
            Metric::MissingMacros => "missing_macros",
            Metric::SodiumReportedZero => "sodium_reported_zero",
        }
    }

    /// Current value of this metric. Boolean metrics read as 1.0 / 0.0.
    pub fn value(&self, m: &ComputedMetrics) -> Option<f64> {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        match self {
            Metric::ProteinPct => m.protein_pct,
            Metric::ProteinPer100Kcal => m.protein_per_100_kcal,
            Metric::EaasPctRaw => m.eaas_pct_raw,
            Metric::EaasPct => m.eaas_pct,
            Metric::BcaasPctOfEaas => m.bcaas_pct_of_eaas,
            Metric::NonProteinMacrosG => m.non_protein_macros_g,
            Metric::LeucineGPerServing => m.leucine_g_per_serving,
            Metric::ProteinGPerServing => m.protein_g_per_serving,
            Metric::SodiumMg => m.sodium_mg,
            Metric::AddedSugarG => m.added_sugar_g,
            Metric::TaurineG => m.taurine_g,
            Metric::HeavyMetalsTested => m.heavy_metals_tested.map(flag),
            Metric::MissingMacros => Some(flag(m.missing_macros)),
            Metric::SodiumReportedZero => Some(flag(m.sodium_reported_zero)),
        }
    }
}

impl FromStr for Metric {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| SpecError::UnknownMetric {
                name: s.to_string(),
            })
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zero in a mass field means the extractor found nothing, so ratio
/// operands only count when positive.
fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

/// Factor that converts amino acid masses to a per-serving basis.
pub(crate) fn amino_scale(nutrients: &NutrientFacts, aminos: &AminoAcidFacts) -> f64 {
    match (aminos.serving_basis, positive(nutrients.serving_size_g)) {
        (Some(ServingBasis::Per100g), Some(serving_g)) => serving_g / 100.0,
        _ => 1.0,
    }
}

/// Glycine per serving, on the same basis as the other amino metrics.
pub(crate) fn glycine_g_per_serving(record: &FactRecord) -> Option<f64> {
    let nutrients = record.nutrient_facts();
    let aminos = record.amino_facts();
    let scale = amino_scale(&nutrients, &aminos);
    aminos.seaas.glycine_g.map(|g| g * scale)
}

/// Derive every metric the scoring spec can refer to from one fact record.
pub fn compute_metrics(record: &FactRecord) -> ComputedMetrics {
    let n = record.nutrient_facts();
    let a = record.amino_facts();
    let scale = amino_scale(&n, &a);

    let eaas_g = positive(a.eaas.total()).map(|g| g * scale);
    let bcaas_g = positive(a.eaas.bcaas.total()).map(|g| g * scale);
    let leucine_g = a.eaas.bcaas.leucine_g.map(|g| g * scale);
    let taurine_g = a.seaas.taurine_g.map(|g| g * scale);

    let protein_g = positive(n.protein_g_per_serving);
    let serving_g = positive(n.serving_size_g);
    let energy_kcal = positive(n.energy_kcal_per_serving);

    let mut metrics = ComputedMetrics::default();

    if let (Some(protein), Some(serving)) = (protein_g, serving_g) {
        metrics.protein_pct = Some(protein / serving * 100.0);
    }

    if let (Some(protein), Some(kcal)) = (protein_g, energy_kcal) {
        metrics.protein_per_100_kcal = Some(protein / kcal * 100.0);
    }

    if let (Some(eaas), Some(protein)) = (eaas_g, protein_g) {
        let raw = eaas / protein;
        metrics.eaas_pct_raw = Some(raw);
        metrics.eaas_pct = Some(raw.min(1.0));
    }

    if let (Some(bcaas), Some(eaas)) = (bcaas_g, eaas_g) {
        metrics.bcaas_pct_of_eaas = Some(bcaas / eaas);
    }

    if let (Some(carbs), Some(fat)) = (n.carbohydrates_g_per_serving, n.total_fat_g_per_serving) {
        metrics.non_protein_macros_g = Some(carbs + fat);
    }

    metrics.leucine_g_per_serving = leucine_g;
    metrics.protein_g_per_serving = n.protein_g_per_serving;
    metrics.sodium_mg = n.sodium_mg_per_serving;
    metrics.added_sugar_g = n.added_sugar_g_per_serving;
    metrics.taurine_g = taurine_g;
    metrics.heavy_metals_tested = n.heavy_metals_tested;

    metrics.missing_macros = n.protein_g_per_serving.is_none()
        || n.carbohydrates_g_per_serving.is_none()
        || n.total_fat_g_per_serving.is_none();
    metrics.sodium_reported_zero = n.sodium_mg_per_serving == Some(0.0);

    metrics
}
