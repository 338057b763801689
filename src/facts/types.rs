use serde::{Deserialize, Serialize};

/// Extracted label facts for one product, as written by the extraction pipeline.
///
/// Every field is optional. Extra fields (`raw_evidence`, `quality`, ...)
/// are ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct FactRecord {
    #[serde(default)]
    pub brand: Option<String>,

    #[serde(default)]
    pub nutrients: Option<Extraction<NutrientFacts>>,

    #[serde(default)]
    pub aminoacids: Option<Extraction<AminoAcidFacts>>,
}

/// Envelope around one extracted profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Extraction<T> {
    #[serde(default)]
    pub extracted_fields: T,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct NutrientFacts {
    pub serving_size_g: Option<f64>,
    pub energy_kcal_per_serving: Option<f64>,
    pub protein_g_per_serving: Option<f64>,
    pub carbohydrates_g_per_serving: Option<f64>,
    pub total_fat_g_per_serving: Option<f64>,
    pub sodium_mg_per_serving: Option<f64>,
    pub added_sugar_g_per_serving: Option<f64>,
    pub heavy_metals_tested: Option<bool>,
}

/// Basis the amino acid table on the label was printed in.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum ServingBasis {
    #[default]
    #[serde(rename = "per_serving")]
    PerServing,
    #[serde(rename = "per_100g")]
    Per100g,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AminoAcidFacts {
    #[serde(default)]
    pub serving_basis: Option<ServingBasis>,
    #[serde(default)]
    pub eaas: EssentialAminos,
    #[serde(default)]
    pub seaas: SemiEssentialAminos,
    #[serde(default)]
    pub neaas: NonEssentialAminos,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct EssentialAminos {
    pub total_g: Option<f64>,
    #[serde(default)]
    pub bcaas: BranchedChainAminos,
    pub lysine_g: Option<f64>,
    pub methionine_g: Option<f64>,
    pub phenylalanine_g: Option<f64>,
    pub threonine_g: Option<f64>,
    pub tryptophan_g: Option<f64>,
    pub histidine_g: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct BranchedChainAminos {
    pub total_g: Option<f64>,
    pub leucine_g: Option<f64>,
    pub isoleucine_g: Option<f64>,
    pub valine_g: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SemiEssentialAminos {
    pub total_g: Option<f64>,
    pub arginine_g: Option<f64>,
    pub cysteine_g: Option<f64>,
    pub glycine_g: Option<f64>,
    pub proline_g: Option<f64>,
    pub tyrosine_g: Option<f64>,
    pub taurine_g: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct NonEssentialAminos {
    pub total_g: Option<f64>,
    pub serine_g: Option<f64>,
    pub alanine_g: Option<f64>,
    pub aspartic_acid_g: Option<f64>,
    pub glutamic_acid_g: Option<f64>,
}

/// Sum of the present values, or `None` if none are present.
fn sum_present(values: &[Option<f64>]) -> Option<f64> {
    values
        .iter()
        .flatten()
        .copied()
        .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

impl BranchedChainAminos {
    /// Declared total, else the sum of the listed constituents.
    pub fn total(&self) -> Option<f64> {
        self.total_g
            .or_else(|| sum_present(&[self.leucine_g, self.isoleucine_g, self.valine_g]))
    }
}

impl EssentialAminos {
    /// Declared total, else the sum of the listed constituents (BCAAs included).
    pub fn total(&self) -> Option<f64> {
        self.total_g.or_else(|| {
            sum_present(&[
                self.bcaas.total(),
                self.lysine_g,
                self.methionine_g,
                self.phenylalanine_g,
                self.threonine_g,
                self.tryptophan_g,
                self.histidine_g,
            ])
        })
    }
}

impl SemiEssentialAminos {
    pub fn total(&self) -> Option<f64> {
        self.total_g.or_else(|| {
            sum_present(&[
                self.arginine_g,
                self.cysteine_g,
                self.glycine_g,
                self.proline_g,
                self.tyrosine_g,
                self.taurine_g,
            ])
        })
    }
}

impl NonEssentialAminos {
    pub fn total(&self) -> Option<f64> {
        self.total_g.or_else(|| {
            sum_present(&[
                self.serine_g,
                self.alanine_g,
                self.aspartic_acid_g,
                self.glutamic_acid_g,
            ])
        })
    }
}

impl FactRecord {
    pub fn brand_name(&self) -> &str {
        self.brand.as_deref().unwrap_or("unknown")
    }

    /// Nutrient facts, or all-unknown if the profile was never extracted.
    pub fn nutrient_facts(&self) -> NutrientFacts {
        self.nutrients
            .as_ref()
            .map(|n| n.extracted_fields.clone())
            .unwrap_or_default()
    }

    /// Amino acid facts, or all-unknown if the profile was never extracted.
    pub fn amino_facts(&self) -> AminoAcidFacts {
        self.aminoacids
            .as_ref()
            .map(|a| a.extracted_fields.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_extraction_output() {
        let record: FactRecord = serde_json::from_value(json!({
            "brand": "origin_plant",
            "nutrients": {
                "product_id": "origin_plant_nutrients",
                "extracted_fields": {
                    "serving_size_g": 32.5,
                    "energy_kcal_per_serving": 121.44,
                    "protein_g_per_serving": 25,
                    "carbohydrates_g_per_serving": 4.01,
                    "total_fat_g_per_serving": 0.60,
                    "sodium_mg_per_serving": 230
                },
                "quality": { "extraction_confidence": 0.95 }
            },
            "aminoacids": {
                "extracted_fields": {
                    "serving_basis": "per_100g",
                    "eaas": { "total_g": 9.1, "bcaas": { "total_g": 4.713, "leucine_g": null } },
                    "seaas": { "total_g": 4.1, "glycine_g": null },
                    "neaas": { "total_g": 8.1 }
                }
            }
        }))
        .unwrap();

        assert_eq!(record.brand_name(), "origin_plant");
        let nutrients = record.nutrient_facts();
        assert_eq!(nutrients.protein_g_per_serving, Some(25.0));
        assert_eq!(nutrients.added_sugar_g_per_serving, None);
        assert_eq!(nutrients.heavy_metals_tested, None);

        let aminos = record.amino_facts();
        assert_eq!(aminos.serving_basis, Some(ServingBasis::Per100g));
        assert_eq!(aminos.eaas.total(), Some(9.1));
        assert_eq!(aminos.eaas.bcaas.leucine_g, None);
    }

    #[test]
    fn test_empty_record_is_all_unknown() {
        let record: FactRecord = serde_json::from_value(json!({})).unwrap();
        assert_eq!(record.brand_name(), "unknown");
        assert_eq!(record.nutrient_facts(), NutrientFacts::default());
        assert_eq!(record.amino_facts().serving_basis, None);
    }

    #[test]
    fn test_totals_fall_back_to_constituents() {
        let bcaas = BranchedChainAminos {
            total_g: None,
            leucine_g: Some(2.5),
            isoleucine_g: Some(1.25),
            valine_g: None,
        };
        assert_eq!(bcaas.total(), Some(3.75));

        let eaas = EssentialAminos {
            bcaas,
            lysine_g: Some(2.0),
            ..Default::default()
        };
        assert_eq!(eaas.total(), Some(5.75));

        assert_eq!(NonEssentialAminos::default().total(), None);
    }

    #[test]
    fn test_declared_total_wins_over_constituents() {
        let semi = SemiEssentialAminos {
            total_g: Some(4.0),
            glycine_g: Some(1.0),
            ..Default::default()
        };
        assert_eq!(semi.total(), Some(4.0));
    }

    #[test]
    fn test_unknown_serving_basis_is_an_error() {
        let result: Result<AminoAcidFacts, _> =
            serde_json::from_value(json!({ "serving_basis": "per_scoop" }));
        assert!(result.is_err());
    }
}
