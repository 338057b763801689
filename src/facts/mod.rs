pub mod loader;
pub mod types;

pub use loader::{discover_fact_files, fact_file_path, load_fact_dir, load_fact_record};
pub use types::{
    AminoAcidFacts, BranchedChainAminos, EssentialAminos, Extraction, FactRecord,
    NonEssentialAminos, NutrientFacts, SemiEssentialAminos, ServingBasis,
};
