pub mod config;
pub mod engine;
pub mod metrics;
pub mod range;
pub mod scorer;
pub mod spiking;
pub mod table;
pub mod validation;

pub use config::*;
pub use engine::{
    score_mode, CompiledSpec, ComponentScore, ModeScore, PenaltyScore, PenaltySource, RejectFlag,
};
pub use metrics::{compute_metrics, ComputedMetrics, Metric};
pub use range::{matches, RangeOp};
pub use scorer::{LeaderboardEntry, ProductScores, Scorer};
pub use spiking::{detect_amino_spiking, AminoSpikingResult, SpikingRule};
pub use table::OrderedTable;
pub use validation::validate_spec;
