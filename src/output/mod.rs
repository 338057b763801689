pub mod formatter;
pub mod report;

pub use formatter::{
    format_components, format_leaderboard, format_product_scores, format_score, should_use_colors,
};
pub use report::{save_report, ScoreReport};
