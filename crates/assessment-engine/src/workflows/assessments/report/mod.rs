mod aggregate;
mod export;
mod leaderboard;
pub mod views;

pub use aggregate::aggregate;
pub use export::{results_csv, ExportError};
pub use leaderboard::rank_submissions;
pub use views::{
    AssessmentInsights, AssessmentStats, DistributionBand, DistributionBucket, Placement,
    RankedSubmission,
};
