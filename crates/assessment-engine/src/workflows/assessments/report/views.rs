use serde::Serialize;

use super::super::domain::{AssessmentId, Submission, UserId};
use super::super::lifecycle::LifecycleState;
use super::super::scoring::Grade;

/// Fixed reporting bands over the floor of a submission's percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionBand {
    NinetyToHundred,
    Eighties,
    Seventies,
    Sixties,
    BelowSixty,
}

impl DistributionBand {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::NinetyToHundred,
            Self::Eighties,
            Self::Seventies,
            Self::Sixties,
            Self::BelowSixty,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NinetyToHundred => "90-100%",
            Self::Eighties => "80-89%",
            Self::Seventies => "70-79%",
            Self::Sixties => "60-69%",
            Self::BelowSixty => "Below 60%",
        }
    }

    /// Bands are contiguous integer ranges, so flooring first leaves no gaps (89.5 is in
    /// `80-89%`).
    pub fn for_percentage(percentage: f64) -> Self {
        let floor = percentage.floor();
        if floor >= 90.0 {
            Self::NinetyToHundred
        } else if floor >= 80.0 {
            Self::Eighties
        } else if floor >= 70.0 {
            Self::Seventies
        } else if floor >= 60.0 {
            Self::Sixties
        } else {
            Self::BelowSixty
        }
    }

    pub(crate) const fn position(self) -> usize {
        match self {
            Self::NinetyToHundred => 0,
            Self::Eighties => 1,
            Self::Seventies => 2,
            Self::Sixties => 3,
            Self::BelowSixty => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionBucket {
    pub band: DistributionBand,
    pub label: &'static str,
    pub count: usize,
}

/// Cohort statistics for one assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentStats {
    pub total_assigned: usize,
    pub total_completed: usize,
    pub completion_rate: f64,
    pub average_score: f64,
    pub average_percentage: f64,
    pub highest_score: u32,
    pub lowest_score: u32,
    pub distribution: Vec<DistributionBucket>,
    pub outstanding_students: Vec<UserId>,
}

impl AssessmentStats {
    pub fn distribution_counts(&self) -> Vec<usize> {
        self.distribution.iter().map(|bucket| bucket.count).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    First,
    Second,
    Third,
}

impl Placement {
    pub(crate) fn for_rank(rank: usize) -> Option<Self> {
        match rank {
            1 => Some(Self::First),
            2 => Some(Self::Second),
            3 => Some(Self::Third),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSubmission {
    pub rank: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
    pub grade: Grade,
    pub display_percentage: f64,
    pub submission: Submission,
}

/// Payload for the insights screen.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentInsights {
    pub assessment_id: AssessmentId,
    pub title: String,
    pub state: LifecycleState,
    pub state_label: &'static str,
    pub live_preview: bool,
    pub stats: AssessmentStats,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub leaderboard: Vec<RankedSubmission>,
}
