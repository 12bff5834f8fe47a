use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Assessment, UserId};

/// Derived position of an assessment relative to its time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Upcoming,
    Active,
    Completed,
}

impl LifecycleState {
    pub const fn ordered() -> [Self; 3] {
        [Self::Upcoming, Self::Active, Self::Completed]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Upcoming => "Upcoming",
            Self::Active => "Active",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Maps a window and an instant to exactly one state. Both boundary instants belong to
/// `Active`: the window opens at `start` and is still open at `end`.
pub fn resolve_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> LifecycleState {
    if now < start {
        LifecycleState::Upcoming
    } else if now > end {
        LifecycleState::Completed
    } else {
        LifecycleState::Active
    }
}

pub fn resolve_state(assessment: &Assessment, now: DateTime<Utc>) -> LifecycleState {
    resolve_window(assessment.start_time, assessment.end_time, now)
}

/// Single mutability gate for content, window, assignees, and deletion.
pub fn is_editable(assessment: &Assessment, now: DateTime<Utc>) -> bool {
    resolve_state(assessment, now) == LifecycleState::Upcoming
}

pub fn is_results_viewable(assessment: &Assessment, now: DateTime<Utc>) -> bool {
    resolve_state(assessment, now) == LifecycleState::Completed
}

pub fn accepts_submissions(assessment: &Assessment, now: DateTime<Utc>) -> bool {
    resolve_state(assessment, now) == LifecycleState::Active
}

/// Operation attempted outside the lifecycle state that permits it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateConflict {
    #[error("assessment has already started and can no longer be changed (currently {state})")]
    NotEditable { state: LifecycleState },
    #[error("assessment not active (currently {state})")]
    NotActive { state: LifecycleState },
    #[error("results are not available while the assessment is {state}")]
    ResultsUnavailable { state: LifecycleState },
    #[error("student {student} has already submitted this assessment")]
    AlreadySubmitted { student: UserId },
    #[error("student {student} is not assigned to this assessment")]
    NotAssigned { student: UserId },
}
