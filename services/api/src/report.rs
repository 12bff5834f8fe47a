use assessment_engine::error::AppError;
use assessment_engine::workflows::assessments::report::{aggregate, rank_submissions};
use assessment_engine::workflows::assessments::{
    Assessment, AssessmentId, AssessmentStats, LifecycleState, RankedSubmission, StateConflict,
    Submission,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Cohort report built from exported records rather than the live store.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct AssessmentReport {
    pub(crate) assessment_id: AssessmentId,
    pub(crate) title: String,
    pub(crate) evaluated_at: DateTime<Utc>,
    pub(crate) state: LifecycleState,
    pub(crate) state_label: &'static str,
    pub(crate) stats: AssessmentStats,
    /// Empty while previewing an open window.
    pub(crate) leaderboard: Vec<RankedSubmission>,
}

/// Upcoming windows never report. Active windows report aggregates only with `live_preview`.
pub(crate) fn build_report(
    assessment: &Assessment,
    submissions: &[Submission],
    now: DateTime<Utc>,
    live_preview: bool,
) -> Result<AssessmentReport, AppError> {
    let state = assessment.state(now);
    let previewing = match state {
        LifecycleState::Completed => false,
        LifecycleState::Active if live_preview => true,
        _ => return Err(StateConflict::ResultsUnavailable { state }.into()),
    };

    let stats = aggregate(assessment, submissions)?;
    let leaderboard = if previewing {
        Vec::new()
    } else {
        rank_submissions(submissions)
    };

    Ok(AssessmentReport {
        assessment_id: assessment.id.clone(),
        title: assessment.title.clone(),
        evaluated_at: now,
        state,
        state_label: state.label(),
        stats,
        leaderboard,
    })
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use assessment_engine::workflows::assessments::AssessmentServiceError;
    use chrono::Duration;

    #[test]
    fn leaderboard_waits_for_window_to_close() {
        let assessment = assessment();
        let submissions = vec![submission("stu-1001", 1, 10), submission("stu-1002", 2, 20)];

        let during = build_report(
            &assessment,
            &submissions,
            opens_at() + Duration::hours(1),
            true,
        )
        .expect("preview builds");
        assert_eq!(during.state, LifecycleState::Active);
        assert_eq!(during.stats.total_completed, 2);
        assert!(during.leaderboard.is_empty());

        let after = build_report(
            &assessment,
            &submissions,
            opens_at() + Duration::hours(3),
            false,
        )
        .expect("report builds");
        assert_eq!(after.leaderboard.len(), 2);
        assert_eq!(after.leaderboard[0].submission.student_id.0, "stu-1002");
    }

    #[test]
    fn open_window_without_preview_is_refused() {
        let assessment = assessment();
        let submissions = vec![submission("stu-1001", 2, 10)];

        let err = build_report(
            &assessment,
            &submissions,
            opens_at() + Duration::minutes(30),
            false,
        )
        .expect_err("active window is gated");

        assert!(matches!(
            err,
            AppError::Assessment(AssessmentServiceError::StateConflict(
                StateConflict::ResultsUnavailable {
                    state: LifecycleState::Active
                }
            ))
        ));
    }

    #[test]
    fn upcoming_window_is_refused_even_with_preview() {
        let assessment = assessment();

        let err = build_report(&assessment, &[], opens_at() - Duration::minutes(1), true)
            .expect_err("upcoming window is gated");

        assert!(matches!(
            err,
            AppError::Assessment(AssessmentServiceError::StateConflict(
                StateConflict::ResultsUnavailable {
                    state: LifecycleState::Upcoming
                }
            ))
        ));
    }

    #[test]
    fn inconsistent_exports_are_rejected() {
        let assessment = assessment();
        let mut broken = submission("stu-1001", 1, 10);
        broken.total_marks = 5;

        let err = build_report(&assessment, &[broken], opens_at() + Duration::hours(3), false)
            .expect_err("mismatch");
        assert!(err.to_string().contains("total marks"));
    }
}
