use std::collections::HashSet;

use super::super::domain::{Assessment, Submission};
use super::super::scoring::{percentage_of, ComputationError};
use super::views::{AssessmentStats, DistributionBand, DistributionBucket};

const PERCENTAGE_TOLERANCE: f64 = 1e-9;

/// Compute cohort statistics. An empty submission set is a normal state and yields zeros.
pub fn aggregate(
    assessment: &Assessment,
    submissions: &[Submission],
) -> Result<AssessmentStats, ComputationError> {
    for submission in submissions {
        check_submission(assessment, submission)?;
    }

    let total_assigned = assessment.assigned_to.len();
    let total_completed = submissions.len();
    let completion_rate = if total_assigned == 0 {
        0.0
    } else {
        total_completed as f64 / total_assigned as f64 * 100.0
    };

    let (average_score, average_percentage, highest_score, lowest_score) =
        if submissions.is_empty() {
            (0.0, 0.0, 0, 0)
        } else {
            let count = submissions.len() as f64;
            let score_sum: u64 = submissions.iter().map(|s| u64::from(s.score)).sum();
            let percentage_sum: f64 = submissions.iter().map(|s| s.percentage).sum();
            let highest = submissions.iter().map(|s| s.score).max().unwrap_or(0);
            let lowest = submissions.iter().map(|s| s.score).min().unwrap_or(0);
            (
                score_sum as f64 / count,
                percentage_sum / count,
                highest,
                lowest,
            )
        };

    let mut counts = [0usize; 5];
    for submission in submissions {
        counts[DistributionBand::for_percentage(submission.percentage).position()] += 1;
    }
    let distribution = DistributionBand::ordered()
        .into_iter()
        .map(|band| DistributionBucket {
            band,
            label: band.label(),
            count: counts[band.position()],
        })
        .collect();

    let submitted: HashSet<_> = submissions.iter().map(|s| &s.student_id).collect();
    let outstanding_students = assessment
        .assigned_to
        .iter()
        .filter(|user| !submitted.contains(user))
        .cloned()
        .collect();

    Ok(AssessmentStats {
        total_assigned,
        total_completed,
        completion_rate,
        average_score,
        average_percentage,
        highest_score,
        lowest_score,
        distribution,
        outstanding_students,
    })
}

fn check_submission(assessment: &Assessment, submission: &Submission) -> Result<(), ComputationError> {
    if submission.assessment_id != assessment.id {
        return Err(ComputationError::ForeignSubmission {
            expected: assessment.id.clone(),
            found: submission.assessment_id.clone(),
            student: submission.student_id.clone(),
        });
    }
    if submission.total_marks != assessment.total_marks {
        return Err(ComputationError::SubmissionTotalMismatch {
            student: submission.student_id.clone(),
            expected: assessment.total_marks,
            found: submission.total_marks,
        });
    }
    if submission.total_marks == 0 || submission.score > submission.total_marks {
        return Err(ComputationError::ScoreOutOfRange {
            student: submission.student_id.clone(),
            score: submission.score,
            total: submission.total_marks,
        });
    }
    if !submission.percentage.is_finite() {
        return Err(ComputationError::InvalidPercentage {
            student: submission.student_id.clone(),
        });
    }
    if (submission.percentage - percentage_of(submission.score, submission.total_marks)).abs()
        > PERCENTAGE_TOLERANCE
    {
        return Err(ComputationError::PercentageMismatch {
            student: submission.student_id.clone(),
            score: submission.score,
            total: submission.total_marks,
            recorded: submission.percentage,
        });
    }
    Ok(())
}
