use std::cmp::Ordering;

use super::super::domain::Submission;
use super::views::{Placement, RankedSubmission};

/// Order submissions for display: highest percentage first, earlier submission wins a tie,
/// student id settles anything left so the podium is reproducible.
pub fn rank_submissions(submissions: &[Submission]) -> Vec<RankedSubmission> {
    let mut ordered: Vec<&Submission> = submissions.iter().collect();
    ordered.sort_by(|left, right| compare(left, right));

    ordered
        .into_iter()
        .enumerate()
        .map(|(position, submission)| {
            let rank = position + 1;
            RankedSubmission {
                rank,
                placement: Placement::for_rank(rank),
                grade: submission.grade(),
                display_percentage: submission.display_percentage(),
                submission: submission.clone(),
            }
        })
        .collect()
}

fn compare(left: &Submission, right: &Submission) -> Ordering {
    right
        .percentage
        .total_cmp(&left.percentage)
        .then_with(|| left.submitted_at.cmp(&right.submitted_at))
        .then_with(|| left.student_id.cmp(&right.student_id))
}
