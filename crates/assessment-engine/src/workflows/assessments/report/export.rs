use serde::Serialize;

use super::views::RankedSubmission;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write results csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("results csv is not valid utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[derive(Serialize)]
struct ResultRow<'a> {
    rank: usize,
    student_id: &'a str,
    student_name: &'a str,
    score: u32,
    total_marks: u32,
    percentage: String,
    grade: &'static str,
    time_taken_seconds: u32,
    submitted_at: String,
}

const HEADER: [&str; 9] = [
    "rank",
    "student_id",
    "student_name",
    "score",
    "total_marks",
    "percentage",
    "grade",
    "time_taken_seconds",
    "submitted_at",
];

/// Render a ranked leaderboard as CSV. The header row is written even when nobody has
/// submitted.
pub fn results_csv(ranked: &[RankedSubmission]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(HEADER)?;

    for entry in ranked {
        let submission = &entry.submission;
        writer.serialize(ResultRow {
            rank: entry.rank,
            student_id: &submission.student_id.0,
            student_name: &submission.student_name,
            score: submission.score,
            total_marks: submission.total_marks,
            percentage: format!("{:.1}", entry.display_percentage),
            grade: entry.grade.label(),
            time_taken_seconds: submission.time_taken_seconds,
            submitted_at: submission.submitted_at.to_rfc3339(),
        })?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}
