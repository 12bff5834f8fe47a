use crate::infra::{InMemoryAssessmentRepository, InMemoryUserDirectory};
use crate::report::{build_report, AssessmentReport};
use assessment_engine::clock::{Clock, FixedClock};
use assessment_engine::error::AppError;
use assessment_engine::workflows::assessments::report::results_csv;
use assessment_engine::workflows::assessments::{
    AnswerSheet, Assessment, AssessmentDraft, AssessmentService, LifecycleState, Question,
    StateConflict, Submission, UserId,
};
use chrono::{DateTime, Duration, DurationRound, Utc};
use clap::Args;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Instant the demo assessment opens (RFC 3339). Defaults to the next full hour.
    #[arg(long, value_parser = crate::infra::parse_timestamp)]
    pub(crate) opens_at: Option<DateTime<Utc>>,
    /// Also print the results export as CSV.
    #[arg(long)]
    pub(crate) csv: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Exported assessment record (JSON)
    #[arg(long)]
    pub(crate) assessment: PathBuf,
    /// Exported submissions for the assessment (JSON array)
    #[arg(long)]
    pub(crate) submissions: PathBuf,
    /// Evaluation instant for the lifecycle state (RFC 3339, defaults to now)
    #[arg(long, value_parser = crate::infra::parse_timestamp)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Print the ranked results as CSV instead of the summary (completed assessments only)
    #[arg(long)]
    pub(crate) csv: bool,
    /// Summarise an active assessment without its leaderboard
    #[arg(long)]
    pub(crate) live_preview: bool,
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        assessment,
        submissions,
        now,
        csv,
        live_preview,
    } = args;

    let assessment: Assessment = serde_json::from_str(&std::fs::read_to_string(assessment)?)?;
    let submissions: Vec<Submission> =
        serde_json::from_str(&std::fs::read_to_string(submissions)?)?;
    let now = now.unwrap_or_else(Utc::now);

    let report = build_report(&assessment, &submissions, now, live_preview)?;
    if csv {
        print!("{}", results_export(&report)?);
    } else {
        render_report(&report);
    }
    Ok(())
}

fn results_export(report: &AssessmentReport) -> Result<String, AppError> {
    if report.state != LifecycleState::Completed {
        return Err(StateConflict::ResultsUnavailable {
            state: report.state,
        }
        .into());
    }
    Ok(results_csv(&report.leaderboard)?)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { opens_at, csv } = args;
    let opens_at = match opens_at {
        Some(instant) => instant,
        None => next_hour(Utc::now()),
    };

    let clock = Arc::new(FixedClock::new(opens_at - Duration::days(1)));
    let service = AssessmentService::new(
        Arc::new(InMemoryAssessmentRepository::default()),
        Arc::new(InMemoryUserDirectory::default()),
        clock.clone(),
    );

    println!("Assessment lifecycle demo");
    let cohort = service.search_assignable_users("campus.example")?;
    println!("- Directory search found {} assignable students", cohort.len());

    let draft = demo_draft(opens_at, cohort.iter().map(|user| user.id.clone()).collect());
    let assessment = service.create_assessment(UserId::from("alum-demo"), draft)?;
    let summary = assessment.summary(clock.now());
    println!(
        "- Created {} \"{}\" ({} questions, {} assigned) -> {}",
        assessment.id,
        assessment.title,
        assessment.total_marks,
        summary.assigned_count,
        summary.state_label
    );

    clock.set(opens_at + Duration::minutes(5));
    let answer_patterns: [(usize, [i32; 3]); 4] = [
        (0, [1, 2, 0]),
        (1, [1, 2, 1]),
        (2, [0, 2, 0]),
        (3, [3, 3, 3]),
    ];
    for (position, selected) in answer_patterns {
        let Some(student) = cohort.get(position) else {
            continue;
        };
        let sheet = AnswerSheet {
            student_id: student.id.clone(),
            student_name: student.name.clone(),
            answers: selected.into_iter().enumerate().collect::<BTreeMap<_, _>>(),
            time_taken_seconds: 240 + 60 * position as u32,
        };
        match service.submit_answers(&assessment.id, sheet) {
            Ok(submission) => println!(
                "  {} scored {}/{} ({:.1}%, {})",
                submission.student_name,
                submission.score,
                submission.total_marks,
                submission.display_percentage(),
                submission.grade().label()
            ),
            Err(err) => println!("  Submission rejected: {err}"),
        }
        clock.advance(Duration::minutes(2));
    }

    match service.get_insights(&assessment.id, true) {
        Ok(preview) => println!(
            "- Live preview while active: {}/{} submitted",
            preview.stats.total_completed, preview.stats.total_assigned
        ),
        Err(err) => println!("- Live preview unavailable: {err}"),
    }

    clock.set(assessment.end_time + Duration::minutes(1));
    let insights = service.get_insights(&assessment.id, false)?;
    let report = AssessmentReport {
        assessment_id: insights.assessment_id,
        title: insights.title,
        evaluated_at: clock.now(),
        state: insights.state,
        state_label: insights.state_label,
        stats: insights.stats,
        leaderboard: insights.leaderboard,
    };
    render_report(&report);

    if csv {
        println!("\nResults export");
        print!("{}", service.export_results_csv(&assessment.id)?);
    }
    Ok(())
}

fn render_report(report: &AssessmentReport) {
    println!(
        "\nAssessment {} \"{}\" as of {}",
        report.assessment_id,
        report.title,
        report.evaluated_at.to_rfc3339()
    );
    println!("- State: {}", report.state_label);

    let stats = &report.stats;
    println!(
        "- Completion: {}/{} ({:.1}%)",
        stats.total_completed, stats.total_assigned, stats.completion_rate
    );
    println!(
        "- Scores: avg {:.2} | avg {:.1}% | high {} | low {}",
        stats.average_score, stats.average_percentage, stats.highest_score, stats.lowest_score
    );
    println!("Score distribution:");
    for bucket in &stats.distribution {
        println!("  - {:>9}: {}", bucket.label, bucket.count);
    }
    if !stats.outstanding_students.is_empty() {
        let pending: Vec<_> = stats
            .outstanding_students
            .iter()
            .map(|user| user.0.as_str())
            .collect();
        println!("Outstanding: {}", pending.join(", "));
    }

    if report.leaderboard.is_empty() {
        println!("Leaderboard: hidden until the assessment completes");
        return;
    }
    println!("Leaderboard:");
    for entry in &report.leaderboard {
        println!(
            "  {:>2}. {} ({}) {}/{} {:.1}% {}",
            entry.rank,
            entry.submission.student_name,
            entry.submission.student_id,
            entry.submission.score,
            entry.submission.total_marks,
            entry.display_percentage,
            entry.grade.label()
        );
    }
}

fn next_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    now.duration_trunc(Duration::hours(1))
        .map(|hour| hour + Duration::hours(1))
        .unwrap_or(now)
}

fn demo_draft(opens_at: DateTime<Utc>, assigned_to: Vec<UserId>) -> AssessmentDraft {
    let question = |text: &str, options: [&str; 4], correct: i32, explanation: &str| Question {
        text: text.to_string(),
        options: options.map(String::from).to_vec(),
        correct_option_index: Some(correct),
        explanation: explanation.to_string(),
    };

    AssessmentDraft {
        title: "Career Services Orientation".to_string(),
        description: "Quick check on the resources introduced in the alumni session".to_string(),
        start_time: opens_at,
        end_time: opens_at + Duration::hours(1),
        duration_minutes: 15,
        questions: vec![
            question(
                "Who reviews resumes during office hours?",
                ["Registrar", "Alumni mentors", "Library staff", "Nobody"],
                1,
                "Alumni mentors run the weekly resume clinic.",
            ),
            question(
                "Where are referral openings posted first?",
                ["Campus radio", "Course pages", "Alumni job board", "Notice board"],
                2,
                "Referrals go to the alumni job board before anywhere else.",
            ),
            question(
                "What should you bring to a mock interview?",
                ["Updated resume", "Transcript only", "Nothing", "A laptop"],
                0,
                "Mentors tailor questions to your resume.",
            ),
        ],
        assigned_to,
    }
}
