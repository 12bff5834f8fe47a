mod grade;

pub use grade::Grade;

use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{Assessment, AssessmentId, UserId, OPTIONS_PER_QUESTION};

/// Malformed stored data reaching the engine. These are defects, not user errors, and are
/// never skipped or scored as zero.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComputationError {
    #[error("assessment {assessment} has no questions to score")]
    NoQuestions { assessment: AssessmentId },
    #[error("assessment {assessment} question {question} has no correct option")]
    MissingCorrectOption {
        assessment: AssessmentId,
        question: usize,
    },
    #[error("assessment {assessment} question {question} marks option {index} as correct but has {options} options")]
    CorrectOptionOutOfRange {
        assessment: AssessmentId,
        question: usize,
        index: i32,
        options: usize,
    },
    #[error("assessment {assessment} question {question} has {found} options, expected 4")]
    MalformedOptions {
        assessment: AssessmentId,
        question: usize,
        found: usize,
    },
    #[error("assessment {assessment} records {recorded} total marks but has {questions} questions")]
    TotalMarksMismatch {
        assessment: AssessmentId,
        recorded: u32,
        questions: usize,
    },
    #[error("submission from {student} belongs to assessment {found}, expected {expected}")]
    ForeignSubmission {
        expected: AssessmentId,
        found: AssessmentId,
        student: UserId,
    },
    #[error("submission from {student} has total marks {found}, assessment has {expected}")]
    SubmissionTotalMismatch {
        student: UserId,
        expected: u32,
        found: u32,
    },
    #[error("submission from {student} scores {score} out of {total}")]
    ScoreOutOfRange {
        student: UserId,
        score: u32,
        total: u32,
    },
    #[error("submission from {student} has a non-finite percentage")]
    InvalidPercentage { student: UserId },
    #[error("submission from {student} records {recorded}% but scores {score} out of {total}")]
    PercentageMismatch {
        student: UserId,
        score: u32,
        total: u32,
        recorded: f64,
    },
}

/// Per-question audit trail of a scored answer sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionOutcome {
    pub question: usize,
    pub selected: Option<i32>,
    pub correct: i32,
    pub is_correct: bool,
}

/// Result of scoring one answer sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    pub score: u32,
    pub total_marks: u32,
    pub percentage: f64,
    pub grade: Grade,
    pub outcomes: Vec<QuestionOutcome>,
}

/// Stateless multiple-choice scorer. Identical input always yields an identical card, so it
/// is safe to re-run for audits.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn score(
        &self,
        assessment: &Assessment,
        answers: &BTreeMap<usize, i32>,
    ) -> Result<ScoreCard, ComputationError> {
        let key = answer_key(assessment)?;

        let outcomes: Vec<QuestionOutcome> = key
            .iter()
            .enumerate()
            .map(|(index, &correct)| {
                let selected = answers.get(&index).copied();
                QuestionOutcome {
                    question: index,
                    selected,
                    correct,
                    is_correct: selected == Some(correct),
                }
            })
            .collect();

        let score = outcomes.iter().filter(|outcome| outcome.is_correct).count() as u32;
        let total_marks = key.len() as u32;
        let percentage = percentage_of(score, total_marks);

        Ok(ScoreCard {
            score,
            total_marks,
            percentage,
            grade: Grade::from_percentage(percentage),
            outcomes,
        })
    }
}

/// Share of `score` in `total` as an unrounded percentage; zero when `total` is zero.
pub fn percentage_of(score: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(score) / f64::from(total) * 100.0
    }
}

/// Correct option per question, checked for the invariants authoring guarantees.
pub(crate) fn answer_key(assessment: &Assessment) -> Result<Vec<i32>, ComputationError> {
    if assessment.questions.is_empty() {
        return Err(ComputationError::NoQuestions {
            assessment: assessment.id.clone(),
        });
    }
    if assessment.total_marks as usize != assessment.questions.len() {
        return Err(ComputationError::TotalMarksMismatch {
            assessment: assessment.id.clone(),
            recorded: assessment.total_marks,
            questions: assessment.questions.len(),
        });
    }

    assessment
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let number = index + 1;
            let options = question.options.len();
            if options != OPTIONS_PER_QUESTION {
                return Err(ComputationError::MalformedOptions {
                    assessment: assessment.id.clone(),
                    question: number,
                    found: options,
                });
            }
            match question.correct_option_index {
                None => Err(ComputationError::MissingCorrectOption {
                    assessment: assessment.id.clone(),
                    question: number,
                }),
                Some(correct) if correct < 0 || correct as usize >= options => {
                    Err(ComputationError::CorrectOptionOutOfRange {
                        assessment: assessment.id.clone(),
                        question: number,
                        index: correct,
                        options,
                    })
                }
                Some(correct) => Ok(correct),
            }
        })
        .collect()
}
