use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};

use super::domain::{AssessmentDraft, Question, UserId, OPTIONS_PER_QUESTION};

/// Single authoring problem. Question numbers are 1-based so they can be shown to authors
/// as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("description must not be empty")]
    EmptyDescription,
    #[error("start time must be before end time")]
    InvertedWindow,
    #[error("assessment window already elapsed")]
    WindowElapsed,
    #[error("duration must be at least 1 minute (found {found})")]
    InvalidDuration { found: i32 },
    #[error("at least one question is required")]
    NoQuestions,
    #[error("question {question} text must not be empty")]
    EmptyQuestionText { question: usize },
    #[error("question {question} must have exactly 4 options (found {found})")]
    OptionCount { question: usize, found: usize },
    #[error("question {question} has empty options")]
    EmptyOption { question: usize },
    #[error("question {question} has no correct option selected")]
    MissingCorrectOption { question: usize },
    #[error("question {question} marks option {index} as correct, expected 0-3")]
    CorrectOptionOutOfRange { question: usize, index: i32 },
    #[error("question {question} needs an explanation")]
    EmptyExplanation { question: usize },
    #[error("at least one student must be assigned")]
    NoAssignees,
    #[error("user {user} is assigned more than once")]
    DuplicateAssignee { user: UserId },
}

impl ValidationError {
    /// Path of the offending field in the draft, for form feedback.
    pub fn field(&self) -> String {
        match self {
            Self::EmptyTitle => "title".to_string(),
            Self::EmptyDescription => "description".to_string(),
            Self::InvertedWindow | Self::WindowElapsed => "end_time".to_string(),
            Self::InvalidDuration { .. } => "duration_minutes".to_string(),
            Self::NoQuestions => "questions".to_string(),
            Self::EmptyQuestionText { question } => format!("questions[{question}].text"),
            Self::OptionCount { question, .. } | Self::EmptyOption { question } => {
                format!("questions[{question}].options")
            }
            Self::MissingCorrectOption { question }
            | Self::CorrectOptionOutOfRange { question, .. } => {
                format!("questions[{question}].correct_option_index")
            }
            Self::EmptyExplanation { question } => format!("questions[{question}].explanation"),
            Self::NoAssignees | Self::DuplicateAssignee { .. } => "assigned_to".to_string(),
        }
    }
}

/// Every violation found in a draft, in field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "assessment draft rejected: ")?;
        for (position, error) in self.0.iter().enumerate() {
            if position > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Check a draft against the authoring rules. All rules run; nothing short-circuits.
///
/// `now` only feeds the elapsed-window rule. A start time in the past is accepted so a draft
/// can be re-saved while it is still upcoming.
pub fn validate_draft(draft: &AssessmentDraft, now: DateTime<Utc>) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    if draft.title.trim().is_empty() {
        errors.push(ValidationError::EmptyTitle);
    }
    if draft.description.trim().is_empty() {
        errors.push(ValidationError::EmptyDescription);
    }

    if draft.start_time >= draft.end_time {
        errors.push(ValidationError::InvertedWindow);
    }
    if draft.end_time < now {
        errors.push(ValidationError::WindowElapsed);
    }

    if draft.duration_minutes < 1 {
        errors.push(ValidationError::InvalidDuration {
            found: draft.duration_minutes,
        });
    }

    if draft.questions.is_empty() {
        errors.push(ValidationError::NoQuestions);
    }
    for (index, question) in draft.questions.iter().enumerate() {
        check_question(index + 1, question, &mut errors);
    }

    check_assignees(&draft.assigned_to, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

fn check_question(number: usize, question: &Question, errors: &mut Vec<ValidationError>) {
    if question.text.trim().is_empty() {
        errors.push(ValidationError::EmptyQuestionText { question: number });
    }

    if question.options.len() != OPTIONS_PER_QUESTION {
        errors.push(ValidationError::OptionCount {
            question: number,
            found: question.options.len(),
        });
    }
    if question.options.iter().any(|option| option.trim().is_empty()) {
        errors.push(ValidationError::EmptyOption { question: number });
    }

    match question.correct_option_index {
        None => errors.push(ValidationError::MissingCorrectOption { question: number }),
        Some(index) if index < 0 || index as usize >= OPTIONS_PER_QUESTION => {
            errors.push(ValidationError::CorrectOptionOutOfRange {
                question: number,
                index,
            });
        }
        Some(_) => {}
    }

    if question.explanation.trim().is_empty() {
        errors.push(ValidationError::EmptyExplanation { question: number });
    }
}

fn check_assignees(assigned_to: &[UserId], errors: &mut Vec<ValidationError>) {
    if assigned_to.is_empty() {
        errors.push(ValidationError::NoAssignees);
        return;
    }

    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for user in assigned_to {
        if !seen.insert(user) && reported.insert(user) {
            errors.push(ValidationError::DuplicateAssignee { user: user.clone() });
        }
    }
}
