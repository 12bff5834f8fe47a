use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::lifecycle::{self, LifecycleState};
use super::scoring::Grade;

/// Every multiple-choice question carries exactly this many options.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// Identifier assigned by the repository when an assessment is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssessmentId(pub String);

impl fmt::Display for AssessmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque user identifier issued by the portal's account service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Multiple-choice question as authored and as stored.
///
/// `correct_option_index` stays optional so a missing answer key surfaces as a validation
/// failure during authoring and as a computation error if it ever reaches scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_option_index: Option<i32>,
    pub explanation: String,
}

/// Authoring input for a new assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentDraft {
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub questions: Vec<Question>,
    pub assigned_to: Vec<UserId>,
}

/// Partial update applied on top of an existing assessment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub questions: Option<Vec<Question>>,
    #[serde(default)]
    pub assigned_to: Option<Vec<UserId>>,
}

impl AssessmentPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(self, mut draft: AssessmentDraft) -> AssessmentDraft {
        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(start_time) = self.start_time {
            draft.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            draft.end_time = end_time;
        }
        if let Some(duration) = self.duration_minutes {
            draft.duration_minutes = duration;
        }
        if let Some(questions) = self.questions {
            draft.questions = questions;
        }
        if let Some(assigned_to) = self.assigned_to {
            draft.assigned_to = assigned_to;
        }
        draft
    }
}

/// Validated draft handed to the repository, which assigns the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssessment {
    pub draft: AssessmentDraft,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl NewAssessment {
    pub fn into_assessment(self, id: AssessmentId) -> Assessment {
        let NewAssessment {
            draft,
            created_by,
            created_at,
        } = self;

        Assessment {
            id,
            title: draft.title,
            description: draft.description,
            start_time: draft.start_time,
            end_time: draft.end_time,
            duration_minutes: draft.duration_minutes,
            total_marks: draft.questions.len() as u32,
            questions: draft.questions,
            assigned_to: draft.assigned_to,
            created_by,
            created_at,
        }
    }
}

/// Persisted assessment. Lifecycle state is never stored; see [`Assessment::state`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: AssessmentId,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub questions: Vec<Question>,
    pub assigned_to: Vec<UserId>,
    pub total_marks: u32,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Assessment {
    pub fn state(&self, now: DateTime<Utc>) -> LifecycleState {
        lifecycle::resolve_state(self, now)
    }

    pub fn is_assigned(&self, user: &UserId) -> bool {
        self.assigned_to.iter().any(|assigned| assigned == user)
    }

    pub fn to_draft(&self) -> AssessmentDraft {
        AssessmentDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            duration_minutes: self.duration_minutes,
            questions: self.questions.clone(),
            assigned_to: self.assigned_to.clone(),
        }
    }

    /// Replace the authored content, keeping identity and provenance. Total marks follow the
    /// question count.
    pub fn with_draft(self, draft: AssessmentDraft) -> Self {
        Self {
            title: draft.title,
            description: draft.description,
            start_time: draft.start_time,
            end_time: draft.end_time,
            duration_minutes: draft.duration_minutes,
            total_marks: draft.questions.len() as u32,
            questions: draft.questions,
            assigned_to: draft.assigned_to,
            ..self
        }
    }

    pub fn summary(&self, now: DateTime<Utc>) -> AssessmentSummary {
        let state = self.state(now);
        AssessmentSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            duration_minutes: self.duration_minutes,
            total_marks: self.total_marks,
            assigned_count: self.assigned_to.len(),
            state,
            state_label: state.label(),
            editable: lifecycle::is_editable(self, now),
            created_at: self.created_at,
        }
    }

    /// Paper handed to students. The answer key and explanations stay hidden until the window
    /// has closed.
    pub fn student_view(&self, now: DateTime<Utc>) -> StudentAssessmentView {
        let state = self.state(now);
        let reveal = state == LifecycleState::Completed;
        let questions = self
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| PublicQuestion {
                index,
                text: question.text.clone(),
                options: question.options.clone(),
                correct_option_index: if reveal {
                    question.correct_option_index
                } else {
                    None
                },
                explanation: reveal.then(|| question.explanation.clone()),
            })
            .collect();

        StudentAssessmentView {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            duration_minutes: self.duration_minutes,
            total_marks: self.total_marks,
            state,
            state_label: state.label(),
            questions,
        }
    }
}

/// Listing row for dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentSummary {
    pub id: AssessmentId,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub total_marks: u32,
    pub assigned_count: usize,
    pub state: LifecycleState,
    pub state_label: &'static str,
    pub editable: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub index: usize,
    pub text: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_option_index: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentAssessmentView {
    pub id: AssessmentId,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub total_marks: u32,
    pub state: LifecycleState,
    pub state_label: &'static str,
    pub questions: Vec<PublicQuestion>,
}

/// Answers handed in by a student. Keys are zero-based question indices, values the selected
/// option index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSheet {
    pub student_id: UserId,
    pub student_name: String,
    #[serde(default)]
    pub answers: BTreeMap<usize, i32>,
    #[serde(default)]
    pub time_taken_seconds: u32,
}

/// Recorded and graded submission. One per (assessment, student) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub assessment_id: AssessmentId,
    pub student_id: UserId,
    pub student_name: String,
    pub answers: BTreeMap<usize, i32>,
    pub score: u32,
    pub total_marks: u32,
    pub percentage: f64,
    pub submitted_at: DateTime<Utc>,
    pub time_taken_seconds: u32,
}

impl Submission {
    pub fn grade(&self) -> Grade {
        Grade::from_percentage(self.percentage)
    }

    /// Percentage rounded to one decimal place.
    pub fn display_percentage(&self) -> f64 {
        (self.percentage * 10.0).round() / 10.0
    }
}

/// Directory entry returned by user search when populating `assigned_to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignableUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub department: String,
}
