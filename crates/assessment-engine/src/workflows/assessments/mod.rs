//! Assessment authoring, lifecycle gating, scoring, and cohort analytics.
//!
//! Lifecycle state is derived from the clock on every read and never stored. All persistence
//! goes through [`AssessmentRepository`] and [`UserDirectory`]; the HTTP surface lives in
//! [`router`].

pub mod domain;
pub mod lifecycle;
pub mod report;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    AnswerSheet, Assessment, AssessmentDraft, AssessmentId, AssessmentPatch, AssessmentSummary,
    AssignableUser, NewAssessment, PublicQuestion, Question, StudentAssessmentView, Submission,
    UserId, OPTIONS_PER_QUESTION,
};
pub use lifecycle::{LifecycleState, StateConflict};
pub use report::{
    AssessmentInsights, AssessmentStats, DistributionBand, DistributionBucket, ExportError,
    Placement, RankedSubmission,
};
pub use repository::{AssessmentRepository, RepositoryError, UserDirectory};
pub use router::assessment_router;
pub use scoring::{ComputationError, Grade, QuestionOutcome, ScoreCard, ScoringEngine};
pub use service::{AssessmentPolicy, AssessmentService, AssessmentServiceError};
pub use validation::{validate_draft, ValidationError, ValidationErrors};
