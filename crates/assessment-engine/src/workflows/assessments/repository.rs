use super::domain::{Assessment, AssessmentId, AssignableUser, NewAssessment, Submission, UserId};

/// Remote store for assessments and their submissions. Each call is one atomic write or read;
/// retries and timeouts belong to the implementation.
pub trait AssessmentRepository: Send + Sync {
    /// Persist a validated assessment and assign its identifier.
    fn create(&self, assessment: NewAssessment) -> Result<Assessment, RepositoryError>;
    fn update(&self, assessment: Assessment) -> Result<(), RepositoryError>;
    fn delete(&self, id: &AssessmentId) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError>;
    fn list_by_author(&self, author: &UserId) -> Result<Vec<Assessment>, RepositoryError>;
    fn list_assigned(&self, student: &UserId) -> Result<Vec<Assessment>, RepositoryError>;

    /// Store a graded submission. Must return `Conflict` when the (assessment, student) pair
    /// already has one.
    fn insert_submission(&self, submission: Submission) -> Result<Submission, RepositoryError>;
    fn submission_for(
        &self,
        assessment: &AssessmentId,
        student: &UserId,
    ) -> Result<Option<Submission>, RepositoryError>;
    fn submissions(&self, assessment: &AssessmentId) -> Result<Vec<Submission>, RepositoryError>;
}

/// Account directory used to find students to assign.
pub trait UserDirectory: Send + Sync {
    fn search(&self, query: &str) -> Result<Vec<AssignableUser>, RepositoryError>;
}

/// Failures reported by the external store. Propagated unchanged to callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
