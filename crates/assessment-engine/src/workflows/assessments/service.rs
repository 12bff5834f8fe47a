use std::sync::Arc;

use tracing::{error, info, warn};

use super::domain::{
    AnswerSheet, Assessment, AssessmentDraft, AssessmentId, AssessmentPatch, AssessmentSummary,
    AssignableUser, NewAssessment, StudentAssessmentView, Submission, UserId,
};
use super::lifecycle::{self, LifecycleState, StateConflict};
use super::report::{self, AssessmentInsights, ExportError};
use super::repository::{AssessmentRepository, RepositoryError, UserDirectory};
use super::scoring::{ComputationError, ScoringEngine};
use super::validation::{self, ValidationErrors};
use crate::clock::Clock;

/// Service-level knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssessmentPolicy {
    /// Whether insights requests that do not say otherwise may preview an active assessment.
    pub live_preview_by_default: bool,
}

/// Facade composing validation, lifecycle gating, scoring, and aggregation over the
/// repository. Each operation reads the clock once.
pub struct AssessmentService<R, D> {
    repository: Arc<R>,
    directory: Arc<D>,
    clock: Arc<dyn Clock>,
    engine: ScoringEngine,
    policy: AssessmentPolicy,
}

impl<R, D> AssessmentService<R, D>
where
    R: AssessmentRepository + 'static,
    D: UserDirectory + 'static,
{
    pub fn new(repository: Arc<R>, directory: Arc<D>, clock: Arc<dyn Clock>) -> Self {
        Self::with_policy(repository, directory, clock, AssessmentPolicy::default())
    }

    pub fn with_policy(
        repository: Arc<R>,
        directory: Arc<D>,
        clock: Arc<dyn Clock>,
        policy: AssessmentPolicy,
    ) -> Self {
        Self {
            repository,
            directory,
            clock,
            engine: ScoringEngine::new(),
            policy,
        }
    }

    pub fn policy(&self) -> AssessmentPolicy {
        self.policy
    }

    /// Validate and persist a new assessment. Rejected drafts never reach the repository.
    pub fn create_assessment(
        &self,
        author: UserId,
        draft: AssessmentDraft,
    ) -> Result<Assessment, AssessmentServiceError> {
        let now = self.clock.now();
        if let Err(errors) = validation::validate_draft(&draft, now) {
            warn!(%author, violations = errors.len(), "assessment draft rejected");
            return Err(errors.into());
        }

        let created = self.repository.create(NewAssessment {
            draft,
            created_by: author,
            created_at: now,
        })?;
        info!(
            assessment = %created.id,
            questions = created.total_marks,
            assigned = created.assigned_to.len(),
            "assessment created"
        );
        Ok(created)
    }

    /// Apply a patch while the assessment is still upcoming.
    pub fn update_assessment(
        &self,
        id: &AssessmentId,
        patch: AssessmentPatch,
    ) -> Result<Assessment, AssessmentServiceError> {
        let now = self.clock.now();
        let current = self.load(id)?;
        self.ensure_editable(&current, now)?;

        let draft = patch.apply_to(current.to_draft());
        if let Err(errors) = validation::validate_draft(&draft, now) {
            warn!(assessment = %id, violations = errors.len(), "assessment update rejected");
            return Err(errors.into());
        }

        let updated = current.with_draft(draft);
        self.repository.update(updated.clone())?;
        info!(assessment = %id, "assessment updated");
        Ok(updated)
    }

    pub fn delete_assessment(&self, id: &AssessmentId) -> Result<(), AssessmentServiceError> {
        let now = self.clock.now();
        let current = self.load(id)?;
        self.ensure_editable(&current, now)?;

        self.repository.delete(id)?;
        info!(assessment = %id, "assessment deleted");
        Ok(())
    }

    pub fn get_assessment(&self, id: &AssessmentId) -> Result<Assessment, AssessmentServiceError> {
        self.load(id)
    }

    pub fn student_paper(
        &self,
        id: &AssessmentId,
    ) -> Result<StudentAssessmentView, AssessmentServiceError> {
        let now = self.clock.now();
        Ok(self.load(id)?.student_view(now))
    }

    /// Assessments authored by `author`, newest first.
    pub fn list_for_author(
        &self,
        author: &UserId,
    ) -> Result<Vec<AssessmentSummary>, AssessmentServiceError> {
        let now = self.clock.now();
        let mut assessments = self.repository.list_by_author(author)?;
        assessments.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(assessments.iter().map(|a| a.summary(now)).collect())
    }

    /// Assessments assigned to `student`, soonest start first.
    pub fn list_for_student(
        &self,
        student: &UserId,
    ) -> Result<Vec<AssessmentSummary>, AssessmentServiceError> {
        let now = self.clock.now();
        let mut assessments = self.repository.list_assigned(student)?;
        assessments.sort_by(|left, right| {
            left.start_time
                .cmp(&right.start_time)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(assessments.iter().map(|a| a.summary(now)).collect())
    }

    /// Score and record a student's answers while the window is open.
    pub fn submit_answers(
        &self,
        id: &AssessmentId,
        sheet: AnswerSheet,
    ) -> Result<Submission, AssessmentServiceError> {
        let now = self.clock.now();
        let assessment = self.load(id)?;

        let state = lifecycle::resolve_state(&assessment, now);
        if state != LifecycleState::Active {
            warn!(assessment = %id, student = %sheet.student_id, %state, "submission outside window");
            return Err(StateConflict::NotActive { state }.into());
        }
        if !assessment.is_assigned(&sheet.student_id) {
            warn!(assessment = %id, student = %sheet.student_id, "submission from unassigned student");
            return Err(StateConflict::NotAssigned {
                student: sheet.student_id,
            }
            .into());
        }
        if self
            .repository
            .submission_for(id, &sheet.student_id)?
            .is_some()
        {
            return Err(StateConflict::AlreadySubmitted {
                student: sheet.student_id,
            }
            .into());
        }

        let card = self.engine.score(&assessment, &sheet.answers).map_err(|err| {
            error!(assessment = %id, error = %err, "stored assessment cannot be scored");
            err
        })?;

        let student = sheet.student_id.clone();
        let submission = Submission {
            assessment_id: assessment.id.clone(),
            student_id: sheet.student_id,
            student_name: sheet.student_name,
            answers: sheet.answers,
            score: card.score,
            total_marks: card.total_marks,
            percentage: card.percentage,
            submitted_at: now,
            time_taken_seconds: sheet.time_taken_seconds,
        };

        match self.repository.insert_submission(submission) {
            Ok(stored) => {
                info!(
                    assessment = %id,
                    student = %stored.student_id,
                    score = stored.score,
                    total = stored.total_marks,
                    "submission recorded"
                );
                Ok(stored)
            }
            Err(RepositoryError::Conflict) => {
                Err(StateConflict::AlreadySubmitted { student }.into())
            }
            Err(other) => Err(other.into()),
        }
    }

    /// A student's own result. Students always see their own submission.
    pub fn student_result(
        &self,
        id: &AssessmentId,
        student: &UserId,
    ) -> Result<Submission, AssessmentServiceError> {
        let submission = self
            .repository
            .submission_for(id, student)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(submission)
    }

    /// Cohort insights. Completed assessments get the ranked leaderboard; an active one may be
    /// previewed with counts only, keeping individual results hidden.
    pub fn get_insights(
        &self,
        id: &AssessmentId,
        live_preview: bool,
    ) -> Result<AssessmentInsights, AssessmentServiceError> {
        let now = self.clock.now();
        let assessment = self.load(id)?;

        let state = lifecycle::resolve_state(&assessment, now);
        let previewing = match state {
            LifecycleState::Completed => false,
            LifecycleState::Active if live_preview => true,
            _ => return Err(StateConflict::ResultsUnavailable { state }.into()),
        };

        let submissions = self.repository.submissions(id)?;
        let stats = report::aggregate(&assessment, &submissions).map_err(|err| {
            error!(assessment = %id, error = %err, "stored submissions cannot be aggregated");
            err
        })?;
        let leaderboard = if previewing {
            Vec::new()
        } else {
            report::rank_submissions(&submissions)
        };

        Ok(AssessmentInsights {
            assessment_id: assessment.id,
            title: assessment.title,
            state,
            state_label: state.label(),
            live_preview: previewing,
            stats,
            leaderboard,
        })
    }

    /// Ranked results as CSV, once the window has closed.
    pub fn export_results_csv(&self, id: &AssessmentId) -> Result<String, AssessmentServiceError> {
        let now = self.clock.now();
        let assessment = self.load(id)?;
        if !lifecycle::is_results_viewable(&assessment, now) {
            return Err(StateConflict::ResultsUnavailable {
                state: assessment.state(now),
            }
            .into());
        }

        let submissions = self.repository.submissions(id)?;
        report::aggregate(&assessment, &submissions)?;
        let ranked = report::rank_submissions(&submissions);
        Ok(report::results_csv(&ranked)?)
    }

    /// Candidate assignees for the authoring form. A blank query never reaches the directory.
    pub fn search_assignable_users(
        &self,
        query: &str,
    ) -> Result<Vec<AssignableUser>, AssessmentServiceError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.directory.search(query)?)
    }

    fn load(&self, id: &AssessmentId) -> Result<Assessment, AssessmentServiceError> {
        let assessment = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(assessment)
    }

    fn ensure_editable(
        &self,
        assessment: &Assessment,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), StateConflict> {
        if lifecycle::is_editable(assessment, now) {
            Ok(())
        } else {
            let state = assessment.state(now);
            warn!(assessment = %assessment.id, %state, "mutation of locked assessment refused");
            Err(StateConflict::NotEditable { state })
        }
    }
}

/// Error raised by the assessment service.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    StateConflict(#[from] StateConflict),
    #[error(transparent)]
    Computation(#[from] ComputationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Export(#[from] ExportError),
}
