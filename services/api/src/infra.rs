use assessment_engine::error::AppError;
use assessment_engine::workflows::assessments::{
    Assessment, AssessmentId, AssessmentRepository, AssignableUser, NewAssessment,
    RepositoryError, Submission, UserDirectory, UserId,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory store poisoned".to_string()))
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAssessmentRepository {
    assessments: Arc<Mutex<HashMap<AssessmentId, Assessment>>>,
    submissions: Arc<Mutex<Vec<Submission>>>,
    sequence: Arc<AtomicU64>,
}

impl InMemoryAssessmentRepository {
    fn next_id(&self) -> AssessmentId {
        let next = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        AssessmentId(format!("asm-{next:06}"))
    }
}

impl AssessmentRepository for InMemoryAssessmentRepository {
    fn create(&self, assessment: NewAssessment) -> Result<Assessment, RepositoryError> {
        let stored = assessment.into_assessment(self.next_id());
        let mut guard = lock(&self.assessments)?;
        if guard.contains_key(&stored.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    fn update(&self, assessment: Assessment) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.assessments)?;
        if guard.contains_key(&assessment.id) {
            guard.insert(assessment.id.clone(), assessment);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn delete(&self, id: &AssessmentId) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.assessments)?;
        guard.remove(id).ok_or(RepositoryError::NotFound)?;
        lock(&self.submissions)?.retain(|submission| &submission.assessment_id != id);
        Ok(())
    }

    fn fetch(&self, id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError> {
        Ok(lock(&self.assessments)?.get(id).cloned())
    }

    fn list_by_author(&self, author: &UserId) -> Result<Vec<Assessment>, RepositoryError> {
        let guard = lock(&self.assessments)?;
        Ok(guard
            .values()
            .filter(|assessment| &assessment.created_by == author)
            .cloned()
            .collect())
    }

    fn list_assigned(&self, student: &UserId) -> Result<Vec<Assessment>, RepositoryError> {
        let guard = lock(&self.assessments)?;
        Ok(guard
            .values()
            .filter(|assessment| assessment.is_assigned(student))
            .cloned()
            .collect())
    }

    fn insert_submission(&self, submission: Submission) -> Result<Submission, RepositoryError> {
        let mut guard = lock(&self.submissions)?;
        let duplicate = guard.iter().any(|existing| {
            existing.assessment_id == submission.assessment_id
                && existing.student_id == submission.student_id
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        guard.push(submission.clone());
        Ok(submission)
    }

    fn submission_for(
        &self,
        assessment: &AssessmentId,
        student: &UserId,
    ) -> Result<Option<Submission>, RepositoryError> {
        let guard = lock(&self.submissions)?;
        Ok(guard
            .iter()
            .find(|submission| {
                &submission.assessment_id == assessment && &submission.student_id == student
            })
            .cloned())
    }

    fn submissions(&self, assessment: &AssessmentId) -> Result<Vec<Submission>, RepositoryError> {
        let guard = lock(&self.submissions)?;
        Ok(guard
            .iter()
            .filter(|submission| &submission.assessment_id == assessment)
            .cloned()
            .collect())
    }
}

/// Directory backed by a fixed list of accounts.
#[derive(Clone)]
pub(crate) struct InMemoryUserDirectory {
    users: Arc<Vec<AssignableUser>>,
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new(default_users())
    }
}

impl InMemoryUserDirectory {
    pub(crate) fn new(users: Vec<AssignableUser>) -> Self {
        Self {
            users: Arc::new(users),
        }
    }

    pub(crate) fn from_seed_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        let users: Vec<AssignableUser> = serde_json::from_str(&raw)?;
        Ok(Self::new(users))
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn search(&self, query: &str) -> Result<Vec<AssignableUser>, RepositoryError> {
        let needle = query.to_lowercase();
        Ok(self
            .users
            .iter()
            .filter(|user| {
                user.name.to_lowercase().contains(&needle)
                    || user.email.to_lowercase().contains(&needle)
                    || user.id.0.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }
}

pub(crate) fn default_users() -> Vec<AssignableUser> {
    [
        ("stu-1001", "Aisha Khan", "aisha.khan", "Computer Science"),
        ("stu-1002", "Mateo Silva", "mateo.silva", "Mechanical Engineering"),
        ("stu-1003", "Hana Sato", "hana.sato", "Computer Science"),
        ("stu-1004", "Liam O'Connor", "liam.oconnor", "Economics"),
        ("stu-1005", "Zara Mensah", "zara.mensah", "Electrical Engineering"),
    ]
    .into_iter()
    .map(|(id, name, handle, department)| AssignableUser {
        id: UserId::from(id),
        name: name.to_string(),
        email: format!("{handle}@campus.example"),
        department: department.to_string(),
    })
    .collect()
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| format!("failed to parse '{raw}' as an RFC 3339 timestamp ({err})"))
}

pub(crate) fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_timestamp(&value).map_err(serde::de::Error::custom))
        .transpose()
}
