use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::clock::FixedClock;
use crate::workflows::assessments::domain::{
    AnswerSheet, Assessment, AssessmentDraft, AssessmentId, AssignableUser, NewAssessment,
    Question, Submission, UserId,
};
use crate::workflows::assessments::repository::{
    AssessmentRepository, RepositoryError, UserDirectory,
};
use crate::workflows::assessments::scoring::percentage_of;
use crate::workflows::assessments::service::{AssessmentPolicy, AssessmentService};

pub(super) fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0)
        .single()
        .expect("valid instant")
}

/// Authoring instant used by most tests: one hour before the window opens.
pub(super) fn authoring_time() -> DateTime<Utc> {
    at(8, 0)
}

pub(super) fn window_open() -> DateTime<Utc> {
    at(9, 0)
}

pub(super) fn window_close() -> DateTime<Utc> {
    at(10, 0)
}

pub(super) fn question(text: &str, correct: i32) -> Question {
    Question {
        text: text.to_string(),
        options: vec![
            "Ownership".to_string(),
            "Borrowing".to_string(),
            "Lifetimes".to_string(),
            "Traits".to_string(),
        ],
        correct_option_index: Some(correct),
        explanation: format!("{text} is covered in week two."),
    }
}

pub(super) fn roster() -> Vec<UserId> {
    ["stu-ana", "stu-ben", "stu-chi", "stu-dev", "stu-eli"]
        .into_iter()
        .map(UserId::from)
        .collect()
}

/// Three questions keyed `[1, 2, 0]`, assigned to five students.
pub(super) fn draft() -> AssessmentDraft {
    AssessmentDraft {
        title: "Systems Programming Quiz".to_string(),
        description: "Checkpoint on memory management".to_string(),
        start_time: window_open(),
        end_time: window_close(),
        duration_minutes: 45,
        questions: vec![
            question("Which concept moves values?", 1),
            question("Which concept ties references to scopes?", 2),
            question("Which concept frees memory on drop?", 0),
        ],
        assigned_to: roster(),
    }
}

pub(super) fn author() -> UserId {
    UserId::from("alum-priya")
}

pub(super) fn assessment() -> Assessment {
    NewAssessment {
        draft: draft(),
        created_by: author(),
        created_at: authoring_time(),
    }
    .into_assessment(AssessmentId("asm-test".to_string()))
}

pub(super) fn answers(selected: &[i32]) -> BTreeMap<usize, i32> {
    selected.iter().copied().enumerate().collect()
}

pub(super) fn sheet(student: &str, selected: &[i32]) -> AnswerSheet {
    AnswerSheet {
        student_id: UserId::from(student),
        student_name: format!("Student {student}"),
        answers: answers(selected),
        time_taken_seconds: 600,
    }
}

/// Stored submission with an arbitrary percentage, for aggregation tests.
pub(super) fn submission_with(
    assessment: &Assessment,
    student: &str,
    score: u32,
    submitted_at: DateTime<Utc>,
) -> Submission {
    Submission {
        assessment_id: assessment.id.clone(),
        student_id: UserId::from(student),
        student_name: format!("Student {student}"),
        answers: BTreeMap::new(),
        score,
        total_marks: assessment.total_marks,
        percentage: percentage_of(score, assessment.total_marks),
        submitted_at,
        time_taken_seconds: 900,
    }
}

pub(super) fn directory_users() -> Vec<AssignableUser> {
    vec![
        AssignableUser {
            id: UserId::from("stu-ana"),
            name: "Ana Ortiz".to_string(),
            email: "ana@campus.example".to_string(),
            department: "Computer Science".to_string(),
        },
        AssignableUser {
            id: UserId::from("stu-ben"),
            name: "Ben Okafor".to_string(),
            email: "ben@campus.example".to_string(),
            department: "Electrical Engineering".to_string(),
        },
    ]
}

pub(super) struct Harness {
    pub(super) service: AssessmentService<MemoryRepository, MemoryDirectory>,
    pub(super) repository: Arc<MemoryRepository>,
    pub(super) directory: Arc<MemoryDirectory>,
    pub(super) clock: Arc<FixedClock>,
}

pub(super) fn build_service() -> Harness {
    build_service_with_policy(AssessmentPolicy::default())
}

pub(super) fn build_service_with_policy(policy: AssessmentPolicy) -> Harness {
    let repository = Arc::new(MemoryRepository::default());
    let directory = Arc::new(MemoryDirectory::with_users(directory_users()));
    let clock = Arc::new(FixedClock::new(authoring_time()));
    let service = AssessmentService::with_policy(
        repository.clone(),
        directory.clone(),
        clock.clone(),
        policy,
    );
    Harness {
        service,
        repository,
        directory,
        clock,
    }
}

impl Harness {
    pub(super) fn create(&self) -> Assessment {
        self.service
            .create_assessment(author(), draft())
            .expect("draft is valid")
    }

    pub(super) fn open_window(&self) {
        self.clock.set(window_open() + Duration::minutes(5));
    }

    pub(super) fn close_window(&self) {
        self.clock.set(window_close() + Duration::minutes(1));
    }
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    pub(super) assessments: Mutex<HashMap<AssessmentId, Assessment>>,
    pub(super) submissions: Mutex<Vec<Submission>>,
    sequence: AtomicUsize,
    pub(super) writes: AtomicUsize,
}

impl MemoryRepository {
    pub(super) fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl AssessmentRepository for MemoryRepository {
    fn create(&self, assessment: NewAssessment) -> Result<Assessment, RepositoryError> {
        let next = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = assessment.into_assessment(AssessmentId(format!("asm-{next}")));
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.assessments
            .lock()
            .expect("repository mutex poisoned")
            .insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    fn update(&self, assessment: Assessment) -> Result<(), RepositoryError> {
        let mut guard = self.assessments.lock().expect("repository mutex poisoned");
        if !guard.contains_key(&assessment.id) {
            return Err(RepositoryError::NotFound);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        guard.insert(assessment.id.clone(), assessment);
        Ok(())
    }

    fn delete(&self, id: &AssessmentId) -> Result<(), RepositoryError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.assessments
            .lock()
            .expect("repository mutex poisoned")
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn fetch(&self, id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError> {
        let guard = self.assessments.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list_by_author(&self, author: &UserId) -> Result<Vec<Assessment>, RepositoryError> {
        let guard = self.assessments.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|assessment| &assessment.created_by == author)
            .cloned()
            .collect())
    }

    fn list_assigned(&self, student: &UserId) -> Result<Vec<Assessment>, RepositoryError> {
        let guard = self.assessments.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|assessment| assessment.is_assigned(student))
            .cloned()
            .collect())
    }

    fn insert_submission(&self, submission: Submission) -> Result<Submission, RepositoryError> {
        let mut guard = self.submissions.lock().expect("submission mutex poisoned");
        let duplicate = guard.iter().any(|existing| {
            existing.assessment_id == submission.assessment_id
                && existing.student_id == submission.student_id
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        guard.push(submission.clone());
        Ok(submission)
    }

    fn submission_for(
        &self,
        assessment: &AssessmentId,
        student: &UserId,
    ) -> Result<Option<Submission>, RepositoryError> {
        let guard = self.submissions.lock().expect("submission mutex poisoned");
        Ok(guard
            .iter()
            .find(|s| &s.assessment_id == assessment && &s.student_id == student)
            .cloned())
    }

    fn submissions(&self, assessment: &AssessmentId) -> Result<Vec<Submission>, RepositoryError> {
        let guard = self.submissions.lock().expect("submission mutex poisoned");
        Ok(guard
            .iter()
            .filter(|s| &s.assessment_id == assessment)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(super) struct MemoryDirectory {
    users: Vec<AssignableUser>,
    calls: AtomicUsize,
}

impl MemoryDirectory {
    pub(super) fn with_users(users: Vec<AssignableUser>) -> Self {
        Self {
            users,
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl UserDirectory for MemoryDirectory {
    fn search(&self, query: &str) -> Result<Vec<AssignableUser>, RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let needle = query.to_ascii_lowercase();
        Ok(self
            .users
            .iter()
            .filter(|user| {
                user.name.to_ascii_lowercase().contains(&needle)
                    || user.email.to_ascii_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableRepository;

impl AssessmentRepository for UnavailableRepository {
    fn create(&self, _assessment: NewAssessment) -> Result<Assessment, RepositoryError> {
        Err(RepositoryError::Unavailable("datastore offline".to_string()))
    }

    fn update(&self, _assessment: Assessment) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("datastore offline".to_string()))
    }

    fn delete(&self, _id: &AssessmentId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("datastore offline".to_string()))
    }

    fn fetch(&self, _id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError> {
        Err(RepositoryError::Unavailable("datastore offline".to_string()))
    }

    fn list_by_author(&self, _author: &UserId) -> Result<Vec<Assessment>, RepositoryError> {
        Err(RepositoryError::Unavailable("datastore offline".to_string()))
    }

    fn list_assigned(&self, _student: &UserId) -> Result<Vec<Assessment>, RepositoryError> {
        Err(RepositoryError::Unavailable("datastore offline".to_string()))
    }

    fn insert_submission(&self, _submission: Submission) -> Result<Submission, RepositoryError> {
        Err(RepositoryError::Unavailable("datastore offline".to_string()))
    }

    fn submission_for(
        &self,
        _assessment: &AssessmentId,
        _student: &UserId,
    ) -> Result<Option<Submission>, RepositoryError> {
        Err(RepositoryError::Unavailable("datastore offline".to_string()))
    }

    fn submissions(&self, _assessment: &AssessmentId) -> Result<Vec<Submission>, RepositoryError> {
        Err(RepositoryError::Unavailable("datastore offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}
