use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{AnswerSheet, AssessmentDraft, AssessmentId, AssessmentPatch, UserId};
use super::repository::{AssessmentRepository, RepositoryError, UserDirectory};
use super::service::{AssessmentService, AssessmentServiceError};

/// Router exposing authoring, submission, and insight endpoints.
pub fn assessment_router<R, D>(service: Arc<AssessmentService<R, D>>) -> Router
where
    R: AssessmentRepository + 'static,
    D: UserDirectory + 'static,
{
    Router::new()
        .route(
            "/api/v1/assessments",
            post(create_handler::<R, D>).get(list_handler::<R, D>),
        )
        .route(
            "/api/v1/assessments/:assessment_id",
            get(get_handler::<R, D>)
                .patch(update_handler::<R, D>)
                .delete(delete_handler::<R, D>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/paper",
            get(paper_handler::<R, D>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/submissions",
            post(submit_handler::<R, D>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/submissions/:student_id",
            get(result_handler::<R, D>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/insights",
            get(insights_handler::<R, D>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/results.csv",
            get(export_handler::<R, D>),
        )
        .route("/api/v1/users/search", get(search_handler::<R, D>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct CreateAssessmentRequest {
    pub created_by: UserId,
    #[serde(flatten)]
    pub draft: AssessmentDraft,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub author: Option<String>,
    pub student: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InsightsQuery {
    pub live_preview: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub(crate) async fn create_handler<R, D>(
    State(service): State<Arc<AssessmentService<R, D>>>,
    Json(request): Json<CreateAssessmentRequest>,
) -> Response
where
    R: AssessmentRepository + 'static,
    D: UserDirectory + 'static,
{
    match service.create_assessment(request.created_by, request.draft) {
        Ok(assessment) => (StatusCode::CREATED, Json(assessment)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<R, D>(
    State(service): State<Arc<AssessmentService<R, D>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: AssessmentRepository + 'static,
    D: UserDirectory + 'static,
{
    let listing = match (query.author, query.student) {
        (Some(author), None) => service.list_for_author(&UserId(author)),
        (None, Some(student)) => service.list_for_student(&UserId(student)),
        _ => {
            let payload = json!({
                "error": "exactly one of `author` or `student` is required",
            });
            return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
        }
    };

    match listing {
        Ok(summaries) => (StatusCode::OK, Json(summaries)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_handler<R, D>(
    State(service): State<Arc<AssessmentService<R, D>>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    D: UserDirectory + 'static,
{
    match service.get_assessment(&AssessmentId(assessment_id)) {
        Ok(assessment) => (StatusCode::OK, Json(assessment)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_handler<R, D>(
    State(service): State<Arc<AssessmentService<R, D>>>,
    Path(assessment_id): Path<String>,
    Json(patch): Json<AssessmentPatch>,
) -> Response
where
    R: AssessmentRepository + 'static,
    D: UserDirectory + 'static,
{
    match service.update_assessment(&AssessmentId(assessment_id), patch) {
        Ok(assessment) => (StatusCode::OK, Json(assessment)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_handler<R, D>(
    State(service): State<Arc<AssessmentService<R, D>>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    D: UserDirectory + 'static,
{
    match service.delete_assessment(&AssessmentId(assessment_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn paper_handler<R, D>(
    State(service): State<Arc<AssessmentService<R, D>>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    D: UserDirectory + 'static,
{
    match service.student_paper(&AssessmentId(assessment_id)) {
        Ok(paper) => (StatusCode::OK, Json(paper)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_handler<R, D>(
    State(service): State<Arc<AssessmentService<R, D>>>,
    Path(assessment_id): Path<String>,
    Json(sheet): Json<AnswerSheet>,
) -> Response
where
    R: AssessmentRepository + 'static,
    D: UserDirectory + 'static,
{
    match service.submit_answers(&AssessmentId(assessment_id), sheet) {
        Ok(submission) => {
            let payload = json!({
                "grade": submission.grade().label(),
                "display_percentage": submission.display_percentage(),
                "submission": submission,
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn result_handler<R, D>(
    State(service): State<Arc<AssessmentService<R, D>>>,
    Path((assessment_id, student_id)): Path<(String, String)>,
) -> Response
where
    R: AssessmentRepository + 'static,
    D: UserDirectory + 'static,
{
    match service.student_result(&AssessmentId(assessment_id), &UserId(student_id)) {
        Ok(submission) => {
            let payload = json!({
                "grade": submission.grade().label(),
                "display_percentage": submission.display_percentage(),
                "submission": submission,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn insights_handler<R, D>(
    State(service): State<Arc<AssessmentService<R, D>>>,
    Path(assessment_id): Path<String>,
    Query(query): Query<InsightsQuery>,
) -> Response
where
    R: AssessmentRepository + 'static,
    D: UserDirectory + 'static,
{
    let live_preview = query
        .live_preview
        .unwrap_or(service.policy().live_preview_by_default);
    match service.get_insights(&AssessmentId(assessment_id), live_preview) {
        Ok(insights) => (StatusCode::OK, Json(insights)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn export_handler<R, D>(
    State(service): State<Arc<AssessmentService<R, D>>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    D: UserDirectory + 'static,
{
    match service.export_results_csv(&AssessmentId(assessment_id)) {
        Ok(csv) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            csv,
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn search_handler<R, D>(
    State(service): State<Arc<AssessmentService<R, D>>>,
    Query(query): Query<SearchQuery>,
) -> Response
where
    R: AssessmentRepository + 'static,
    D: UserDirectory + 'static,
{
    match service.search_assignable_users(&query.q) {
        Ok(users) => (StatusCode::OK, Json(users)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Status code for a service failure.
pub fn status_for(err: &AssessmentServiceError) -> StatusCode {
    match err {
        AssessmentServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AssessmentServiceError::StateConflict(_) => StatusCode::CONFLICT,
        AssessmentServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        AssessmentServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        AssessmentServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        AssessmentServiceError::Computation(_) | AssessmentServiceError::Export(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn error_response(err: AssessmentServiceError) -> Response {
    let status = status_for(&err);
    let payload = match &err {
        AssessmentServiceError::Validation(errors) => {
            let details: Vec<_> = errors
                .errors()
                .iter()
                .map(|violation| {
                    json!({
                        "field": violation.field(),
                        "message": violation.to_string(),
                    })
                })
                .collect();
            json!({
                "error": "assessment failed validation",
                "errors": details,
            })
        }
        AssessmentServiceError::Computation(_) | AssessmentServiceError::Export(_) => {
            error!(error = %err, "assessment request failed");
            json!({ "error": err.to_string() })
        }
        _ => json!({ "error": err.to_string() }),
    };
    (status, Json(payload)).into_response()
}
