use crate::infra::{deserialize_optional_timestamp, AppState};
use crate::report::{build_report, AssessmentReport};
use assessment_engine::error::AppError;
use assessment_engine::workflows::assessments::{
    assessment_router, Assessment, AssessmentRepository, AssessmentService, Submission,
    UserDirectory,
};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct AssessmentReportRequest {
    pub(crate) assessment: Assessment,
    #[serde(default)]
    pub(crate) submissions: Vec<Submission>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub(crate) now: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) live_preview: bool,
}

pub(crate) fn with_assessment_routes<R, D>(service: Arc<AssessmentService<R, D>>) -> axum::Router
where
    R: AssessmentRepository + 'static,
    D: UserDirectory + 'static,
{
    assessment_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/reports/assessment",
            axum::routing::post(assessment_report_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Recompute cohort statistics for an exported assessment and its submissions.
pub(crate) async fn assessment_report_endpoint(
    Json(payload): Json<AssessmentReportRequest>,
) -> Result<Json<AssessmentReport>, AppError> {
    let AssessmentReportRequest {
        assessment,
        submissions,
        now,
        live_preview,
    } = payload;

    let now = now.unwrap_or_else(Utc::now);
    let report = build_report(&assessment, &submissions, now, live_preview)?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::{assessment, opens_at, submission};
    use axum::Json;
    use chrono::Duration;

    #[tokio::test]
    async fn report_endpoint_returns_ranked_cohort() {
        let request = AssessmentReportRequest {
            assessment: assessment(),
            submissions: vec![submission("stu-1001", 2, 5), submission("stu-1002", 2, 3)],
            now: Some(opens_at() + Duration::days(1)),
            live_preview: false,
        };

        let Json(body) = assessment_report_endpoint(Json(request))
            .await
            .expect("report builds");

        assert_eq!(body.state_label, "Completed");
        assert_eq!(body.stats.completion_rate, 100.0);
        assert_eq!(body.stats.distribution_counts(), vec![2, 0, 0, 0, 0]);
        assert_eq!(body.leaderboard[0].submission.student_id.0, "stu-1002");
    }

    #[tokio::test]
    async fn report_endpoint_maps_corrupt_data_to_server_error() {
        let mut foreign = submission("stu-1001", 1, 5);
        foreign.assessment_id.0 = "asm-999999".to_string();
        let request = AssessmentReportRequest {
            assessment: assessment(),
            submissions: vec![foreign],
            now: Some(opens_at() + Duration::days(1)),
            live_preview: false,
        };

        let err = assessment_report_endpoint(Json(request))
            .await
            .expect_err("foreign submission rejected");

        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn report_endpoint_refuses_windows_that_have_not_closed() {
        let upcoming = AssessmentReportRequest {
            assessment: assessment(),
            submissions: Vec::new(),
            now: Some(opens_at() - Duration::hours(1)),
            live_preview: true,
        };
        let err = assessment_report_endpoint(Json(upcoming))
            .await
            .expect_err("upcoming window refused");
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);

        let active = AssessmentReportRequest {
            assessment: assessment(),
            submissions: vec![submission("stu-1001", 2, 5)],
            now: Some(opens_at() + Duration::minutes(30)),
            live_preview: false,
        };
        let err = assessment_report_endpoint(Json(active))
            .await
            .expect_err("active window refused without preview");
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn report_endpoint_previews_open_window_without_leaderboard() {
        let request = AssessmentReportRequest {
            assessment: assessment(),
            submissions: vec![submission("stu-1001", 2, 5)],
            now: Some(opens_at() + Duration::minutes(30)),
            live_preview: true,
        };

        let Json(body) = assessment_report_endpoint(Json(request))
            .await
            .expect("preview builds");

        assert_eq!(body.state_label, "Active");
        assert_eq!(body.stats.total_completed, 1);
        assert!(body.leaderboard.is_empty());
    }

    #[test]
    fn report_request_parses_timestamps() {
        let raw = json!({
            "assessment": assessment(),
            "now": "2025-11-03T15:00:00Z",
        });

        let request: AssessmentReportRequest =
            serde_json::from_value(raw).expect("request parses");

        assert_eq!(request.now, Some(opens_at() + Duration::hours(1)));
        assert!(request.submissions.is_empty());
        assert!(!request.live_preview);
    }
}
