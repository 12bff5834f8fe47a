use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryAssessmentRepository, InMemoryUserDirectory};
use crate::routes::with_assessment_routes;
use assessment_engine::clock::SystemClock;
use assessment_engine::config::AppConfig;
use assessment_engine::error::AppError;
use assessment_engine::telemetry;
use assessment_engine::workflows::assessments::{AssessmentPolicy, AssessmentService};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let directory = match &config.assessments.user_seed {
        Some(path) => {
            info!(path = %path.display(), "loading assignable users");
            InMemoryUserDirectory::from_seed_file(path)?
        }
        None => InMemoryUserDirectory::default(),
    };
    let policy = AssessmentPolicy {
        live_preview_by_default: config.assessments.live_preview,
    };
    let assessment_service = Arc::new(AssessmentService::with_policy(
        Arc::new(InMemoryAssessmentRepository::default()),
        Arc::new(directory),
        Arc::new(SystemClock),
        policy,
    ));

    let app = with_assessment_routes(assessment_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        live_preview = policy.live_preview_by_default,
        "assessment service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
