use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryApplicationRepository, InMemoryJobPostingRepository, InMemoryRoleDirectory,
};
use crate::routes::with_submission_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use coreica::config::AppConfig;
use coreica::error::AppError;
use coreica::telemetry;
use coreica::workflows::submissions::{
    EmailTemplates, IdentityId, LocalAttachmentStore, LogDispatcher, NotificationDispatcher,
    ResendDispatcher, SubmissionConfig, SubmissionPorts, SubmissionService,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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

    let submission_service = Arc::new(build_submission_service(&config)?);

    let app = with_submission_routes(submission_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "coreica submission service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn build_submission_service(config: &AppConfig) -> Result<SubmissionService, AppError> {
    let templates = EmailTemplates::new(config.mail.site_url.clone());
    let notifications: Arc<dyn NotificationDispatcher> = match &config.mail.api_key {
        Some(api_key) => Arc::new(ResendDispatcher::new(
            api_key.clone(),
            config.mail.from_address.clone(),
            templates,
            config.mail.timeout,
        )?),
        None => {
            warn!("RESEND_API_KEY not set; confirmation emails will only be logged");
            Arc::new(LogDispatcher::new(templates))
        }
    };

    let admins = config
        .submissions
        .admin_identities
        .iter()
        .copied()
        .map(IdentityId);

    let ports = SubmissionPorts {
        applications: Arc::new(InMemoryApplicationRepository::default()),
        job_postings: Arc::new(InMemoryJobPostingRepository::default()),
        roles: Arc::new(InMemoryRoleDirectory::with_admins(admins)),
        attachments: Arc::new(LocalAttachmentStore::new(&config.storage.resume_dir)),
        notifications,
    };

    let mut submission_config = SubmissionConfig::default();
    match i64::try_from(config.submissions.idempotency_window_minutes)
        .ok()
        .and_then(chrono::Duration::try_minutes)
    {
        Some(window) => submission_config.idempotency_window = window,
        None => warn!(
            minutes = config.submissions.idempotency_window_minutes,
            "idempotency window out of range; keeping the default"
        ),
    }

    info!(
        resume_dir = %config.storage.resume_dir.display(),
        admins = config.submissions.admin_identities.len(),
        "submission pipeline configured"
    );
    Ok(SubmissionService::new(ports, submission_config))
}
