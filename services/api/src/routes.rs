use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use coreica::workflows::submissions::{submission_router, SubmissionService};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_submission_routes(service: Arc<SubmissionService>) -> axum::Router {
    submission_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{
        InMemoryApplicationRepository, InMemoryAttachmentStore, InMemoryJobPostingRepository,
        InMemoryRoleDirectory,
    };
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use coreica::workflows::submissions::{
        EmailTemplates, LogDispatcher, SubmissionConfig, SubmissionPorts, IDENTITY_HEADER,
    };
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn app(ready: bool) -> axum::Router {
        let ports = SubmissionPorts {
            applications: Arc::new(InMemoryApplicationRepository::default()),
            job_postings: Arc::new(InMemoryJobPostingRepository::default()),
            roles: Arc::new(InMemoryRoleDirectory::default()),
            attachments: Arc::new(InMemoryAttachmentStore::default()),
            notifications: Arc::new(LogDispatcher::new(EmailTemplates::new(
                "http://localhost:8080",
            ))),
        };
        let service = Arc::new(SubmissionService::new(ports, SubmissionConfig::default()));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        state.readiness.store(ready, Ordering::Release);

        with_submission_routes(service).layer(Extension(state))
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("body");
        serde_json::from_slice(&body).expect("json")
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = app(false)
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("dispatch");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_tracks_the_startup_flag() {
        let pending = app(false)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("dispatch");
        assert_eq!(pending.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(pending).await["status"], "initializing");

        let ready = app(true)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("dispatch");
        assert_eq!(ready.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_render_as_prometheus_text() {
        let response = app(true)
            .oneshot(Request::get("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("dispatch");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
            Some("text/plain; version=0.0.4")
        );
    }

    #[tokio::test]
    async fn submission_routes_are_mounted() {
        let response = app(true)
            .oneshot(
                Request::post("/api/v1/job-postings")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(IDENTITY_HEADER, Uuid::new_v4().to_string())
                    .body(Body::from(
                        json!({
                            "company_name": "Acme",
                            "role": "Lab Intern",
                            "job_type": "internship",
                            "description": "Support the R&D lab",
                            "contact_email": "hr@acme.test"
                        })
                        .to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("dispatch");

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(json_body(response).await["is_active"], true);
    }
}
