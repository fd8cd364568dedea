use std::sync::Arc;

use axum::{
    extract::{
        rejection::JsonRejection, DefaultBodyLimit, FromRequestParts, Multipart, Path, State,
    },
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::attachment::{AttachmentPolicy, ResumeUpload};
use super::domain::{
    ApplicationForm, ApplicationId, ApplicationRecord, ApplicationStatus, IdempotencyKey,
    IdentityId, JobPostingForm, JobPostingRecord,
};
use super::service::{
    AccessError, ApplicationRequest, JobPostingRequest, SubmissionError, SubmissionReceipt,
    SubmissionService,
};

/// Header carrying the identity the upstream auth gateway authenticated.
pub const IDENTITY_HEADER: &str = "x-coreica-identity";
pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";

/// Headroom above the resume cap. Files past it are cut off and reported as too large.
pub const SUBMISSION_BODY_LIMIT: usize = 8 * 1024 * 1024;

const RESUME_FIELD: &str = "resume";

/// Router exposing applicant and job posting intake.
pub fn submission_router(service: Arc<SubmissionService>) -> Router {
    Router::new()
        .route("/api/v1/applications", post(submit_application_handler))
        .route(
            "/api/v1/applications/:application_id",
            get(application_status_handler),
        )
        .route(
            "/api/v1/applications/:application_id/review",
            post(review_application_handler),
        )
        .route("/api/v1/job-postings", post(submit_job_posting_handler))
        .layer(DefaultBodyLimit::max(SUBMISSION_BODY_LIMIT))
        .with_state(service)
}

/// Identity taken from [`IDENTITY_HEADER`]; requests without one are sent to sign in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedIdentity(pub IdentityId);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedIdentity
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(IDENTITY_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .map(|id| AuthenticatedIdentity(IdentityId(id)))
            .ok_or_else(|| {
                let payload = json!({
                    "error": "sign in to submit",
                    "kind": "unauthenticated",
                    "redirect": "/auth",
                });
                (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
            })
    }
}

fn idempotency_key(headers: &HeaderMap) -> Option<IdempotencyKey> {
    headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| IdempotencyKey(value.to_string()))
}

pub(crate) async fn submit_application_handler(
    State(service): State<Arc<SubmissionService>>,
    AuthenticatedIdentity(owner): AuthenticatedIdentity,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let policy = &service.config().attachments;
    let (form, resume) = match read_application_form(multipart, policy).await {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    let request = ApplicationRequest {
        owner,
        form,
        resume,
        idempotency_key: idempotency_key(&headers),
    };

    match service.submit_application(request).await {
        Ok(receipt) => application_created(receipt),
        Err(error) => submission_error_response(error),
    }
}

/// Split a multipart body into text fields and the optional resume part.
async fn read_application_form(
    mut multipart: Multipart,
    policy: &AttachmentPolicy,
) -> Result<(ApplicationForm, Option<ResumeUpload>), Response> {
    let mut form = ApplicationForm::default();
    let mut resume = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return Err(malformed_request(err.status(), err.body_text())),
        };
        let name = field.name().unwrap_or_default().to_string();

        if name == RESUME_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = match field.bytes().await {
                Ok(bytes) => bytes,
                Err(err) if err.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                    let rejection =
                        policy.reject_truncated(&file_name, SUBMISSION_BODY_LIMIT as u64);
                    return Err(submission_error_response(SubmissionError::Attachment(
                        rejection,
                    )));
                }
                Err(err) => return Err(malformed_request(err.status(), err.body_text())),
            };
            // Browsers send an empty part when no file was chosen.
            if !(file_name.is_empty() && bytes.is_empty()) {
                resume = Some(ResumeUpload::new(file_name, bytes.to_vec()));
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|err| malformed_request(err.status(), err.body_text()))?;
        form.set(&name, value);
    }

    Ok((form, resume))
}

pub(crate) async fn submit_job_posting_handler(
    State(service): State<Arc<SubmissionService>>,
    AuthenticatedIdentity(owner): AuthenticatedIdentity,
    headers: HeaderMap,
    body: Result<Json<JobPostingForm>, JsonRejection>,
) -> Response {
    let Json(form) = match body {
        Ok(form) => form,
        Err(rejection) => return malformed_request(rejection.status(), rejection.body_text()),
    };

    let request = JobPostingRequest {
        owner,
        form,
        idempotency_key: idempotency_key(&headers),
    };

    match service.submit_job_posting(request).await {
        Ok(receipt) => job_posting_created(receipt),
        Err(error) => submission_error_response(error),
    }
}

pub(crate) async fn application_status_handler(
    State(service): State<Arc<SubmissionService>>,
    AuthenticatedIdentity(viewer): AuthenticatedIdentity,
    Path(application_id): Path<String>,
) -> Response {
    let Some(id) = parse_application_id(&application_id) else {
        return access_error_response(AccessError::NotFound);
    };

    match service.application_status(&viewer, &id).await {
        Ok(record) => (StatusCode::OK, Json(record.status_view())).into_response(),
        Err(error) => access_error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewRequest {
    pub(crate) status: ApplicationStatus,
}

pub(crate) async fn review_application_handler(
    State(service): State<Arc<SubmissionService>>,
    AuthenticatedIdentity(reviewer): AuthenticatedIdentity,
    Path(application_id): Path<String>,
    body: Result<Json<ReviewRequest>, JsonRejection>,
) -> Response {
    let Json(review) = match body {
        Ok(review) => review,
        Err(rejection) => return malformed_request(rejection.status(), rejection.body_text()),
    };
    let Some(id) = parse_application_id(&application_id) else {
        return access_error_response(AccessError::NotFound);
    };

    match service
        .review_application(&reviewer, &id, review.status)
        .await
    {
        Ok(record) => (StatusCode::OK, Json(record.status_view())).into_response(),
        Err(error) => access_error_response(error),
    }
}

fn parse_application_id(raw: &str) -> Option<ApplicationId> {
    Uuid::parse_str(raw).ok().map(ApplicationId)
}

fn created_status(replayed: bool) -> StatusCode {
    if replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    }
}

fn application_created(receipt: SubmissionReceipt<ApplicationRecord>) -> Response {
    let record = &receipt.record;
    let payload = json!({
        "id": record.id,
        "status": record.status.label(),
        "created_at": record.created_at,
        "resume_attached": record.resume.is_some(),
        "replayed": receipt.replayed,
        "message": "Your application has been successfully submitted. We'll be in touch soon!",
        "redirect": "/",
    });
    (created_status(receipt.replayed), Json(payload)).into_response()
}

fn job_posting_created(receipt: SubmissionReceipt<JobPostingRecord>) -> Response {
    let record = &receipt.record;
    let payload = json!({
        "id": record.id,
        "is_active": record.is_active,
        "created_at": record.created_at,
        "replayed": receipt.replayed,
        "message": "Your job posting is now live! Check your email for confirmation.",
        "redirect": "/",
    });
    (created_status(receipt.replayed), Json(payload)).into_response()
}

pub(crate) fn submission_error_response(error: SubmissionError) -> Response {
    let mut payload = json!({
        "error": error.user_message(),
        "kind": error.kind(),
        "action": error.action().label(),
    });

    let status = match &error {
        SubmissionError::Validation(rejection) => {
            payload["violations"] = Value::Array(
                rejection
                    .violations
                    .iter()
                    .map(|violation| {
                        json!({
                            "field": violation.field,
                            "reason": violation.reason.code(),
                            "message": violation.to_string(),
                        })
                    })
                    .collect(),
            );
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SubmissionError::Attachment(rejection) => {
            payload["reason"] = json!(rejection.code());
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SubmissionError::Upload(_) | SubmissionError::Persistence(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    (status, Json(payload)).into_response()
}

fn access_error_response(error: AccessError) -> Response {
    let status = match &error {
        AccessError::NotFound => StatusCode::NOT_FOUND,
        AccessError::Forbidden => StatusCode::FORBIDDEN,
        AccessError::Repository(_) | AccessError::Roles(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

fn malformed_request(status: StatusCode, detail: String) -> Response {
    let payload = json!({
        "error": detail,
        "kind": "malformed_request",
        "action": "fix_input",
    });
    (status, Json(payload)).into_response()
}
