use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicationStatus, IntakeSubmission, RecordId};
use super::evaluation::{BureauCheck, DocumentaryReview, EvaluationError, IncomeReview};
use super::gateway::{DocumentStore, StoreError};
use super::pipeline::MigrationError;
use super::service::{CreditApplicationService, CreditServiceError};

type SharedService<S> = Arc<CreditApplicationService<S>>;

/// Router exposing intake migration, application lookups, status changes, and
/// evaluation updates.
pub fn credit_router<S>(service: SharedService<S>) -> Router
where
    S: DocumentStore + 'static,
{
    Router::new()
        .route("/api/v1/credit/migrations", post(migrate_handler::<S>))
        .route("/api/v1/credit/intakes", post(submit_intake_handler::<S>))
        .route(
            "/api/v1/credit/intakes/:intake_id/migrate",
            post(migrate_intake_handler::<S>),
        )
        .route(
            "/api/v1/credit/applications/:application_id",
            get(application_handler::<S>),
        )
        .route(
            "/api/v1/credit/applications/:application_id/status",
            post(status_handler::<S>),
        )
        .route(
            "/api/v1/credit/applications/:application_id/evaluation/documental",
            put(documentary_handler::<S>),
        )
        .route(
            "/api/v1/credit/applications/:application_id/evaluation/centrales",
            put(bureau_handler::<S>),
        )
        .route(
            "/api/v1/credit/applications/:application_id/evaluation/ingresos",
            put(income_handler::<S>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusChangeRequest {
    pub(crate) estado: ApplicationStatus,
}

pub(crate) async fn migrate_handler<S>(
    State(service): State<SharedService<S>>,
    Json(intake): Json<IntakeSubmission>,
) -> Response
where
    S: DocumentStore + 'static,
{
    match service.migrate(&intake) {
        Ok(report) => (StatusCode::CREATED, Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_intake_handler<S>(
    State(service): State<SharedService<S>>,
    Json(intake): Json<IntakeSubmission>,
) -> Response
where
    S: DocumentStore + 'static,
{
    match service.submit_intake(intake) {
        Ok(id) => (StatusCode::ACCEPTED, Json(json!({ "formulario_id": id }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn migrate_intake_handler<S>(
    State(service): State<SharedService<S>>,
    Path(intake_id): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
{
    match service.migrate_intake(&RecordId(intake_id)) {
        Ok(report) => (StatusCode::CREATED, Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn application_handler<S>(
    State(service): State<SharedService<S>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
{
    match service.application(&RecordId(application_id)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn status_handler<S>(
    State(service): State<SharedService<S>>,
    Path(application_id): Path<String>,
    Json(request): Json<StatusChangeRequest>,
) -> Response
where
    S: DocumentStore + 'static,
{
    match service.change_status(&RecordId(application_id), request.estado) {
        Ok(stored) => (StatusCode::OK, Json(stored)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn documentary_handler<S>(
    State(service): State<SharedService<S>>,
    Path(application_id): Path<String>,
    Json(review): Json<DocumentaryReview>,
) -> Response
where
    S: DocumentStore + 'static,
{
    match service.update_documentary(&RecordId(application_id), review) {
        Ok(stored) => (StatusCode::OK, Json(stored)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn bureau_handler<S>(
    State(service): State<SharedService<S>>,
    Path(application_id): Path<String>,
    Json(checks): Json<Vec<BureauCheck>>,
) -> Response
where
    S: DocumentStore + 'static,
{
    match service.update_bureau_checks(&RecordId(application_id), checks) {
        Ok(stored) => (StatusCode::OK, Json(stored)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn income_handler<S>(
    State(service): State<SharedService<S>>,
    Path(application_id): Path<String>,
    Json(review): Json<IncomeReview>,
) -> Response
where
    S: DocumentStore + 'static,
{
    match service.update_income(&RecordId(application_id), review) {
        Ok(stored) => (StatusCode::OK, Json(stored)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) fn error_status(err: &CreditServiceError) -> StatusCode {
    match err {
        CreditServiceError::Migration(failure) => match &failure.error {
            MigrationError::MissingSection(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MigrationError::Store(store) => store_status(store),
        },
        CreditServiceError::IntakeNotFound(_)
        | CreditServiceError::ApplicationNotFound(_)
        | CreditServiceError::Evaluation(EvaluationError::UnknownApplication(_)) => {
            StatusCode::NOT_FOUND
        }
        CreditServiceError::IntakeAlreadyMigrated { .. }
        | CreditServiceError::IntakeInProgress(_)
        | CreditServiceError::Transition(_) => StatusCode::CONFLICT,
        CreditServiceError::Evaluation(EvaluationError::Store(store))
        | CreditServiceError::Store(store) => store_status(store),
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::Serialization(_) | StoreError::NotAnObject(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(err: CreditServiceError) -> Response {
    let status = error_status(&err);
    let payload = match &err {
        CreditServiceError::Migration(failure) => json!({
            "error": err.to_string(),
            "mensaje": err.user_message(),
            "paso": failure.step,
            "registros_revertidos": failure.rollback.deleted.len(),
            "reversion_fallida": failure.rollback.failed,
        }),
        _ => json!({
            "error": err.to_string(),
            "mensaje": err.user_message(),
        }),
    };
    (status, Json(payload)).into_response()
}
