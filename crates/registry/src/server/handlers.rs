//! Axum request handlers for all service endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{
    ErrorResponse, FieldError, HealthResponse, ListQuery, RegisterRequest, RegisterResponse,
    StudentList,
};
use common::ServiceError;
use tracing::{error, warn};

use super::state::AppState;
use crate::crypto::KeySource;
use crate::registration::RegistrationError;
use crate::roster;
use crate::store::{StoreError, StudentFilter};

/// `POST /students`: validate, de-duplicate, encrypt and store a registration.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            return error_response(ServiceError::BadRequest(rejection.body_text()), Vec::new())
        }
    };

    let registrar = state.registrar.clone();
    let outcome = match tokio::task::spawn_blocking(move || registrar.register(&req)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "registration task failed");
            return error_response(ServiceError::Internal("registration failed".into()), Vec::new());
        }
    };

    match outcome {
        Ok(done) => {
            let body = RegisterResponse {
                registration_id: done.id,
                name: done.name,
                email: done.email,
                student_class: done.student_class,
                notification_sent: done.notification_sent,
            };
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Err(RegistrationError::Invalid(fields)) => error_response(
            ServiceError::Validation("registration form is invalid".into()),
            fields,
        ),
        Err(RegistrationError::Duplicate(dup)) => {
            let fields = dup.field_errors();
            error_response(ServiceError::Duplicate(dup.to_string()), fields)
        }
        Err(RegistrationError::Cipher(e)) => {
            warn!(error = %e, "encryption failed");
            error_response(ServiceError::EncryptionFailure("encryption failed".into()), Vec::new())
        }
        Err(RegistrationError::Store(e)) => store_failure(e),
    }
}

/// `GET /students`: students matching `class`, `q` and `since`, newest first,
/// with contact fields decrypted.
pub async fn list_students(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Response {
    let filter = match query
        .map_err(|rejection| rejection.body_text())
        .and_then(|Query(q)| student_filter(q))
    {
        Ok(f) => f,
        Err(msg) => return error_response(ServiceError::BadRequest(msg), Vec::new()),
    };

    let store = state.store.clone();
    let cipher = state.cipher.clone();
    let students = match blocking(move || {
        let rows = store.list(&filter)?;
        Ok(rows.iter().map(|s| roster::view(&cipher, s)).collect::<Vec<_>>())
    })
    .await
    {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let body = StudentList {
        total: students.len(),
        students,
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// `GET /students/:id`: one student with contact fields decrypted.
pub async fn get_student(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Response {
    let id = match id {
        Ok(Path(id)) => id,
        Err(rejection) => {
            return error_response(ServiceError::BadRequest(rejection.body_text()), Vec::new())
        }
    };

    let store = state.store.clone();
    let cipher = state.cipher.clone();
    let found = blocking(move || Ok(store.get(id)?.map(|s| roster::view(&cipher, &s))));
    match found.await {
        Ok(Some(view)) => (StatusCode::OK, Json(view)).into_response(),
        Ok(None) => student_not_found(id),
        Err(resp) => resp,
    }
}

/// `DELETE /students/:id`: remove a student record.
pub async fn delete_student(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Response {
    let id = match id {
        Ok(Path(id)) => id,
        Err(rejection) => {
            return error_response(ServiceError::BadRequest(rejection.body_text()), Vec::new())
        }
    };

    let store = state.store.clone();
    match blocking(move || store.delete(id)).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => student_not_found(id),
        Err(resp) => resp,
    }
}

/// `GET /health`: liveness and readiness check.
///
/// Returns `200 OK` while the store answers; `status` is `"degraded"` when the
/// encryption key is ephemeral. Returns `503 Service Unavailable` if the store
/// cannot be queried.
pub async fn health(State(state): State<AppState>) -> Response {
    let store = state.store.clone();
    let students = match blocking(move || store.count()).await {
        Ok(n) => n,
        Err(resp) => return resp,
    };

    let key_persistent = state.key_source == KeySource::Configured;
    let body = HealthResponse {
        status: if key_persistent { "ok" } else { "degraded" }.into(),
        key_persistent,
        students,
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Blank query values mean "no filter"; `since` must be a `YYYY-MM-DD` date.
fn student_filter(q: ListQuery) -> Result<StudentFilter, String> {
    let present = |v: Option<String>| v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty());
    let since = present(q.since);
    if let Some(date) = &since {
        if !is_iso_date(date) {
            return Err(format!("since must be a YYYY-MM-DD date, got {date:?}"));
        }
    }
    Ok(StudentFilter {
        class: present(q.class),
        search: present(q.q),
        since,
    })
}

fn is_iso_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b.iter().enumerate().all(|(i, c)| match i {
            4 | 7 => *c == b'-',
            _ => c.is_ascii_digit(),
        })
}

/// Run a store operation on the blocking pool, mapping failures to a response.
async fn blocking<T, F>(f: F) -> Result<T, Response>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(store_failure(e)),
        Err(e) => {
            error!(error = %e, "store task failed");
            Err(error_response(ServiceError::Internal("store task failed".into()), Vec::new()))
        }
    }
}

fn store_failure(e: StoreError) -> Response {
    error!(error = %e, "store operation failed");
    error_response(ServiceError::Unavailable("student store unavailable".into()), Vec::new())
}

fn student_not_found(id: i64) -> Response {
    error_response(ServiceError::NotFound(format!("student {id} does not exist")), Vec::new())
}

fn error_response(err: ServiceError, fields: Vec<FieldError>) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = ErrorResponse::new(err.code(), err.message()).with_fields(fields);
    (status, Json(body)).into_response()
}
