// src/handlers/exam_sessions.rs

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppError,
    handlers::detail,
    models::answer_record::SyncRequest,
    services::exam_session::{self, AssignOutcome},
    store::Db,
    utils::{
        extract::{PathParams, ValidatedJson},
        jwt::Claims,
    },
};

/// Assigns the exam to the caller: 201 on first call, 200 afterwards.
pub async fn assign_exam(
    State(db): State<Db>,
    Extension(claims): Extension<Claims>,
    PathParams(exam_id): PathParams<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = exam_session::assign(&db, exam_id, claims.user_id).await?;

    let (status, message) = match &outcome {
        AssignOutcome::Created(_) => (StatusCode::CREATED, "Data is successfully inserted"),
        AssignOutcome::Existing(_) => (StatusCode::OK, "Exam is already assigned"),
    };

    Ok((
        status,
        Json(json!({ "message": message, "data": outcome.assignment() })),
    ))
}

pub async fn list_assignments(
    State(db): State<Db>,
    PathParams(exam_id): PathParams<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(detail(exam_session::assignments(&db, exam_id).await?))
}

/// Checkpoints the caller's current answer set.
pub async fn sync_answers(
    State(db): State<Db>,
    Extension(claims): Extension<Claims>,
    PathParams(exam_id): PathParams<Uuid>,
    ValidatedJson(payload): ValidatedJson<SyncRequest>,
) -> Result<impl IntoResponse, AppError> {
    let summary = exam_session::sync(&db, exam_id, claims.user_id, &payload.answers)
        .await
        .inspect_err(|e| tracing::warn!("Sync rejected for exam {}: {}", exam_id, e))?;

    Ok(Json(json!({ "message": "Answers are successfully synced", "data": summary })))
}

pub async fn my_answers(
    State(db): State<Db>,
    Extension(claims): Extension<Claims>,
    PathParams(exam_id): PathParams<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(detail(
        exam_session::answer_records(&db, exam_id, claims.user_id).await?,
    ))
}
