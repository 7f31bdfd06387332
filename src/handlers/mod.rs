// src/handlers/mod.rs

pub mod auth;
pub mod exam_sessions;
pub mod exams;
pub mod masters;
pub mod questions;
pub mod roles;
pub mod users;
pub mod welcome;

use axum::{Json, http::StatusCode};
use serde::Serialize;
use serde_json::{Value, json};

// Response envelopes shared by every resource.

pub(crate) fn listed<T: Serialize>(data: T, total_page: i64) -> Json<Value> {
    Json(json!({ "data": data, "totalPage": total_page }))
}

pub(crate) fn detail<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "data": data }))
}

pub(crate) fn inserted<T: Serialize>(data: T) -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({ "message": "Data is successfully inserted", "data": data })),
    )
}

pub(crate) fn updated<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "message": "Data is successfully updated", "data": data }))
}

pub(crate) fn deleted() -> Json<Value> {
    Json(json!({ "message": "Data is successfully deleted" }))
}
