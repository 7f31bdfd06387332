// src/handlers/welcome.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::config::Config;

/// Public landing route identifying the service.
pub async fn welcome(State(config): State<Config>) -> impl IntoResponse {
    Json(json!({
        "APP_NAME": format!("Welcome to {} service", config.app_name),
        "APP_VERSION": config.app_version,
    }))
}
