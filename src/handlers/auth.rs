// src/handlers/auth.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, User},
    store::{Condition, Db},
    utils::{extract::ValidatedJson, hash::verify_password, jwt::sign_jwt},
};

/// Authenticates a user and returns a JWT token.
///
/// The email is matched case-insensitively among live users. If the
/// password verifies, signs a token carrying the user's id and fullname.
pub async fn login(
    State(db): State<Db>,
    State(config): State<Config>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = db
        .store::<User>()
        .find_one(&[Condition::EqIgnoreCase("email", payload.email.trim().to_string())])
        .await
        .inspect_err(|e| tracing::error!("Login lookup failed: {}", e))?
        .ok_or_else(|| AppError::NotFound("Email is not found".to_string()))?;

    if !verify_password(&payload.password, &user.password) {
        return Err(AppError::BadRequest(
            "Email and password does not match".to_string(),
        ));
    }

    let token = sign_jwt(user.id, &user.fullname, &config.secret_key)?;
    tracing::info!("User {} signed in", user.id);

    Ok(Json(json!({ "token": token })))
}
