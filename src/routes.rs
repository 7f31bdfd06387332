// src/routes.rs

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, exam_sessions, exams, masters, questions, roles, users, welcome},
    models::{class::Class, lesson::Lesson, master::Master, tag::Tag},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// CRUD routes for one lesson-like resource.
fn master_routes<M: Master>() -> Router<AppState> {
    Router::new()
        .route("/", get(masters::list::<M>).post(masters::create::<M>))
        .route(
            "/{id}",
            get(masters::get::<M>)
                .put(masters::update::<M>)
                .delete(masters::delete::<M>),
        )
}

async fn fallback() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Route is not found, seems like you are lost" })),
    )
}

/// Assembles the main application router.
///
/// * `GET /` and `POST /auth/login` are public.
/// * Everything else passes the access guard first.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(welcome::welcome))
        .route("/auth/login", post(auth::login));

    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route(
            "/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        );

    let role_routes = Router::new()
        .route("/", get(roles::list_roles).post(roles::create_role))
        .route(
            "/{id}",
            get(roles::get_role)
                .put(roles::update_role)
                .delete(roles::delete_role),
        );

    let question_routes = Router::new()
        .route("/", get(questions::list_questions).post(questions::create_question))
        .route(
            "/{id}",
            get(questions::get_question)
                .put(questions::update_question)
                .delete(questions::delete_question),
        );

    let exam_routes = Router::new()
        .route("/", get(exams::list_exams).post(exams::create_exam))
        .route(
            "/{id}",
            get(exams::get_exam)
                .put(exams::update_exam)
                .delete(exams::delete_exam),
        )
        .route(
            "/questions/{exam_id}",
            get(exams::list_exam_questions).post(exams::attach_exam_questions),
        )
        .route(
            "/questions/{exam_id}/{id}",
            delete(exams::detach_exam_question),
        )
        .route(
            "/assigns/{exam_id}",
            get(exam_sessions::list_assignments).post(exam_sessions::assign_exam),
        )
        .route(
            "/{id}/sync",
            get(exam_sessions::my_answers).post(exam_sessions::sync_answers),
        );

    let protected_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/roles", role_routes)
        .nest("/lessons", master_routes::<Lesson>())
        .nest("/classes", master_routes::<Class>())
        .nest("/tags", master_routes::<Tag>())
        .nest("/questions", question_routes)
        .nest("/exams", exam_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(fallback)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
