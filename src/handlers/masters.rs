// src/handlers/masters.rs

//! Lessons, classes and tags: flat name/description records sharing one set
//! of handlers, instantiated per type in the router.

use axum::{Extension, extract::State, response::IntoResponse};
use uuid::Uuid;

use crate::{
    error::AppError,
    handlers::{deleted, detail, inserted, listed, updated},
    models::master::{Master, MasterRequest},
    store::{Db, Lifecycle, ListParams},
    utils::{
        extract::{PathParams, ValidatedJson, ValidatedQuery},
        html::clean_html,
        jwt::Claims,
    },
};

pub async fn list<M: Master>(
    State(db): State<Db>,
    ValidatedQuery(params): ValidatedQuery<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = params.resolve::<M>()?;
    let store = db.store::<M>();

    let rows = store.list(&filter, &[]).await?;
    let total_page = store.total_pages(&filter, &[]).await?;

    Ok(listed(rows, total_page))
}

pub async fn get<M: Master>(
    State(db): State<Db>,
    PathParams(id): PathParams<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let row = db
        .store::<M>()
        .get(id)
        .await?
        .ok_or_else(AppError::data_not_found)?;

    Ok(detail(row))
}

pub async fn create<M: Master>(
    State(db): State<Db>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(payload): ValidatedJson<MasterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let row = M::new(
        payload.name,
        payload.description.as_deref().map(clean_html),
        Some(claims.user_id),
    );

    db.store::<M>().insert(&row).await.inspect_err(|e| {
        tracing::error!("Failed to create {}: {}", M::LABEL, e);
    })?;

    Ok(inserted(row))
}

pub async fn update<M: Master>(
    State(db): State<Db>,
    Extension(claims): Extension<Claims>,
    PathParams(id): PathParams<Uuid>,
    ValidatedJson(payload): ValidatedJson<MasterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let store = db.store::<M>();
    let mut row = store.get(id).await?.ok_or_else(AppError::data_not_found)?;

    row.set(payload.name, payload.description.as_deref().map(clean_html));
    row.audit_mut().touch(Some(claims.user_id));

    if !store.update(&row).await? {
        return Err(AppError::data_not_found());
    }

    Ok(updated(row))
}

pub async fn delete<M: Master>(
    State(db): State<Db>,
    Extension(claims): Extension<Claims>,
    PathParams(id): PathParams<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !db.store::<M>().mark_deleted(id, Some(claims.user_id)).await? {
        return Err(AppError::data_not_found());
    }

    tracing::info!("Deleted {} {}", M::LABEL, id);
    Ok(deleted())
}
