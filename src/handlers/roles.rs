// src/handlers/roles.rs

use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppError,
    handlers::{deleted, inserted, listed, updated},
    models::role::{Role, RoleAttribute, RoleAttributeInput, RoleRequest},
    store::{Condition, Db, Lifecycle, ListParams, reconcile::reconcile},
    utils::{
        extract::{PathParams, ValidatedJson, ValidatedQuery},
        html::clean_html,
        jwt::Claims,
    },
};

async fn attributes_of(db: &Db, role_id: Uuid) -> Result<Vec<RoleAttribute>, AppError> {
    db.store::<RoleAttribute>()
        .find(&[Condition::eq("role_id", role_id)])
        .await
}

pub async fn list_roles(
    State(db): State<Db>,
    ValidatedQuery(params): ValidatedQuery<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = params.resolve::<Role>()?;
    let store = db.store::<Role>();

    let roles = store.list(&filter, &[]).await?;
    let total_page = store.total_pages(&filter, &[]).await?;

    Ok(listed(roles, total_page))
}

/// Role detail; its attributes travel beside `data`.
pub async fn get_role(
    State(db): State<Db>,
    PathParams(id): PathParams<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let role = db
        .store::<Role>()
        .get(id)
        .await?
        .ok_or_else(AppError::data_not_found)?;
    let attributes = attributes_of(&db, role.id).await?;

    Ok(Json(json!({ "data": role, "attributes": attributes })))
}

pub async fn create_role(
    State(db): State<Db>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(payload): ValidatedJson<RoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Some(claims.user_id);
    let role = Role::new(
        payload.name,
        payload.description.as_deref().map(clean_html),
        actor,
    );

    db.store::<Role>().insert(&role).await.inspect_err(|e| {
        tracing::error!("Failed to create role: {}", e);
    })?;

    let attribute_store = db.store::<RoleAttribute>();
    let mut attributes = Vec::with_capacity(payload.attributes.len());
    for input in &payload.attributes {
        let attribute = RoleAttribute::new(role.id, input, actor);
        attribute_store.insert(&attribute).await?;
        attributes.push(attribute);
    }

    Ok(inserted(json!({ "role": role, "attributes": attributes })))
}

/// Updates a role and reconciles its attributes by id.
pub async fn update_role(
    State(db): State<Db>,
    Extension(claims): Extension<Claims>,
    PathParams(id): PathParams<Uuid>,
    ValidatedJson(payload): ValidatedJson<RoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Some(claims.user_id);
    let store = db.store::<Role>();
    let mut role = store.get(id).await?.ok_or_else(AppError::data_not_found)?;

    role.name = payload.name;
    role.description = payload.description.as_deref().map(clean_html);
    role.audit.touch(actor);
    if !store.update(&role).await? {
        return Err(AppError::data_not_found());
    }

    let attribute_store = db.store::<RoleAttribute>();
    let existing = attributes_of(&db, role.id).await?;
    let plan = reconcile(
        &existing,
        &payload.attributes,
        |row: &RoleAttribute| row.id,
        |input: &RoleAttributeInput| input.id,
    );

    for row in plan.removed {
        attribute_store.mark_deleted(row.id, actor).await?;
    }
    for (row, input) in plan.retained {
        let mut row = row.clone();
        row.name = input.name.clone();
        row.description = input.description.clone();
        row.audit.touch(actor);
        attribute_store.update(&row).await?;
    }
    for input in plan.added {
        attribute_store
            .insert(&RoleAttribute::new(role.id, input, actor))
            .await?;
    }

    let attributes = attributes_of(&db, role.id).await?;
    Ok(updated(json!({ "role": role, "attributes": attributes })))
}

/// Soft-deletes a role and its attributes.
pub async fn delete_role(
    State(db): State<Db>,
    Extension(claims): Extension<Claims>,
    PathParams(id): PathParams<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Some(claims.user_id);
    if !db.store::<Role>().mark_deleted(id, actor).await? {
        return Err(AppError::data_not_found());
    }

    db.store::<RoleAttribute>()
        .mark_deleted_where(&[Condition::eq("role_id", id)], actor)
        .await?;

    tracing::info!("Deleted role {}", id);
    Ok(deleted())
}
