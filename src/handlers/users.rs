// src/handlers/users.rs

use axum::{Extension, extract::State, response::IntoResponse};
use uuid::Uuid;

use crate::{
    error::AppError,
    handlers::{deleted, detail, inserted, listed, updated},
    models::{
        role::Role,
        user::{
            CreateUserRequest, UpdateUserRequest, User, UserDetail, UserResponse, UserRole,
            UserValue, UserValueInput,
        },
    },
    store::{Audit, Condition, Db, Lifecycle, ListParams, reconcile::reconcile},
    utils::{
        extract::{PathParams, ValidatedJson, ValidatedQuery},
        hash::hash_password,
        jwt::Claims,
    },
};

/// Rejects an email already held by another live user.
async fn ensure_email_free(db: &Db, email: &str, owner: Option<Uuid>) -> Result<(), AppError> {
    let holder = db
        .store::<User>()
        .find_one(&[Condition::EqIgnoreCase("email", email.to_string())])
        .await?;

    match holder {
        Some(user) if Some(user.id) != owner => {
            Err(AppError::Conflict("Email is already registered".to_string()))
        }
        _ => Ok(()),
    }
}

async fn ensure_role(db: &Db, role_id: Option<Uuid>) -> Result<(), AppError> {
    let Some(role_id) = role_id else {
        return Ok(());
    };
    if db.store::<Role>().get(role_id).await?.is_none() {
        return Err(AppError::BadRequest("Role is not found".to_string()));
    }
    Ok(())
}

async fn user_detail(db: &Db, user: &User) -> Result<UserDetail, AppError> {
    let by_user = [Condition::eq("user_id", user.id)];

    let role = match db.store::<UserRole>().find_one(&by_user).await? {
        Some(link) => db.store::<Role>().get(link.role_id).await?.map(|r| r.summary()),
        None => None,
    };
    let values = db.store::<UserValue>().find(&by_user).await?;

    Ok(UserDetail {
        user: UserResponse::from(user),
        role,
        values,
    })
}

pub async fn list_users(
    State(db): State<Db>,
    ValidatedQuery(params): ValidatedQuery<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = params.resolve::<User>()?;
    let store = db.store::<User>();

    let users: Vec<UserResponse> = store
        .list(&filter, &[])
        .await?
        .iter()
        .map(UserResponse::from)
        .collect();
    let total_page = store.total_pages(&filter, &[]).await?;

    Ok(listed(users, total_page))
}

pub async fn get_user(
    State(db): State<Db>,
    PathParams(id): PathParams<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = db
        .store::<User>()
        .get(id)
        .await?
        .ok_or_else(AppError::data_not_found)?;

    Ok(detail(user_detail(&db, &user).await?))
}

/// Creates a user with an optional role and attribute values.
///
/// Hashes the password using Argon2 before storing it.
pub async fn create_user(
    State(db): State<Db>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Some(claims.user_id);
    let email = payload.email.trim().to_string();

    ensure_email_free(&db, &email, None).await?;
    ensure_role(&db, payload.role_id).await?;

    let user = User {
        id: Uuid::new_v4(),
        email,
        fullname: payload.fullname,
        phone: payload.phone,
        address: payload.address,
        password: hash_password(&payload.password)?,
        audit: Audit::created(actor),
    };

    db.store::<User>().insert(&user).await.inspect_err(|e| {
        tracing::error!("Failed to create user: {}", e);
    })?;

    if let Some(role_id) = payload.role_id {
        db.store::<UserRole>()
            .insert(&UserRole::new(user.id, role_id, actor))
            .await?;
    }

    let value_store = db.store::<UserValue>();
    for input in &payload.values {
        value_store.insert(&UserValue::new(user.id, input, actor)).await?;
    }

    tracing::info!("Created user {}", user.id);
    Ok(inserted(user_detail(&db, &user).await?))
}

/// Updates a user and reconciles the role link and attribute values.
pub async fn update_user(
    State(db): State<Db>,
    Extension(claims): Extension<Claims>,
    PathParams(id): PathParams<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Some(claims.user_id);
    let store = db.store::<User>();
    let mut user = store.get(id).await?.ok_or_else(AppError::data_not_found)?;

    let email = payload.email.trim().to_string();
    ensure_email_free(&db, &email, Some(user.id)).await?;
    ensure_role(&db, payload.role_id).await?;

    user.email = email;
    user.fullname = payload.fullname;
    user.phone = payload.phone;
    user.address = payload.address;
    if let Some(password) = payload.password.as_deref() {
        user.password = hash_password(password)?;
    }
    user.audit.touch(actor);

    if !store.update(&user).await? {
        return Err(AppError::data_not_found());
    }

    // Role link: at most one live row, replaced when the role changes.
    let role_store = db.store::<UserRole>();
    let by_user = [Condition::eq("user_id", user.id)];
    let links = role_store.find(&by_user).await?;
    let wanted: Vec<Uuid> = payload.role_id.into_iter().collect();
    let plan = reconcile(&links, &wanted, |link: &UserRole| link.role_id, |id: &Uuid| Some(*id));
    for link in plan.removed {
        role_store.mark_deleted(link.id, actor).await?;
    }
    for role_id in plan.added {
        role_store.insert(&UserRole::new(user.id, *role_id, actor)).await?;
    }

    let value_store = db.store::<UserValue>();
    let values = value_store.find(&by_user).await?;
    let plan = reconcile(
        &values,
        &payload.values,
        |value: &UserValue| value.role_attribute_id,
        |input: &UserValueInput| Some(input.role_attribute_id),
    );
    for value in plan.removed {
        value_store.mark_deleted(value.id, actor).await?;
    }
    for (value, input) in plan.retained {
        if value.value != input.value {
            let mut value = value.clone();
            value.value = input.value.clone();
            value.audit.touch(actor);
            value_store.update(&value).await?;
        }
    }
    for input in plan.added {
        value_store.insert(&UserValue::new(user.id, input, actor)).await?;
    }

    Ok(updated(user_detail(&db, &user).await?))
}

/// Soft-deletes a user with its role link and values. Users cannot delete
/// themselves.
pub async fn delete_user(
    State(db): State<Db>,
    Extension(claims): Extension<Claims>,
    PathParams(id): PathParams<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if id == claims.user_id {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let actor = Some(claims.user_id);
    if !db.store::<User>().mark_deleted(id, actor).await? {
        return Err(AppError::data_not_found());
    }

    let by_user = [Condition::eq("user_id", id)];
    db.store::<UserRole>().mark_deleted_where(&by_user, actor).await?;
    db.store::<UserValue>().mark_deleted_where(&by_user, actor).await?;

    tracing::info!("Deleted user {}", id);
    Ok(deleted())
}
