// src/seed.rs

use uuid::Uuid;

use crate::{
    config::Config,
    error::AppResult,
    models::{
        role::Role,
        user::{User, UserRole},
    },
    store::{Audit, Condition, Db},
    utils::hash::hash_password,
};

pub const SUPER_ADMIN_ROLE: &str = "super_admin";
pub const ADMIN_ROLE: &str = "admin";

async fn ensure_role(db: &Db, name: &str, description: &str) -> AppResult<Role> {
    let store = db.store::<Role>();
    if let Some(role) = store
        .find_one(&[Condition::EqIgnoreCase("name", name.to_string())])
        .await?
    {
        return Ok(role);
    }

    let role = Role::new(name.to_string(), Some(description.to_string()), None);
    store.insert(&role).await?;
    tracing::info!("Seeded role {}", name);
    Ok(role)
}

/// Creates the built-in roles and, when `ADMIN_EMAIL`/`ADMIN_PASSWORD` are
/// set, an admin user holding `super_admin`. Safe to run on every start.
pub async fn seed(db: &Db, config: &Config) -> AppResult<()> {
    let super_admin = ensure_role(db, SUPER_ADMIN_ROLE, "Full access").await?;
    ensure_role(db, ADMIN_ROLE, "Administration").await?;

    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    let users = db.store::<User>();
    if users
        .find_one(&[Condition::EqIgnoreCase("email", email.clone())])
        .await?
        .is_some()
    {
        return Ok(());
    }

    tracing::info!("Seeding admin user: {}", email);
    let admin = User {
        id: Uuid::new_v4(),
        email: email.clone(),
        fullname: "Administrator".to_string(),
        phone: None,
        address: None,
        password: hash_password(password)?,
        audit: Audit::created(None),
    };
    users.insert(&admin).await?;
    db.store::<UserRole>()
        .insert(&UserRole::new(admin.id, super_admin.id, None))
        .await?;

    tracing::info!("Admin user created successfully.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(email: Option<&str>) -> Config {
        Config {
            app_name: "exam-backend".to_string(),
            app_version: "test".to_string(),
            app_port: 0,
            app_env: "test".to_string(),
            database_url: String::new(),
            secret_key: "secret".to_string(),
            rust_log: "info".to_string(),
            admin_email: email.map(str::to_string),
            admin_password: Some("admin-password".to_string()),
        }
    }

    #[tokio::test]
    async fn seeding_twice_creates_everything_once() {
        let db = Db::memory();
        let config = config(Some("admin@example.com"));

        seed(&db, &config).await.unwrap();
        seed(&db, &config).await.unwrap();

        let roles = db.store::<Role>().find(&[]).await.unwrap();
        assert_eq!(roles.len(), 2);

        let users = db.store::<User>().find(&[]).await.unwrap();
        assert_eq!(users.len(), 1);

        let link = db
            .store::<UserRole>()
            .find_one(&[Condition::eq("user_id", users[0].id)])
            .await
            .unwrap()
            .unwrap();
        let super_admin = roles.iter().find(|r| r.name == SUPER_ADMIN_ROLE).unwrap();
        assert_eq!(link.role_id, super_admin.id);
    }

    #[tokio::test]
    async fn no_admin_without_credentials() {
        let db = Db::memory();
        seed(&db, &config(None)).await.unwrap();
        assert!(db.store::<User>().find(&[]).await.unwrap().is_empty());
    }
}
