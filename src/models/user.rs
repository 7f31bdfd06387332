// src/models/user.rs

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    models::role::RoleSummary,
    store::{Audit, Param, Record},
};

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 \-]{5,19}$").expect("phone pattern compiles"));

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,

    /// Unique among live users, matched case-insensitively.
    pub email: String,

    pub fullname: String,
    pub phone: Option<String>,
    pub address: Option<String>,

    /// Argon2 password hash. Never leaves the process: responses go through `UserResponse`.
    pub password: String,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Record for User {
    const TABLE: &'static str = "users";
    const SEARCH: &'static [&'static str] = &["email", "fullname"];
    const SORTABLE: &'static [&'static str] = &["email", "fullname"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn audit(&self) -> &Audit {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn columns(&self) -> Vec<(&'static str, Param)> {
        vec![
            ("email", self.email.clone().into()),
            ("fullname", self.fullname.clone().into()),
            ("phone", self.phone.clone().into()),
            ("address", self.address.clone().into()),
            ("password", self.password.clone().into()),
        ]
    }
}

/// Represents the 'user_roles' table: the active role assignment of a user.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserRole {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl UserRole {
    pub fn new(user_id: Uuid, role_id: Uuid, actor: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            role_id,
            audit: Audit::created(actor),
        }
    }
}

impl Record for UserRole {
    const TABLE: &'static str = "user_roles";

    fn id(&self) -> Uuid {
        self.id
    }

    fn audit(&self) -> &Audit {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn columns(&self) -> Vec<(&'static str, Param)> {
        vec![
            ("user_id", self.user_id.into()),
            ("role_id", self.role_id.into()),
        ]
    }
}

/// Represents the 'user_values' table: a user's value for one role attribute.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserValue {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_attribute_id: Uuid,
    pub value: Option<String>,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl UserValue {
    pub fn new(user_id: Uuid, input: &UserValueInput, actor: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            role_attribute_id: input.role_attribute_id,
            value: input.value.clone(),
            audit: Audit::created(actor),
        }
    }
}

impl Record for UserValue {
    const TABLE: &'static str = "user_values";

    fn id(&self) -> Uuid {
        self.id
    }

    fn audit(&self) -> &Audit {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn columns(&self) -> Vec<(&'static str, Param)> {
        vec![
            ("user_id", self.user_id.into()),
            ("role_attribute_id", self.role_attribute_id.into()),
            ("value", self.value.clone().into()),
        ]
    }
}

/// Public view of a user (no password hash).
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub fullname: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            fullname: user.fullname.clone(),
            phone: user.phone.clone(),
            address: user.address.clone(),
            created_at: user.audit.created_at,
            updated_at: user.audit.updated_at,
        }
    }
}

/// User detail with role assignment and attribute values.
#[derive(Debug, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: UserResponse,
    pub role: Option<RoleSummary>,
    pub values: Vec<UserValue>,
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if PHONE.is_match(phone) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_phone"))
    }
}

/// DTO for creating a user.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "Email must be a valid address."))]
    pub email: String,

    #[validate(length(min = 1, max = 100, message = "Fullname length must be between 1 and 100 characters."))]
    pub fullname: String,

    #[validate(custom(function = validate_phone))]
    pub phone: Option<String>,

    #[validate(length(max = 500))]
    pub address: Option<String>,

    #[validate(length(min = 6, max = 128, message = "Password length must be between 6 and 128 characters."))]
    pub password: String,

    pub role_id: Option<Uuid>,

    #[serde(default)]
    pub values: Vec<UserValueInput>,
}

/// DTO for updating a user. The password is kept when omitted.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "Email must be a valid address."))]
    pub email: String,

    #[validate(length(min = 1, max = 100, message = "Fullname length must be between 1 and 100 characters."))]
    pub fullname: String,

    #[validate(custom(function = validate_phone))]
    pub phone: Option<String>,

    #[validate(length(max = 500))]
    pub address: Option<String>,

    #[validate(length(min = 6, max = 128, message = "Password length must be between 6 and 128 characters."))]
    pub password: Option<String>,

    pub role_id: Option<Uuid>,

    #[serde(default)]
    pub values: Vec<UserValueInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserValueInput {
    pub role_attribute_id: Uuid,
    pub value: Option<String>,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 255))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(phone: Option<&str>) -> CreateUserRequest {
        CreateUserRequest {
            email: "jane@example.com".to_string(),
            fullname: "Jane".to_string(),
            phone: phone.map(str::to_string),
            address: None,
            password: "secret123".to_string(),
            role_id: None,
            values: Vec::new(),
        }
    }

    #[test]
    fn phone_numbers_are_checked() {
        assert!(request(Some("+62 812-3456-7890")).validate().is_ok());
        assert!(request(None).validate().is_ok());
        assert!(request(Some("call me")).validate().is_err());
    }

    #[test]
    fn response_omits_password() {
        let user = User {
            id: Uuid::new_v4(),
            email: "jane@example.com".to_string(),
            fullname: "Jane".to_string(),
            phone: None,
            address: None,
            password: "$argon2id$hash".to_string(),
            audit: Audit::created(None),
        };
        let json = serde_json::to_value(UserResponse::from(&user)).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "jane@example.com");
    }
}
