// src/models/role.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::store::{Audit, Param, Record};

/// Represents the 'roles' table in the database.
/// A named permission bucket; users hold at most one active role.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Role {
    pub fn new(name: String, description: Option<String>, actor: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            audit: Audit::created(actor),
        }
    }

    pub fn summary(&self) -> RoleSummary {
        RoleSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

impl Record for Role {
    const TABLE: &'static str = "roles";
    const SEARCH: &'static [&'static str] = &["name", "description"];
    const SORTABLE: &'static [&'static str] = &["name"];

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
            ("name", self.name.clone().into()),
            ("description", self.description.clone().into()),
        ]
    }
}

/// Represents the 'role_attributes' table in the database.
/// Typed extra fields an admin can attach to users of a role.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RoleAttribute {
    pub id: Uuid,
    pub role_id: Uuid,
    pub name: String,
    pub description: Option<String>,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl RoleAttribute {
    pub fn new(role_id: Uuid, input: &RoleAttributeInput, actor: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role_id,
            name: input.name.clone(),
            description: input.description.clone(),
            audit: Audit::created(actor),
        }
    }
}

impl Record for RoleAttribute {
    const TABLE: &'static str = "role_attributes";
    const SORTABLE: &'static [&'static str] = &["name"];

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
            ("role_id", self.role_id.into()),
            ("name", self.name.clone().into()),
            ("description", self.description.clone().into()),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleSummary {
    pub id: Uuid,
    pub name: String,
}

/// DTO for creating or updating a role together with its attributes.
#[derive(Debug, Deserialize, Validate)]
pub struct RoleRequest {
    #[validate(length(min = 1, max = 100, message = "Name length must be between 1 and 100 characters."))]
    pub name: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    #[serde(default)]
    #[validate(nested)]
    pub attributes: Vec<RoleAttributeInput>,
}

/// One attribute in a role payload. Entries without `id` are new.
#[derive(Debug, Deserialize, Validate)]
pub struct RoleAttributeInput {
    pub id: Option<Uuid>,

    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,
}
