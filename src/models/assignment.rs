// src/models/assignment.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::store::{Audit, Param, Record};

/// Status given to a freshly created assignment.
pub const STATUS_STARTED: &str = "started";

/// Represents the 'exam_assigns' table in the database.
/// Records that a user has been given an exam; one live row per (exam, user).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub user_id: Uuid,
    pub status: String,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Assignment {
    /// A started assignment where the user is both subject and actor.
    pub fn started(exam_id: Uuid, user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            exam_id,
            user_id,
            status: STATUS_STARTED.to_string(),
            audit: Audit::created(Some(user_id)),
        }
    }
}

impl Record for Assignment {
    const TABLE: &'static str = "exam_assigns";
    const SORTABLE: &'static [&'static str] = &["status"];

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
            ("exam_id", self.exam_id.into()),
            ("user_id", self.user_id.into()),
            ("status", self.status.clone().into()),
        ]
    }
}
