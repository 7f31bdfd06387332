// src/models/answer_record.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::store::{Audit, Param, Record};

/// Represents the 'user_answers' table in the database.
/// What a user answered for one exam question; one live row per
/// (exam_question_id, user_id), overwritten on every sync.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub exam_question_id: Uuid,
    pub question_id: Uuid,
    pub user_id: Uuid,

    /// Chosen answer option, if any.
    pub answer_id: Option<Uuid>,

    /// Free-text answer, if any.
    pub answer: Option<String>,

    /// Points of the chosen option; null until a free-text answer is corrected.
    pub correction_points: Option<i32>,

    pub answered_at: DateTime<Utc>,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Record for AnswerRecord {
    const TABLE: &'static str = "user_answers";
    const SORTABLE: &'static [&'static str] = &["answered_at"];

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
            ("exam_question_id", self.exam_question_id.into()),
            ("question_id", self.question_id.into()),
            ("user_id", self.user_id.into()),
            ("answer_id", self.answer_id.into()),
            ("answer", self.answer.clone().into()),
            ("correction_points", self.correction_points.into()),
            ("answered_at", self.answered_at.into()),
        ]
    }
}

/// One answer in a sync checkpoint.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SyncItem {
    pub exam_question_id: Uuid,
    pub answer_id: Option<Uuid>,

    #[validate(length(max = 10000))]
    pub answer: Option<String>,

    /// Client-side time of the answer; defaults to the time of the sync.
    pub answered_at: Option<DateTime<Utc>>,
}

/// DTO for `POST /exams/{exam_id}/sync`: the client's full current answer set.
#[derive(Debug, Deserialize, Validate)]
pub struct SyncRequest {
    #[validate(nested)]
    pub answers: Vec<SyncItem>,
}

/// Outcome of one sync call.
#[derive(Debug, Serialize)]
pub struct SyncSummary {
    pub inserted: usize,
    pub updated: usize,
    pub records: Vec<AnswerRecord>,
}
