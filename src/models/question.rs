// src/models/question.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::master::MasterSummary,
    store::{Audit, Param, Record},
    utils::html::clean_html,
};

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub lesson_id: Uuid,

    /// Mapped from the database column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub question_type: String,

    /// The (sanitized) question text.
    pub question: String,

    pub points: i32,

    /// JSON array of tag ids.
    pub tags: String,

    /// JSON array of `Attachment`.
    pub attachments: String,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Question {
    pub fn new(req: &QuestionRequest, actor: Option<Uuid>) -> AppResult<Self> {
        let mut question = Self {
            id: Uuid::new_v4(),
            lesson_id: req.lesson_id,
            question_type: String::new(),
            question: String::new(),
            points: 0,
            tags: String::new(),
            attachments: String::new(),
            audit: Audit::created(actor),
        };
        question.apply(req)?;
        Ok(question)
    }

    /// Copies the request onto the row; tags and attachments are stored as
    /// JSON text.
    pub fn apply(&mut self, req: &QuestionRequest) -> AppResult<()> {
        self.lesson_id = req.lesson_id;
        self.question_type = req.question_type.clone();
        self.question = clean_html(&req.question);
        self.points = req.points;
        self.tags = serde_json::to_string(&req.tag_ids())?;
        self.attachments = serde_json::to_string(&req.attachments)?;
        Ok(())
    }

    pub fn tag_ids(&self) -> AppResult<Vec<Uuid>> {
        Ok(serde_json::from_str(&self.tags)?)
    }

    pub fn attachment_list(&self) -> AppResult<Vec<Attachment>> {
        Ok(serde_json::from_str(&self.attachments)?)
    }
}

impl Record for Question {
    const TABLE: &'static str = "questions";
    const SEARCH: &'static [&'static str] = &["question"];
    const SORTABLE: &'static [&'static str] = &["type", "points"];

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
            ("lesson_id", self.lesson_id.into()),
            ("type", self.question_type.clone().into()),
            ("question", self.question.clone().into()),
            ("points", self.points.into()),
            ("tags", self.tags.clone().into()),
            ("attachments", self.attachments.clone().into()),
        ]
    }
}

/// Represents the 'answers' table: one option of a question.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub id: Uuid,
    pub question_id: Uuid,
    pub answer: String,
    pub points: i32,
    pub is_correct: bool,

    /// JSON array of `Attachment`.
    pub attachments: String,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Answer {
    pub fn new(question_id: Uuid, input: &AnswerInput, actor: Option<Uuid>) -> AppResult<Self> {
        let mut answer = Self {
            id: Uuid::new_v4(),
            question_id,
            answer: String::new(),
            points: 0,
            is_correct: false,
            attachments: String::new(),
            audit: Audit::created(actor),
        };
        answer.apply(input)?;
        Ok(answer)
    }

    pub fn apply(&mut self, input: &AnswerInput) -> AppResult<()> {
        self.answer = clean_html(&input.answer);
        self.points = input.points;
        self.is_correct = input.is_correct;
        self.attachments = serde_json::to_string(&input.attachments)?;
        Ok(())
    }
}

impl Record for Answer {
    const TABLE: &'static str = "answers";
    const SEARCH: &'static [&'static str] = &["answer"];
    const SORTABLE: &'static [&'static str] = &["points"];

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
            ("question_id", self.question_id.into()),
            ("answer", self.answer.clone().into()),
            ("points", self.points.into()),
            ("is_correct", self.is_correct.into()),
            ("attachments", self.attachments.clone().into()),
        ]
    }
}

/// File descriptor attached to a question or answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Attachment {
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
    pub filesize: Option<String>,
    pub filetype: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagRef {
    pub tag_id: Uuid,
}

/// DTO for creating or updating a question with its answers.
#[derive(Debug, Deserialize, Validate)]
pub struct QuestionRequest {
    pub lesson_id: Uuid,

    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 20))]
    pub question_type: String,

    #[validate(length(min = 1, max = 10000))]
    pub question: String,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub points: i32,

    #[serde(default)]
    pub tags: Vec<TagRef>,

    #[serde(default)]
    #[validate(nested)]
    pub attachments: Vec<Attachment>,

    #[serde(default)]
    #[validate(nested)]
    pub answers: Vec<AnswerInput>,
}

impl QuestionRequest {
    /// Requested tag ids, first occurrence kept.
    pub fn tag_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = Vec::with_capacity(self.tags.len());
        for tag in &self.tags {
            if !ids.contains(&tag.tag_id) {
                ids.push(tag.tag_id);
            }
        }
        ids
    }
}

/// One answer in a question payload. Entries without `id` are new.
#[derive(Debug, Deserialize, Validate)]
pub struct AnswerInput {
    pub id: Option<Uuid>,

    #[validate(length(min = 1, max = 5000))]
    pub answer: String,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub points: i32,

    #[serde(default)]
    pub is_correct: bool,

    #[serde(default)]
    #[validate(nested)]
    pub attachments: Vec<Attachment>,
}

/// Public view of an answer with its attachments decoded.
#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub id: Uuid,
    pub question_id: Uuid,
    pub answer: String,
    pub points: i32,
    pub is_correct: bool,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AnswerResponse {
    pub fn from_answer(answer: &Answer) -> AppResult<Self> {
        Ok(Self {
            id: answer.id,
            question_id: answer.question_id,
            answer: answer.answer.clone(),
            points: answer.points,
            is_correct: answer.is_correct,
            attachments: serde_json::from_str(&answer.attachments)?,
            created_at: answer.audit.created_at,
            updated_at: answer.audit.updated_at,
        })
    }
}

/// Public view of a question with its serialized lists decoded.
#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub lesson: Option<MasterSummary>,
    #[serde(rename = "type")]
    pub question_type: String,
    pub question: String,
    pub points: i32,
    pub tags: Vec<Uuid>,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<AnswerResponse>>,
}

impl QuestionResponse {
    pub fn build(question: &Question, lesson: Option<MasterSummary>) -> AppResult<Self> {
        Ok(Self {
            id: question.id,
            lesson_id: question.lesson_id,
            lesson,
            question_type: question.question_type.clone(),
            question: question.question.clone(),
            points: question.points,
            tags: question.tag_ids()?,
            attachments: question.attachment_list()?,
            created_at: question.audit.created_at,
            updated_at: question.audit.updated_at,
            answers: None,
        })
    }
}

/// Compact question view embedded in exam question listings.
#[derive(Debug, Serialize)]
pub struct QuestionSummary {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub question: String,
    pub points: i32,
    pub tags: Vec<Uuid>,
}

impl QuestionSummary {
    pub fn from_question(question: &Question) -> AppResult<Self> {
        Ok(Self {
            id: question.id,
            lesson_id: question.lesson_id,
            question: question.question.clone(),
            points: question.points,
            tags: question.tag_ids()?,
        })
    }
}
