// src/models/exam.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::{master::MasterSummary, question::QuestionSummary},
    store::{Audit, Param, Record},
};

/// Represents the 'exams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: Uuid,
    pub lesson_id: Uuid,

    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub exam_type: String,

    pub status: String,

    /// Minutes allowed for one attempt.
    pub duration: i32,

    /// Minimum result needed to pass.
    pub minimum_result: i32,

    pub title: String,
    pub description: Option<String>,
    pub author: Option<String>,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Exam {
    pub fn new(req: &ExamRequest, actor: Option<Uuid>) -> Self {
        let mut exam = Self {
            id: Uuid::new_v4(),
            lesson_id: req.lesson_id,
            exam_type: String::new(),
            status: String::new(),
            duration: 0,
            minimum_result: 0,
            title: String::new(),
            description: None,
            author: None,
            audit: Audit::created(actor),
        };
        exam.apply(req);
        exam
    }

    pub fn apply(&mut self, req: &ExamRequest) {
        self.lesson_id = req.lesson_id;
        self.exam_type = req.exam_type.clone();
        self.status = req.status.clone();
        self.duration = req.duration;
        self.minimum_result = req.minimum_result;
        self.title = req.title.clone();
        self.description = req.description.as_deref().map(crate::utils::html::clean_html);
        self.author = req.author.clone();
    }
}

impl Record for Exam {
    const TABLE: &'static str = "exams";
    const SEARCH: &'static [&'static str] = &["title", "description"];
    const SORTABLE: &'static [&'static str] = &["title", "type", "status", "duration"];

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
            ("type", self.exam_type.clone().into()),
            ("status", self.status.clone().into()),
            ("duration", self.duration.into()),
            ("minimum_result", self.minimum_result.into()),
            ("title", self.title.clone().into()),
            ("description", self.description.clone().into()),
            ("author", self.author.clone().into()),
        ]
    }
}

/// Represents the 'exam_classes' table: a class allowed to take an exam.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamClass {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub class_id: Uuid,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl ExamClass {
    pub fn new(exam_id: Uuid, class_id: Uuid, actor: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            exam_id,
            class_id,
            audit: Audit::created(actor),
        }
    }
}

impl Record for ExamClass {
    const TABLE: &'static str = "exam_classes";

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
            ("class_id", self.class_id.into()),
        ]
    }
}

/// Represents the 'exam_questions' table: a question placed in an exam.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamQuestion {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub question_id: Uuid,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl ExamQuestion {
    pub fn new(exam_id: Uuid, question_id: Uuid, actor: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            exam_id,
            question_id,
            audit: Audit::created(actor),
        }
    }
}

impl Record for ExamQuestion {
    const TABLE: &'static str = "exam_questions";

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
            ("question_id", self.question_id.into()),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExamClassInput {
    pub class_id: Uuid,
}

/// DTO for creating or updating an exam with its classes.
#[derive(Debug, Deserialize, Validate)]
pub struct ExamRequest {
    pub lesson_id: Uuid,

    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50))]
    pub exam_type: String,

    #[validate(length(min = 1, max = 50))]
    pub status: String,

    #[validate(range(min = 0, message = "Duration cannot be negative."))]
    pub duration: i32,

    #[validate(range(min = 0, message = "Minimum result cannot be negative."))]
    pub minimum_result: i32,

    #[validate(length(min = 1, max = 255))]
    pub title: String,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[validate(length(max = 255))]
    pub author: Option<String>,

    pub classes: Vec<ExamClassInput>,
}

/// Class membership of an exam, with the class name resolved.
#[derive(Debug, Serialize)]
pub struct ExamClassResponse {
    pub id: Uuid,
    pub class_id: Uuid,
    pub name: Option<String>,
}

/// Exam with its lesson (and, on detail, its classes).
#[derive(Debug, Serialize)]
pub struct ExamResponse {
    #[serde(flatten)]
    pub exam: Exam,
    pub lesson: Option<MasterSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<ExamClassResponse>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRef {
    pub question_id: Uuid,
}

/// DTO for attaching questions to an exam.
#[derive(Debug, Deserialize, Validate)]
pub struct ExamQuestionsRequest {
    #[validate(length(min = 1, message = "At least one question is required."))]
    pub questions: Vec<QuestionRef>,
}

/// Exam question link with the question resolved.
#[derive(Debug, Serialize)]
pub struct ExamQuestionResponse {
    #[serde(flatten)]
    pub link: ExamQuestion,
    pub question: Option<QuestionSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attaching_needs_at_least_one_question() {
        let empty = ExamQuestionsRequest { questions: Vec::new() };
        let errors = empty.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("questions"));

        let one = ExamQuestionsRequest {
            questions: vec![QuestionRef { question_id: Uuid::new_v4() }],
        };
        assert!(one.validate().is_ok());
    }
}
