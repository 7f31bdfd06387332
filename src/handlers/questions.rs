// src/handlers/questions.rs

use std::collections::HashMap;

use axum::{Extension, extract::State, response::IntoResponse};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    handlers::{deleted, detail, inserted, listed, updated},
    models::{
        lesson::Lesson,
        master::MasterSummary,
        question::{Answer, AnswerInput, AnswerResponse, Question, QuestionRequest, QuestionResponse},
        tag::Tag,
    },
    store::{Condition, Db, Lifecycle, ListParams, reconcile::reconcile},
    utils::{
        extract::{PathParams, ValidatedJson, ValidatedQuery},
        jwt::Claims,
    },
};

/// The referenced lesson and every referenced tag must be live.
async fn check_references(db: &Db, req: &QuestionRequest) -> AppResult<MasterSummary> {
    let lesson = db
        .store::<Lesson>()
        .get(req.lesson_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Lesson is not found".to_string()))?;

    let tag_ids = req.tag_ids();
    if !tag_ids.is_empty() {
        let found = db
            .store::<Tag>()
            .find(&[Condition::In("id", tag_ids.clone())])
            .await?;
        if let Some(missing) = tag_ids.iter().find(|id| !found.iter().any(|t| t.id == **id)) {
            return Err(AppError::BadRequest(format!("Tag {} is not found", missing)));
        }
    }

    Ok(lesson.summary())
}

async fn answers_of(db: &Db, question_id: Uuid) -> AppResult<Vec<Answer>> {
    db.store::<Answer>()
        .find(&[Condition::eq("question_id", question_id)])
        .await
}

async fn with_answers(
    db: &Db,
    question: &Question,
    lesson: Option<MasterSummary>,
) -> AppResult<QuestionResponse> {
    let mut response = QuestionResponse::build(question, lesson)?;
    let answers = answers_of(db, question.id)
        .await?
        .iter()
        .map(AnswerResponse::from_answer)
        .collect::<AppResult<Vec<_>>>()?;
    response.answers = Some(answers);
    Ok(response)
}

pub async fn list_questions(
    State(db): State<Db>,
    ValidatedQuery(params): ValidatedQuery<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = params.resolve::<Question>()?;
    let store = db.store::<Question>();

    let questions = store.list(&filter, &[]).await?;
    let total_page = store.total_pages(&filter, &[]).await?;

    let mut lesson_ids: Vec<Uuid> = questions.iter().map(|q| q.lesson_id).collect();
    lesson_ids.sort();
    lesson_ids.dedup();
    let lessons: HashMap<Uuid, MasterSummary> = db
        .store::<Lesson>()
        .find(&[Condition::In("id", lesson_ids)])
        .await?
        .iter()
        .map(|l| (l.id, l.summary()))
        .collect();

    let data = questions
        .iter()
        .map(|q| QuestionResponse::build(q, lessons.get(&q.lesson_id).cloned()))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(listed(data, total_page))
}

pub async fn get_question(
    State(db): State<Db>,
    PathParams(id): PathParams<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let question = db
        .store::<Question>()
        .get(id)
        .await?
        .ok_or_else(AppError::data_not_found)?;
    let lesson = db
        .store::<Lesson>()
        .get(question.lesson_id)
        .await?
        .map(|l| l.summary());

    Ok(detail(with_answers(&db, &question, lesson).await?))
}

/// Creates a question together with its answers.
pub async fn create_question(
    State(db): State<Db>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(payload): ValidatedJson<QuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Some(claims.user_id);
    let lesson = check_references(&db, &payload).await?;

    let question = Question::new(&payload, actor)?;
    db.store::<Question>().insert(&question).await.inspect_err(|e| {
        tracing::error!("Failed to create question: {}", e);
    })?;

    let answer_store = db.store::<Answer>();
    for input in &payload.answers {
        answer_store.insert(&Answer::new(question.id, input, actor)?).await?;
    }

    Ok(inserted(with_answers(&db, &question, Some(lesson)).await?))
}

/// Updates a question and reconciles its answers by id.
pub async fn update_question(
    State(db): State<Db>,
    Extension(claims): Extension<Claims>,
    PathParams(id): PathParams<Uuid>,
    ValidatedJson(payload): ValidatedJson<QuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Some(claims.user_id);
    let store = db.store::<Question>();
    let mut question = store.get(id).await?.ok_or_else(AppError::data_not_found)?;
    let lesson = check_references(&db, &payload).await?;

    question.apply(&payload)?;
    question.audit.touch(actor);
    if !store.update(&question).await? {
        return Err(AppError::data_not_found());
    }

    let answer_store = db.store::<Answer>();
    let existing = answers_of(&db, question.id).await?;
    let plan = reconcile(
        &existing,
        &payload.answers,
        |row: &Answer| row.id,
        |input: &AnswerInput| input.id,
    );

    for row in plan.removed {
        answer_store.mark_deleted(row.id, actor).await?;
    }
    for (row, input) in plan.retained {
        let mut row = row.clone();
        row.apply(input)?;
        row.audit.touch(actor);
        answer_store.update(&row).await?;
    }
    for input in plan.added {
        answer_store.insert(&Answer::new(question.id, input, actor)?).await?;
    }

    Ok(updated(with_answers(&db, &question, Some(lesson)).await?))
}

/// Soft-deletes a question and all of its answers.
pub async fn delete_question(
    State(db): State<Db>,
    Extension(claims): Extension<Claims>,
    PathParams(id): PathParams<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Some(claims.user_id);
    if !db.store::<Question>().mark_deleted(id, actor).await? {
        return Err(AppError::data_not_found());
    }

    let answers = db
        .store::<Answer>()
        .mark_deleted_where(&[Condition::eq("question_id", id)], actor)
        .await?;

    tracing::info!("Deleted question {} with {} answers", id, answers);
    Ok(deleted())
}
