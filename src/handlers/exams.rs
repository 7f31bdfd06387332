// src/handlers/exams.rs

use std::collections::HashMap;

use axum::{Extension, extract::State, response::IntoResponse};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    handlers::{deleted, detail, inserted, listed, updated},
    models::{
        class::Class,
        exam::{
            Exam, ExamClass, ExamClassInput, ExamClassResponse, ExamQuestion,
            ExamQuestionResponse, ExamQuestionsRequest, ExamRequest, ExamResponse,
        },
        lesson::Lesson,
        master::MasterSummary,
        question::{Question, QuestionSummary},
    },
    store::{Condition, Db, Lifecycle, ListParams, reconcile::reconcile},
    utils::{
        extract::{PathParams, ValidatedJson, ValidatedQuery},
        jwt::Claims,
    },
};

/// Distinct ids in first-seen order.
fn distinct(ids: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    let mut out: Vec<Uuid> = Vec::new();
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

async fn check_references(db: &Db, req: &ExamRequest) -> AppResult<MasterSummary> {
    let lesson = db
        .store::<Lesson>()
        .get(req.lesson_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Lesson is not found".to_string()))?;

    let class_ids = distinct(req.classes.iter().map(|c| c.class_id));
    if !class_ids.is_empty() {
        let found = db
            .store::<Class>()
            .find(&[Condition::In("id", class_ids.clone())])
            .await?;
        if let Some(missing) = class_ids.iter().find(|id| !found.iter().any(|c| c.id == **id)) {
            return Err(AppError::BadRequest(format!("Class {} is not found", missing)));
        }
    }

    Ok(lesson.summary())
}

async fn require_exam(db: &Db, id: Uuid) -> AppResult<Exam> {
    db.store::<Exam>()
        .get(id)
        .await?
        .ok_or_else(AppError::data_not_found)
}

async fn class_links(db: &Db, exam_id: Uuid) -> AppResult<Vec<ExamClass>> {
    db.store::<ExamClass>()
        .find(&[Condition::eq("exam_id", exam_id)])
        .await
}

async fn exam_detail(db: &Db, exam: Exam, lesson: Option<MasterSummary>) -> AppResult<ExamResponse> {
    let links = class_links(db, exam.id).await?;
    let names: HashMap<Uuid, String> = db
        .store::<Class>()
        .find(&[Condition::In("id", links.iter().map(|l| l.class_id).collect())])
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let classes = links
        .iter()
        .map(|link| ExamClassResponse {
            id: link.id,
            class_id: link.class_id,
            name: names.get(&link.class_id).cloned(),
        })
        .collect();

    Ok(ExamResponse {
        exam,
        lesson,
        classes: Some(classes),
    })
}

pub async fn list_exams(
    State(db): State<Db>,
    ValidatedQuery(params): ValidatedQuery<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = params.resolve::<Exam>()?;
    let store = db.store::<Exam>();

    let exams = store.list(&filter, &[]).await?;
    let total_page = store.total_pages(&filter, &[]).await?;

    let lessons: HashMap<Uuid, MasterSummary> = db
        .store::<Lesson>()
        .find(&[Condition::In("id", distinct(exams.iter().map(|e| e.lesson_id)))])
        .await?
        .iter()
        .map(|l| (l.id, l.summary()))
        .collect();

    let data: Vec<ExamResponse> = exams
        .into_iter()
        .map(|exam| ExamResponse {
            lesson: lessons.get(&exam.lesson_id).cloned(),
            exam,
            classes: None,
        })
        .collect();

    Ok(listed(data, total_page))
}

pub async fn get_exam(
    State(db): State<Db>,
    PathParams(id): PathParams<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let exam = require_exam(&db, id).await?;
    let lesson = db
        .store::<Lesson>()
        .get(exam.lesson_id)
        .await?
        .map(|l| l.summary());

    Ok(detail(exam_detail(&db, exam, lesson).await?))
}

/// Creates an exam and the classes allowed to take it.
pub async fn create_exam(
    State(db): State<Db>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(payload): ValidatedJson<ExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Some(claims.user_id);
    let lesson = check_references(&db, &payload).await?;

    let exam = Exam::new(&payload, actor);
    db.store::<Exam>().insert(&exam).await.inspect_err(|e| {
        tracing::error!("Failed to create exam: {}", e);
    })?;

    let class_store = db.store::<ExamClass>();
    for class_id in distinct(payload.classes.iter().map(|c| c.class_id)) {
        class_store.insert(&ExamClass::new(exam.id, class_id, actor)).await?;
    }

    tracing::info!("Created exam {}", exam.id);
    Ok(inserted(exam_detail(&db, exam, Some(lesson)).await?))
}

/// Updates an exam and reconciles its classes by class id.
pub async fn update_exam(
    State(db): State<Db>,
    Extension(claims): Extension<Claims>,
    PathParams(id): PathParams<Uuid>,
    ValidatedJson(payload): ValidatedJson<ExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Some(claims.user_id);
    let mut exam = require_exam(&db, id).await?;
    let lesson = check_references(&db, &payload).await?;

    exam.apply(&payload);
    exam.audit.touch(actor);
    if !db.store::<Exam>().update(&exam).await? {
        return Err(AppError::data_not_found());
    }

    let class_store = db.store::<ExamClass>();
    let existing = class_links(&db, exam.id).await?;
    let plan = reconcile(
        &existing,
        &payload.classes,
        |link: &ExamClass| link.class_id,
        |input: &ExamClassInput| Some(input.class_id),
    );
    for link in plan.removed {
        class_store.mark_deleted(link.id, actor).await?;
    }
    for input in plan.added {
        class_store
            .insert(&ExamClass::new(exam.id, input.class_id, actor))
            .await?;
    }

    Ok(updated(exam_detail(&db, exam, Some(lesson)).await?))
}

/// Soft-deletes an exam and its class links.
pub async fn delete_exam(
    State(db): State<Db>,
    Extension(claims): Extension<Claims>,
    PathParams(id): PathParams<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Some(claims.user_id);
    if !db.store::<Exam>().mark_deleted(id, actor).await? {
        return Err(AppError::data_not_found());
    }

    db.store::<ExamClass>()
        .mark_deleted_where(&[Condition::eq("exam_id", id)], actor)
        .await?;

    tracing::info!("Deleted exam {}", id);
    Ok(deleted())
}

/// Paged questions of an exam, each with its question resolved.
pub async fn list_exam_questions(
    State(db): State<Db>,
    PathParams(exam_id): PathParams<Uuid>,
    ValidatedQuery(params): ValidatedQuery<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    require_exam(&db, exam_id).await?;

    let filter = params.resolve::<ExamQuestion>()?;
    let scope = [Condition::eq("exam_id", exam_id)];
    let store = db.store::<ExamQuestion>();

    let links = store.list(&filter, &scope).await?;
    let total_page = store.total_pages(&filter, &scope).await?;

    let questions: HashMap<Uuid, Question> = db
        .store::<Question>()
        .find(&[Condition::In("id", distinct(links.iter().map(|l| l.question_id)))])
        .await?
        .into_iter()
        .map(|q| (q.id, q))
        .collect();

    let data = links
        .into_iter()
        .map(|link| {
            let question = questions
                .get(&link.question_id)
                .map(QuestionSummary::from_question)
                .transpose()?;
            Ok::<_, AppError>(ExamQuestionResponse { link, question })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(listed(data, total_page))
}

/// Attaches questions to an exam. Questions already attached are skipped.
pub async fn attach_exam_questions(
    State(db): State<Db>,
    Extension(claims): Extension<Claims>,
    PathParams(exam_id): PathParams<Uuid>,
    ValidatedJson(payload): ValidatedJson<ExamQuestionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Some(claims.user_id);
    require_exam(&db, exam_id).await?;

    let wanted = distinct(payload.questions.iter().map(|q| q.question_id));
    let found = db
        .store::<Question>()
        .find(&[Condition::In("id", wanted.clone())])
        .await?;
    if let Some(missing) = wanted.iter().find(|id| !found.iter().any(|q| q.id == **id)) {
        return Err(AppError::BadRequest(format!("Question {} is not found", missing)));
    }

    let store = db.store::<ExamQuestion>();
    let attached = store.find(&[Condition::eq("exam_id", exam_id)]).await?;

    let mut created = Vec::new();
    for question_id in wanted {
        if attached.iter().any(|link| link.question_id == question_id) {
            continue;
        }
        let link = ExamQuestion::new(exam_id, question_id, actor);
        store.insert(&link).await?;
        created.push(link);
    }

    tracing::info!("Attached {} questions to exam {}", created.len(), exam_id);
    Ok(inserted(created))
}

pub async fn detach_exam_question(
    State(db): State<Db>,
    Extension(claims): Extension<Claims>,
    PathParams((exam_id, id)): PathParams<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let store = db.store::<ExamQuestion>();
    store
        .find_one(&[Condition::eq("id", id), Condition::eq("exam_id", exam_id)])
        .await?
        .ok_or_else(AppError::data_not_found)?;

    if !store.mark_deleted(id, Some(claims.user_id)).await? {
        return Err(AppError::data_not_found());
    }

    Ok(deleted())
}
