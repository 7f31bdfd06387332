// src/services/exam_session.rs

//! Exam taking: assignment of an exam to a user, then periodic checkpoints
//! ("sync") of the user's in-progress answers.
//!
//! Neither step runs in a transaction. A sync that fails half-way leaves the
//! earlier items stored; the client resends its full answer set on the next
//! heartbeat, which converges the remaining items.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        answer_record::{AnswerRecord, SyncItem, SyncSummary},
        assignment::Assignment,
        exam::{Exam, ExamQuestion},
        question::Answer,
    },
    store::{Audit, Condition, Db},
    utils::html::clean_html,
};

#[derive(Debug)]
pub enum AssignOutcome {
    Created(Assignment),
    Existing(Assignment),
}

impl AssignOutcome {
    pub fn assignment(&self) -> &Assignment {
        match self {
            AssignOutcome::Created(a) | AssignOutcome::Existing(a) => a,
        }
    }
}

fn assignment_key(exam_id: Uuid, user_id: Uuid) -> [Condition; 2] {
    [
        Condition::eq("exam_id", exam_id),
        Condition::eq("user_id", user_id),
    ]
}

async fn require_exam(db: &Db, exam_id: Uuid) -> AppResult<Exam> {
    db.store::<Exam>()
        .get(exam_id)
        .await?
        .ok_or_else(AppError::data_not_found)
}

/// Gives `exam_id` to `user_id` once; later calls return the existing row.
pub async fn assign(db: &Db, exam_id: Uuid, user_id: Uuid) -> AppResult<AssignOutcome> {
    require_exam(db, exam_id).await?;

    let store = db.store::<Assignment>();
    let key = assignment_key(exam_id, user_id);

    if let Some(existing) = store.find_one(&key).await? {
        return Ok(AssignOutcome::Existing(existing));
    }

    let assignment = Assignment::started(exam_id, user_id);
    match store.insert(&assignment).await {
        Ok(()) => {
            tracing::info!("User {} started exam {}", user_id, exam_id);
            Ok(AssignOutcome::Created(assignment))
        }
        // a concurrent assign won the unique index; hand back its row
        Err(AppError::Conflict(msg)) => store
            .find_one(&key)
            .await?
            .map(AssignOutcome::Existing)
            .ok_or(AppError::Store(msg)),
        Err(e) => Err(e),
    }
}

/// Live assignments of an exam.
pub async fn assignments(db: &Db, exam_id: Uuid) -> AppResult<Vec<Assignment>> {
    require_exam(db, exam_id).await?;
    db.store::<Assignment>()
        .find(&[Condition::eq("exam_id", exam_id)])
        .await
}

/// The user's stored answers for an exam.
pub async fn answer_records(db: &Db, exam_id: Uuid, user_id: Uuid) -> AppResult<Vec<AnswerRecord>> {
    require_exam(db, exam_id).await?;
    db.store::<AnswerRecord>()
        .find(&assignment_key(exam_id, user_id))
        .await
}

/// Upserts one answer record per item, keyed by (exam_question_id, user_id).
///
/// The user's existing records for the exam are read once and matched in
/// memory. Items identical to what is stored are not rewritten, so replaying
/// a payload leaves the stored set untouched.
pub async fn sync(
    db: &Db,
    exam_id: Uuid,
    user_id: Uuid,
    items: &[SyncItem],
) -> AppResult<SyncSummary> {
    require_exam(db, exam_id).await?;

    let key = assignment_key(exam_id, user_id);
    if db.store::<Assignment>().find_one(&key).await?.is_none() {
        return Err(AppError::BadRequest(
            "Exam is not assigned to this user".to_string(),
        ));
    }

    let links: HashMap<Uuid, ExamQuestion> = db
        .store::<ExamQuestion>()
        .find(&[Condition::eq("exam_id", exam_id)])
        .await?
        .into_iter()
        .map(|link| (link.id, link))
        .collect();

    for item in items {
        if !links.contains_key(&item.exam_question_id) {
            return Err(AppError::BadRequest(format!(
                "Question {} is not part of this exam",
                item.exam_question_id
            )));
        }
    }

    let chosen: Vec<Uuid> = items.iter().filter_map(|item| item.answer_id).collect();
    let options: HashMap<Uuid, Answer> = if chosen.is_empty() {
        HashMap::new()
    } else {
        db.store::<Answer>()
            .find(&[Condition::In("id", chosen)])
            .await?
            .into_iter()
            .map(|answer| (answer.id, answer))
            .collect()
    };

    for item in items {
        let Some(answer_id) = item.answer_id else {
            continue;
        };
        let question_id = links[&item.exam_question_id].question_id;
        if options.get(&answer_id).is_none_or(|a| a.question_id != question_id) {
            return Err(AppError::BadRequest(format!(
                "Answer {} does not belong to question {}",
                answer_id, question_id
            )));
        }
    }

    let store = db.store::<AnswerRecord>();
    let mut by_question: HashMap<Uuid, AnswerRecord> = HashMap::new();
    for record in store.find(&key).await? {
        by_question.entry(record.exam_question_id).or_insert(record);
    }

    let now = Utc::now();
    let mut summary = SyncSummary {
        inserted: 0,
        updated: 0,
        records: Vec::with_capacity(items.len()),
    };
    let mut touched: Vec<Uuid> = Vec::with_capacity(items.len());

    for item in items {
        let link = &links[&item.exam_question_id];
        let answer = item.answer.as_deref().map(clean_html);
        let correction_points = item
            .answer_id
            .and_then(|id| options.get(&id))
            .map(|option| option.points);

        match by_question.get_mut(&item.exam_question_id) {
            Some(record) => {
                let unchanged = record.answer_id == item.answer_id
                    && record.answer == answer
                    && record.correction_points == correction_points
                    && item.answered_at.is_none_or(|at| at == record.answered_at);
                if !unchanged {
                    record.question_id = link.question_id;
                    record.answer_id = item.answer_id;
                    record.answer = answer;
                    record.correction_points = correction_points;
                    record.answered_at = item.answered_at.unwrap_or(now);
                    record.audit.touch(Some(user_id));
                    store.update(record).await?;
                    summary.updated += 1;
                }
            }
            None => {
                let record = AnswerRecord {
                    id: Uuid::new_v4(),
                    exam_id,
                    exam_question_id: link.id,
                    question_id: link.question_id,
                    user_id,
                    answer_id: item.answer_id,
                    answer,
                    correction_points,
                    answered_at: item.answered_at.unwrap_or(now),
                    audit: Audit::created(Some(user_id)),
                };
                store.insert(&record).await?;
                by_question.insert(record.exam_question_id, record);
                summary.inserted += 1;
            }
        }

        if !touched.contains(&item.exam_question_id) {
            touched.push(item.exam_question_id);
        }
    }

    summary.records = touched
        .iter()
        .filter_map(|id| by_question.get(id).cloned())
        .collect();

    tracing::info!(
        "Synced {} answers for user {} on exam {} ({} new, {} changed)",
        items.len(),
        user_id,
        exam_id,
        summary.inserted,
        summary.updated
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        exam::{ExamClassInput, ExamRequest},
        question::Question,
    };
    use crate::store::{Lifecycle, ListFilter};

    struct Fixture {
        db: Db,
        exam: Exam,
        user_id: Uuid,
        link: ExamQuestion,
        options: Vec<Answer>,
    }

    async fn fixture() -> Fixture {
        let db = Db::memory();
        let user_id = Uuid::new_v4();

        let exam = Exam::new(
            &ExamRequest {
                lesson_id: Uuid::new_v4(),
                exam_type: "quiz".to_string(),
                status: "published".to_string(),
                duration: 60,
                minimum_result: 70,
                title: "Midterm".to_string(),
                description: None,
                author: None,
                classes: Vec::<ExamClassInput>::new(),
            },
            None,
        );
        db.store::<Exam>().insert(&exam).await.unwrap();

        let question = Question {
            id: Uuid::new_v4(),
            lesson_id: exam.lesson_id,
            question_type: "T1".to_string(),
            question: "2 + 2 = ?".to_string(),
            points: 10,
            tags: "[]".to_string(),
            attachments: "[]".to_string(),
            audit: Audit::created(None),
        };
        db.store::<Question>().insert(&question).await.unwrap();

        let mut options = Vec::new();
        for (text, points, is_correct) in [("3", 0, false), ("4", 10, true), ("5", 0, false)] {
            let answer = Answer {
                id: Uuid::new_v4(),
                question_id: question.id,
                answer: text.to_string(),
                points,
                is_correct,
                attachments: "[]".to_string(),
                audit: Audit::created(None),
            };
            db.store::<Answer>().insert(&answer).await.unwrap();
            options.push(answer);
        }

        let link = ExamQuestion::new(exam.id, question.id, None);
        db.store::<ExamQuestion>().insert(&link).await.unwrap();

        Fixture {
            db,
            exam,
            user_id,
            link,
            options,
        }
    }

    fn item(link: &ExamQuestion, answer_id: Uuid) -> SyncItem {
        SyncItem {
            exam_question_id: link.id,
            answer_id: Some(answer_id),
            answer: None,
            answered_at: None,
        }
    }

    async fn record_count(db: &Db) -> i64 {
        db.store::<AnswerRecord>()
            .count(&ListFilter::default(), &[])
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn assign_is_idempotent() {
        let f = fixture().await;

        let first = f_assign(&f).await;
        assert!(matches!(first, AssignOutcome::Created(_)));
        let second = f_assign(&f).await;
        assert!(matches!(second, AssignOutcome::Existing(_)));
        assert_eq!(first.assignment().id, second.assignment().id);

        let all = assignments(&f.db, f.exam.id).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, "started");
        assert_eq!(all[0].audit.created_by, Some(f.user_id));
    }

    async fn f_assign(f: &Fixture) -> AssignOutcome {
        assign(&f.db, f.exam.id, f.user_id).await.unwrap()
    }

    #[tokio::test]
    async fn assign_unknown_exam_is_not_found() {
        let f = fixture().await;
        let err = assign(&f.db, Uuid::new_v4(), f.user_id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn sync_inserts_then_updates_in_place() {
        let f = fixture().await;
        f_assign(&f).await;

        let first = sync(&f.db, f.exam.id, f.user_id, &[item(&f.link, f.options[1].id)])
            .await
            .unwrap();
        assert_eq!((first.inserted, first.updated), (1, 0));
        let created = first.records[0].clone();
        assert_eq!(created.answer_id, Some(f.options[1].id));
        assert_eq!(created.correction_points, Some(10));

        let second = sync(&f.db, f.exam.id, f.user_id, &[item(&f.link, f.options[2].id)])
            .await
            .unwrap();
        assert_eq!((second.inserted, second.updated), (0, 1));
        assert_eq!(second.records[0].id, created.id);
        assert_eq!(second.records[0].answer_id, Some(f.options[2].id));
        assert_eq!(second.records[0].correction_points, Some(0));
        assert_eq!(record_count(&f.db).await, 1);
    }

    #[tokio::test]
    async fn replaying_a_sync_converges() {
        let f = fixture().await;
        f_assign(&f).await;
        let payload = [item(&f.link, f.options[1].id)];

        sync(&f.db, f.exam.id, f.user_id, &payload).await.unwrap();
        let after_first = answer_records(&f.db, f.exam.id, f.user_id).await.unwrap();

        let replay = sync(&f.db, f.exam.id, f.user_id, &payload).await.unwrap();
        let after_second = answer_records(&f.db, f.exam.id, f.user_id).await.unwrap();

        assert_eq!((replay.inserted, replay.updated), (0, 0));
        assert_eq!(after_first, after_second);
    }

    #[tokio::test]
    async fn free_text_answers_wait_for_correction() {
        let f = fixture().await;
        f_assign(&f).await;

        let summary = sync(
            &f.db,
            f.exam.id,
            f.user_id,
            &[SyncItem {
                exam_question_id: f.link.id,
                answer_id: None,
                answer: Some("four<script>x()</script>".to_string()),
                answered_at: None,
            }],
        )
        .await
        .unwrap();

        assert_eq!(summary.records[0].answer.as_deref(), Some("four"));
        assert_eq!(summary.records[0].correction_points, None);
    }

    #[tokio::test]
    async fn sync_requires_an_assignment() {
        let f = fixture().await;
        let err = sync(&f.db, f.exam.id, f.user_id, &[item(&f.link, f.options[0].id)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("not assigned")));
        assert_eq!(record_count(&f.db).await, 0);
    }

    #[tokio::test]
    async fn sync_rejects_foreign_questions_and_answers() {
        let f = fixture().await;
        f_assign(&f).await;

        let stranger = SyncItem {
            exam_question_id: Uuid::new_v4(),
            answer_id: None,
            answer: Some("x".to_string()),
            answered_at: None,
        };
        let err = sync(&f.db, f.exam.id, f.user_id, &[stranger]).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let wrong_option = item(&f.link, Uuid::new_v4());
        let err = sync(&f.db, f.exam.id, f.user_id, &[wrong_option]).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn deleted_options_cannot_be_chosen() {
        let f = fixture().await;
        f_assign(&f).await;
        f.db
            .store::<Answer>()
            .mark_deleted(f.options[1].id, None)
            .await
            .unwrap();

        let err = sync(&f.db, f.exam.id, f.user_id, &[item(&f.link, f.options[1].id)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn records_are_scoped_to_the_user() {
        let f = fixture().await;
        f_assign(&f).await;
        let other = Uuid::new_v4();
        assign(&f.db, f.exam.id, other).await.unwrap();

        sync(&f.db, f.exam.id, f.user_id, &[item(&f.link, f.options[0].id)]).await.unwrap();
        sync(&f.db, f.exam.id, other, &[item(&f.link, f.options[1].id)]).await.unwrap();

        let mine = answer_records(&f.db, f.exam.id, f.user_id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].answer_id, Some(f.options[0].id));
        assert_eq!(record_count(&f.db).await, 2);
    }
}
