// tests/postgres_tests.rs
//
// Runs the stores against a real Postgres. Needs a disposable database:
//   DATABASE_URL=postgres://... cargo test -- --ignored

use exam_backend::{
    error::AppError,
    models::{
        answer_record::SyncItem,
        assignment::Assignment,
        exam::{Exam, ExamQuestion, ExamRequest},
        lesson::Lesson,
        master::Master,
        question::{Answer, AnswerInput, Question, QuestionRequest},
        user::User,
    },
    services::exam_session::{self, AssignOutcome},
    store::{Audit, Condition, Db, Lifecycle, ListParams},
};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

async fn connect() -> Db {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    Db::Postgres(pool)
}

async fn new_user(db: &Db) -> User {
    let user = User {
        id: Uuid::new_v4(),
        email: format!("u_{}@example.com", &Uuid::new_v4().to_string()[..8]),
        fullname: "Student".to_string(),
        phone: None,
        address: None,
        password: "not-a-hash".to_string(),
        audit: Audit::created(None),
    };
    db.store::<User>().insert(&user).await.unwrap();
    user
}

#[tokio::test]
#[ignore]
async fn lesson_round_trip_and_soft_delete() {
    let db = connect().await;
    let store = db.store::<Lesson>();
    let marker = Uuid::new_v4().to_string();

    let mut lesson = Lesson::new(format!("Lesson {}", marker), None, None);
    store.insert(&lesson).await.unwrap();

    let params = ListParams {
        keywords: Some(marker.clone()),
        ..ListParams::default()
    };
    let filter = params.resolve::<Lesson>().unwrap();
    assert_eq!(store.count(&filter, &[]).await.unwrap(), 1);

    lesson.set(format!("Renamed {}", marker), Some("desc".to_string()));
    lesson.audit.touch(None);
    assert!(store.update(&lesson).await.unwrap());
    let fetched = store.get(lesson.id).await.unwrap().unwrap();
    assert!(fetched.name.starts_with("Renamed"));

    assert!(store.mark_deleted(lesson.id, None).await.unwrap());
    assert!(store.get(lesson.id).await.unwrap().is_none());
    assert_eq!(store.count(&filter, &[]).await.unwrap(), 0);
    assert!(!store.update(&lesson).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn duplicate_emails_are_conflicts() {
    let db = connect().await;
    let user = new_user(&db).await;

    let mut copy = user.clone();
    copy.id = Uuid::new_v4();
    copy.email = user.email.to_uppercase();

    let err = db.store::<User>().insert(&copy).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let found = db
        .store::<User>()
        .find_one(&[Condition::EqIgnoreCase("email", copy.email.clone())])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, user.id);
}

#[tokio::test]
#[ignore]
async fn assign_and_sync_against_postgres() {
    let db = connect().await;
    let user = new_user(&db).await;

    let lesson = Lesson::new("Sync lesson".to_string(), None, None);
    db.store::<Lesson>().insert(&lesson).await.unwrap();

    let question = Question::new(
        &QuestionRequest {
            lesson_id: lesson.id,
            question_type: "T1".to_string(),
            question: "2 + 2 = ?".to_string(),
            points: 10,
            tags: Vec::new(),
            attachments: Vec::new(),
            answers: Vec::new(),
        },
        None,
    )
    .unwrap();
    db.store::<Question>().insert(&question).await.unwrap();

    let mut options = Vec::new();
    for (text, points) in [("4", 10), ("5", 0)] {
        let answer = Answer::new(
            question.id,
            &AnswerInput {
                id: None,
                answer: text.to_string(),
                points,
                is_correct: points > 0,
                attachments: Vec::new(),
            },
            None,
        )
        .unwrap();
        db.store::<Answer>().insert(&answer).await.unwrap();
        options.push(answer);
    }

    let exam = Exam::new(
        &ExamRequest {
            lesson_id: lesson.id,
            exam_type: "quiz".to_string(),
            status: "published".to_string(),
            duration: 60,
            minimum_result: 70,
            title: "Postgres exam".to_string(),
            description: None,
            author: None,
            classes: Vec::new(),
        },
        None,
    );
    db.store::<Exam>().insert(&exam).await.unwrap();

    let link = ExamQuestion::new(exam.id, question.id, None);
    db.store::<ExamQuestion>().insert(&link).await.unwrap();

    let first = exam_session::assign(&db, exam.id, user.id).await.unwrap();
    assert!(matches!(first, AssignOutcome::Created(_)));

    // The partial unique index rejects a second live assignment.
    let err = db
        .store::<Assignment>()
        .insert(&Assignment::started(exam.id, user.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let second = exam_session::assign(&db, exam.id, user.id).await.unwrap();
    assert_eq!(first.assignment().id, second.assignment().id);

    let item = |answer_id: Uuid| SyncItem {
        exam_question_id: link.id,
        answer_id: Some(answer_id),
        answer: None,
        answered_at: None,
    };

    let inserted = exam_session::sync(&db, exam.id, user.id, &[item(options[0].id)])
        .await
        .unwrap();
    let updated = exam_session::sync(&db, exam.id, user.id, &[item(options[1].id)])
        .await
        .unwrap();

    assert_eq!(inserted.inserted, 1);
    assert_eq!(updated.updated, 1);
    assert_eq!(inserted.records[0].id, updated.records[0].id);

    let records = exam_session::answer_records(&db, exam.id, user.id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].answer_id, Some(options[1].id));
    assert_eq!(records[0].correction_points, Some(0));
}
