// tests/api_tests.rs

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use uedu_api::{
    ai::{CompletionClient, CompletionRequest, chat::ChatSessionStore},
    config::Config,
    error::AppError,
    routes,
    state::AppState,
};

struct Offline;

#[async_trait]
impl CompletionClient for Offline {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, AppError> {
        Err(AppError::InternalServerError("offline".to_string()))
    }
}

/// Spawns the app on a random port against the database in `DATABASE_URL`.
/// Returns `None` (and the test is skipped) when no database is configured.
async fn spawn_app() -> Option<String> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url,
        openai_api_key: "test-key".to_string(),
        openai_base_url: "http://localhost:1".to_string(),
        openai_model: "test-model".to_string(),
        completion_timeout_secs: 1,
        port: 0,
        cors_origins: vec![],
        rust_log: "error".to_string(),
    };

    let state = AppState {
        pool,
        config,
        llm: Arc::new(Offline),
        chat_sessions: ChatSessionStore::new(),
    };

    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some(format!("http://127.0.0.1:{}/api/v1", port))
}

fn unique_email(prefix: &str) -> String {
    format!("{}_{}@academy.test", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

async fn post_json(client: &reqwest::Client, url: String, body: Value) -> (u16, Value) {
    let response = client
        .post(url)
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request");
    let status = response.status().as_u16();
    (status, response.json().await.unwrap_or(Value::Null))
}

async fn get_json(client: &reqwest::Client, url: String) -> (u16, Value) {
    let response = client.get(url).send().await.expect("Failed to execute request");
    let status = response.status().as_u16();
    (status, response.json().await.unwrap_or(Value::Null))
}

#[tokio::test]
async fn student_crud_flow() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let email = unique_email("student");

    // Create
    let (status, student) = post_json(
        &client,
        format!("{}/students", address),
        json!({ "first_name": "Ana", "last_name": "Silva", "email": email, "level": "A2" }),
    )
    .await;
    assert_eq!(status, 201);
    let id = student["id"].as_i64().unwrap();

    // Duplicate email
    let (status, _) = post_json(
        &client,
        format!("{}/students", address),
        json!({ "first_name": "Other", "last_name": "Person", "email": email }),
    )
    .await;
    assert_eq!(status, 409);

    // Partial update keeps untouched fields
    let updated: Value = client
        .put(format!("{}/students/{}", address, id))
        .json(&json!({ "phone": "555-0100" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["phone"], "555-0100");
    assert_eq!(updated["first_name"], "Ana");
    assert_eq!(updated["level"], "A2");

    // Get
    let (status, fetched) = get_json(&client, format!("{}/students/{}", address, id)).await;
    assert_eq!(status, 200);
    assert_eq!(fetched["email"], email);

    // Delete, then 404 everywhere
    let response = client
        .delete(format!("{}/students/{}", address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let (status, _) = get_json(&client, format!("{}/students/{}", address, id)).await;
    assert_eq!(status, 404);

    let response = client
        .put(format!("{}/students/{}", address, id))
        .json(&json!({ "phone": "1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = client
        .delete(format!("{}/students/{}", address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn create_student_fails_validation() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let (status, body) = post_json(
        &client,
        format!("{}/students", address),
        json!({ "first_name": "No", "last_name": "Email", "email": "not-an-email" }),
    )
    .await;

    assert_eq!(status, 400);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn course_description_is_sanitized_and_joined_with_teacher() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let (_, teacher) = post_json(
        &client,
        format!("{}/teachers", address),
        json!({ "first_name": "Grace", "last_name": "Hopper", "email": unique_email("teacher") }),
    )
    .await;
    let teacher_id = teacher["id"].as_i64().unwrap();

    let (status, course) = post_json(
        &client,
        format!("{}/courses", address),
        json!({
            "name": "Intermediate English",
            "description": "<p>Weekly <b>speaking</b> practice</p><script>alert(1)</script>",
            "teacher_id": teacher_id,
            "price": 120.0
        }),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(course["description"], "<p>Weekly <b>speaking</b> practice</p>");
    assert_eq!(course["capacity"], 30);

    let (status, fetched) =
        get_json(&client, format!("{}/courses/{}", address, course["id"])).await;
    assert_eq!(status, 200);
    assert_eq!(fetched["teacher_first_name"], "Grace");
    assert_eq!(fetched["name"], "Intermediate English");

    // Teacher is still referenced by the course
    let response = client
        .delete(format!("{}/teachers/{}", address, teacher_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn enrollment_drives_student_classes_and_schedule() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let (_, teacher) = post_json(
        &client,
        format!("{}/teachers", address),
        json!({ "first_name": "Ada", "last_name": "Lovelace", "email": unique_email("teacher") }),
    )
    .await;
    let teacher_id = teacher["id"].as_i64().unwrap();

    let (_, student) = post_json(
        &client,
        format!("{}/students", address),
        json!({ "first_name": "Li", "last_name": "Wei", "email": unique_email("student") }),
    )
    .await;
    let student_id = student["id"].as_i64().unwrap();

    let (_, course) = post_json(
        &client,
        format!("{}/courses", address),
        json!({ "name": "Business English", "teacher_id": teacher_id }),
    )
    .await;
    let course_id = course["id"].as_i64().unwrap();

    let (status, class) = post_json(
        &client,
        format!("{}/classes", address),
        json!({
            "course_id": course_id,
            "teacher_id": teacher_id,
            "title": "Meetings vocabulary",
            "class_date": "2030-03-01T09:00:00Z",
            "room": "B12"
        }),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(class["duration"], 60);

    let (status, exam) = post_json(
        &client,
        format!("{}/exams", address),
        json!({
            "title": "Business English final",
            "exam_type": "final",
            "course_id": course_id,
            "start_date": "2030-03-10T09:00:00Z"
        }),
    )
    .await;
    assert_eq!(status, 201);

    // Not enrolled yet
    let (_, classes) =
        get_json(&client, format!("{}/students/{}/classes", address, student_id)).await;
    assert_eq!(classes.as_array().unwrap().len(), 0);

    let (status, enrollment) = post_json(
        &client,
        format!("{}/enrollments", address),
        json!({ "student_id": student_id, "course_id": course_id }),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(enrollment["status"], "active");

    let (status, _) = post_json(
        &client,
        format!("{}/enrollments", address),
        json!({ "student_id": student_id, "course_id": course_id }),
    )
    .await;
    assert_eq!(status, 409);

    let (_, classes) =
        get_json(&client, format!("{}/students/{}/classes", address, student_id)).await;
    assert_eq!(classes[0]["title"], "Meetings vocabulary");
    assert_eq!(classes[0]["course_name"], "Business English");

    let (_, taught) =
        get_json(&client, format!("{}/teachers/{}/classes", address, teacher_id)).await;
    assert_eq!(taught.as_array().unwrap().len(), 1);

    let (status, schedule) = get_json(
        &client,
        format!("{}/schedule?user_type=student&user_id={}", address, student_id),
    )
    .await;
    assert_eq!(status, 200);
    let events = schedule.as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["type"], "class");
    assert_eq!(events[1]["type"], "exam");
    assert_eq!(events[1]["id"], exam["id"]);

    let (_, enrollments) = get_json(
        &client,
        format!("{}/enrollments?student_id={}", address, student_id),
    )
    .await;
    assert_eq!(enrollments.as_array().unwrap().len(), 1);

    let response = client
        .delete(format!("{}/enrollments/{}", address, enrollment["id"]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);
}

#[tokio::test]
async fn exam_paper_hides_answers() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let (_, exam) = post_json(
        &client,
        format!("{}/exams", address),
        json!({ "title": "Placement", "exam_type": "pre_registration" }),
    )
    .await;
    let exam_id = exam["id"].as_i64().unwrap();
    assert_eq!(exam["passing_score"], 60);
    assert_eq!(exam["is_random"], false);

    for (order, text) in [(2, "Second"), (1, "First")] {
        let (status, _) = post_json(
            &client,
            format!("{}/questions", address),
            json!({
                "exam_id": exam_id,
                "question_text": text,
                "options": ["A", "B"],
                "correct_answer": "A",
                "points": 50,
                "order": order,
                "explanation": "Because A."
            }),
        )
        .await;
        assert_eq!(status, 201);
    }

    let (_, staff) =
        get_json(&client, format!("{}/exams/{}/with-questions", address, exam_id)).await;
    assert_eq!(staff["questions"][0]["question_text"], "First");
    assert_eq!(staff["questions"][0]["correct_answer"], "A");
    assert_eq!(staff["questions"][0]["order"], 1);

    let (status, paper) = get_json(&client, format!("{}/exams/{}/paper", address, exam_id)).await;
    assert_eq!(status, 200);
    let questions = paper["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0]["question_text"], "First");
    for q in questions {
        assert!(q.get("correct_answer").is_none());
        assert!(q.get("explanation").is_none());
        assert_eq!(q["options"], json!(["A", "B"]));
    }

    let (_, listed) = get_json(&client, format!("{}/exams/{}/questions", address, exam_id)).await;
    assert_eq!(listed.as_array().unwrap().len(), 2);

    let (status, _) = get_json(&client, format!("{}/exams/999999999/paper", address)).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn exam_validation_rejects_unknown_type() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let (status, _) = post_json(
        &client,
        format!("{}/exams", address),
        json!({ "title": "Mystery", "exam_type": "midterm" }),
    )
    .await;
    assert_eq!(status, 400);

    let (status, _) = post_json(
        &client,
        format!("{}/exams", address),
        json!({
            "title": "Backwards",
            "exam_type": "progress",
            "start_date": "2030-01-02T00:00:00Z",
            "end_date": "2030-01-01T00:00:00Z"
        }),
    )
    .await;
    assert_eq!(status, 400);
}
