// src/routes.rs

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{
        ai, classes, courses, enrollments, exam_results, exams, questions, students, teachers,
    },
    state::AppState,
};

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Assembles the main application router.
///
/// * Nests every resource under `/api/v1`.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, completion client, chat sessions).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    let student_routes = Router::new()
        .route("/", get(students::list_students).post(students::create_student))
        .route(
            "/{id}",
            get(students::get_student)
                .put(students::update_student)
                .delete(students::delete_student),
        )
        .route("/{id}/classes", get(students::list_student_classes));

    let teacher_routes = Router::new()
        .route("/", get(teachers::list_teachers).post(teachers::create_teacher))
        .route(
            "/{id}",
            get(teachers::get_teacher)
                .put(teachers::update_teacher)
                .delete(teachers::delete_teacher),
        )
        .route("/{id}/classes", get(teachers::list_teacher_classes));

    let course_routes = Router::new()
        .route("/", get(courses::list_courses).post(courses::create_course))
        .route(
            "/{id}",
            get(courses::get_course)
                .put(courses::update_course)
                .delete(courses::delete_course),
        );

    let enrollment_routes = Router::new()
        .route(
            "/",
            get(enrollments::list_enrollments).post(enrollments::create_enrollment),
        )
        .route("/{id}", delete(enrollments::delete_enrollment));

    let class_routes = Router::new()
        .route("/", get(classes::list_classes).post(classes::create_class))
        .route(
            "/{id}",
            get(classes::get_class)
                .put(classes::update_class)
                .delete(classes::delete_class),
        );

    let exam_routes = Router::new()
        .route("/", get(exams::list_exams).post(exams::create_exam))
        .route(
            "/{id}",
            get(exams::get_exam)
                .put(exams::update_exam)
                .delete(exams::delete_exam),
        )
        .route("/{id}/with-questions", get(exams::get_exam_with_questions))
        .route("/{id}/paper", get(exams::get_exam_paper))
        .route("/{id}/questions", get(questions::list_exam_questions));

    let question_routes = Router::new()
        .route("/", post(questions::create_question))
        .route(
            "/{id}",
            get(questions::get_question)
                .put(questions::update_question)
                .delete(questions::delete_question),
        );

    let result_routes = Router::new()
        .route("/", get(exam_results::list_exam_results))
        .route("/submit", post(exam_results::submit_exam))
        .route("/{id}/details", get(exam_results::get_exam_result_details));

    let ai_routes = Router::new()
        .route("/exam-generator", post(ai::generate_exam))
        .route("/chatbot", post(ai::chat))
        .route("/chatbot/{student_id}", delete(ai::clear_chat_history))
        .route("/grading/writing", post(ai::evaluate_writing))
        .route("/grading/rubric", post(ai::generate_rubric))
        .route("/adaptive-difficulty", post(ai::adaptive_difficulty));

    let api = Router::new()
        .nest("/students", student_routes)
        .nest("/teachers", teacher_routes)
        .nest("/courses", course_routes)
        .nest("/enrollments", enrollment_routes)
        .nest("/classes", class_routes)
        .route("/schedule", get(classes::get_schedule))
        .nest("/exams", exam_routes)
        .nest("/questions", question_routes)
        .nest("/exam-results", result_routes)
        .nest("/ai", ai_routes);

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
