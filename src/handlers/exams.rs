// src/handlers/exams.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::{AppError, is_foreign_key_violation},
    models::{
        exam::{
            CreateExamRequest, Exam, ExamListParams, ExamPaper, ExamWithQuestions,
            UpdateExamRequest, validate_window,
        },
        question::{PublicQuestion, Question},
    },
    utils::html::clean_html,
};

async fn fetch_exam(pool: &PgPool, id: i64) -> Result<Exam, AppError> {
    sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch exam {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?
        .ok_or(AppError::NotFound("Exam not found".to_string()))
}

/// Lists exams, optionally restricted to one course.
pub async fn list_exams(
    State(pool): State<PgPool>,
    Query(params): Query<ExamListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM exams");

    if let Some(course_id) = params.course_id {
        builder.push(" WHERE course_id = ");
        builder.push_bind(course_id);
    }

    builder.push(" ORDER BY created_at DESC");

    let exams = builder
        .build_query_as::<Exam>()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list exams: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(exams))
}

pub async fn get_exam(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(fetch_exam(&pool, id).await?))
}

/// Staff view of an exam: every question with its answer, in display order.
pub async fn get_exam_with_questions(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = fetch_exam(&pool, id).await?;

    let questions = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE exam_id = $1 ORDER BY order_num, id",
    )
    .bind(id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch questions of exam {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(ExamWithQuestions { exam, questions }))
}

/// Student view of an exam. Answers, explanations and rubrics are never selected.
/// Questions are shuffled when the exam is marked random.
pub async fn get_exam_paper(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = fetch_exam(&pool, id).await?;

    let order = if exam.is_random {
        "RANDOM()"
    } else {
        "order_num, id"
    };

    let questions = sqlx::query_as::<_, PublicQuestion>(&format!(
        r#"
        SELECT id, exam_id, question_text, question_type, options, points, order_num, passage, audio_url
        FROM questions
        WHERE exam_id = $1
        ORDER BY {}
        "#,
        order
    ))
    .bind(id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch paper of exam {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(ExamPaper { exam, questions }))
}

pub async fn create_exam(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    validate_window(payload.start_date, payload.end_date)?;

    let description = payload.description.as_deref().map(clean_html);

    let exam = sqlx::query_as::<_, Exam>(
        r#"
        INSERT INTO exams
            (title, description, exam_type, course_id, duration, passing_score,
             total_points, start_date, end_date, is_random)
        VALUES ($1, $2, $3, $4, COALESCE($5, 60), COALESCE($6, 60),
                COALESCE($7, 100), $8, $9, COALESCE($10, FALSE))
        RETURNING *
        "#,
    )
    .bind(&payload.title)
    .bind(description)
    .bind(&payload.exam_type)
    .bind(payload.course_id)
    .bind(payload.duration)
    .bind(payload.passing_score)
    .bind(payload.total_points)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.is_random)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            AppError::BadRequest("Course does not exist".to_string())
        } else {
            tracing::error!("Failed to create exam: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    tracing::info!("Exam {} created: {}", exam.id, exam.title);

    Ok((StatusCode::CREATED, Json(exam)))
}

pub async fn update_exam(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    validate_window(payload.start_date, payload.end_date)?;

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE exams SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(clean_html(&description));
    }

    if let Some(exam_type) = payload.exam_type {
        separated.push("exam_type = ");
        separated.push_bind_unseparated(exam_type);
    }

    if let Some(course_id) = payload.course_id {
        separated.push("course_id = ");
        separated.push_bind_unseparated(course_id);
    }

    if let Some(duration) = payload.duration {
        separated.push("duration = ");
        separated.push_bind_unseparated(duration);
    }

    if let Some(passing_score) = payload.passing_score {
        separated.push("passing_score = ");
        separated.push_bind_unseparated(passing_score);
    }

    if let Some(total_points) = payload.total_points {
        separated.push("total_points = ");
        separated.push_bind_unseparated(total_points);
    }

    if let Some(start_date) = payload.start_date {
        separated.push("start_date = ");
        separated.push_bind_unseparated(start_date);
    }

    if let Some(end_date) = payload.end_date {
        separated.push("end_date = ");
        separated.push_bind_unseparated(end_date);
    }

    if let Some(is_random) = payload.is_random {
        separated.push("is_random = ");
        separated.push_bind_unseparated(is_random);
    }

    separated.push("updated_at = NOW()");

    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");

    let exam = builder
        .build_query_as::<Exam>()
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::BadRequest("Course does not exist".to_string())
            } else {
                tracing::error!("Failed to update exam {}: {:?}", id, e);
                AppError::InternalServerError(e.to_string())
            }
        })?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    Ok(Json(exam))
}

/// Deletes an exam and its questions. Exams that already have results cannot be deleted.
pub async fn delete_exam(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM exams WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::Conflict("Exam already has submitted results".to_string())
            } else {
                tracing::error!("Failed to delete exam {}: {:?}", id, e);
                AppError::InternalServerError(e.to_string())
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
