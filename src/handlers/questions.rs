// src/handlers/questions.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::{AppError, is_foreign_key_violation},
    models::question::{CreateQuestionRequest, Question, UpdateQuestionRequest},
};

/// Lists an exam's questions in display order, answers included.
pub async fn list_exam_questions(
    State(pool): State<PgPool>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE exam_id = $1 ORDER BY order_num, id",
    )
    .bind(exam_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list questions of exam {}: {:?}", exam_id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(questions))
}

pub async fn get_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch question {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(question))
}

pub async fn create_question(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let question = sqlx::query_as::<_, Question>(
        r#"
        INSERT INTO questions
            (exam_id, question_text, question_type, options, correct_answer, points,
             order_num, passage, audio_url, explanation, grading_rubric)
        VALUES ($1, $2, COALESCE($3, 'multiple_choice'), $4, $5, COALESCE($6, 1),
                COALESCE($7, 0), $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(payload.exam_id)
    .bind(&payload.question_text)
    .bind(&payload.question_type)
    .bind(payload.options.map(SqlJson))
    .bind(&payload.correct_answer)
    .bind(payload.points)
    .bind(payload.order_num)
    .bind(&payload.passage)
    .bind(&payload.audio_url)
    .bind(&payload.explanation)
    .bind(&payload.grading_rubric)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            AppError::BadRequest("Exam does not exist".to_string())
        } else {
            tracing::error!("Failed to create question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn update_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE questions SET ");
    let mut separated = builder.separated(", ");

    if let Some(exam_id) = payload.exam_id {
        separated.push("exam_id = ");
        separated.push_bind_unseparated(exam_id);
    }

    if let Some(question_text) = payload.question_text {
        separated.push("question_text = ");
        separated.push_bind_unseparated(question_text);
    }

    if let Some(question_type) = payload.question_type {
        separated.push("question_type = ");
        separated.push_bind_unseparated(question_type);
    }

    if let Some(options) = payload.options {
        separated.push("options = ");
        separated.push_bind_unseparated(SqlJson(options));
    }

    if let Some(correct_answer) = payload.correct_answer {
        separated.push("correct_answer = ");
        separated.push_bind_unseparated(correct_answer);
    }

    if let Some(points) = payload.points {
        separated.push("points = ");
        separated.push_bind_unseparated(points);
    }

    if let Some(order_num) = payload.order_num {
        separated.push("order_num = ");
        separated.push_bind_unseparated(order_num);
    }

    if let Some(passage) = payload.passage {
        separated.push("passage = ");
        separated.push_bind_unseparated(passage);
    }

    if let Some(audio_url) = payload.audio_url {
        separated.push("audio_url = ");
        separated.push_bind_unseparated(audio_url);
    }

    if let Some(explanation) = payload.explanation {
        separated.push("explanation = ");
        separated.push_bind_unseparated(explanation);
    }

    if let Some(grading_rubric) = payload.grading_rubric {
        separated.push("grading_rubric = ");
        separated.push_bind_unseparated(grading_rubric);
    }

    separated.push("updated_at = NOW()");

    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");

    let question = builder
        .build_query_as::<Question>()
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::BadRequest("Exam does not exist".to_string())
            } else {
                tracing::error!("Failed to update question {}: {:?}", id, e);
                AppError::InternalServerError(e.to_string())
            }
        })?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(question))
}

/// Deletes a question. Questions already answered in a result cannot be deleted.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::Conflict("Question has recorded answers".to_string())
            } else {
                tracing::error!("Failed to delete question {}: {:?}", id, e);
                AppError::InternalServerError(e.to_string())
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
