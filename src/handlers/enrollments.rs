// src/handlers/enrollments.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::{AppError, is_foreign_key_violation, is_unique_violation},
    models::enrollment::{CreateEnrollmentRequest, Enrollment, EnrollmentListParams},
};

pub async fn list_enrollments(
    State(pool): State<PgPool>,
    Query(params): Query<EnrollmentListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT * FROM enrollments WHERE 1 = 1");

    if let Some(student_id) = params.student_id {
        builder.push(" AND student_id = ");
        builder.push_bind(student_id);
    }

    if let Some(course_id) = params.course_id {
        builder.push(" AND course_id = ");
        builder.push_bind(course_id);
    }

    builder.push(" ORDER BY enrolled_at DESC");

    let enrollments = builder
        .build_query_as::<Enrollment>()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list enrollments: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(enrollments))
}

/// Enrolls a student in a course. A second enrollment in the same course is a conflict.
pub async fn create_enrollment(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateEnrollmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let enrollment = sqlx::query_as::<_, Enrollment>(
        r#"
        INSERT INTO enrollments (student_id, course_id, status)
        VALUES ($1, $2, COALESCE($3, 'active'))
        RETURNING *
        "#,
    )
    .bind(payload.student_id)
    .bind(payload.course_id)
    .bind(&payload.status)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Student is already enrolled in this course".to_string())
        } else if is_foreign_key_violation(&e) {
            AppError::BadRequest("Student or course does not exist".to_string())
        } else {
            tracing::error!("Failed to create enrollment: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(enrollment)))
}

pub async fn delete_enrollment(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM enrollments WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete enrollment {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Enrollment not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
