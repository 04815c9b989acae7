// src/handlers/courses.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::{AppError, is_foreign_key_violation},
    models::{
        course::{Course, CourseWithTeacher, CreateCourseRequest, UpdateCourseRequest},
        exam::validate_window,
    },
    utils::html::clean_html,
};

const COURSE_WITH_TEACHER: &str = r#"
    SELECT c.*,
        t.first_name AS teacher_first_name,
        t.last_name AS teacher_last_name
    FROM courses c
    LEFT JOIN teachers t ON t.id = c.teacher_id
"#;

/// Lists all courses with their teacher's name.
pub async fn list_courses(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let courses = sqlx::query_as::<_, CourseWithTeacher>(&format!(
        "{} ORDER BY c.created_at DESC",
        COURSE_WITH_TEACHER
    ))
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list courses: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(courses))
}

pub async fn get_course(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = sqlx::query_as::<_, CourseWithTeacher>(&format!(
        "{} WHERE c.id = $1",
        COURSE_WITH_TEACHER
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch course {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or(AppError::NotFound("Course not found".to_string()))?;

    Ok(Json(course))
}

pub async fn create_course(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    validate_window(payload.start_date, payload.end_date)?;

    // Sanitize description to prevent XSS
    let description = payload.description.as_deref().map(clean_html);

    let course = sqlx::query_as::<_, Course>(
        r#"
        INSERT INTO courses (name, description, level, teacher_id, capacity, price, start_date, end_date)
        VALUES ($1, $2, $3, $4, COALESCE($5, 30), $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(&payload.name)
    .bind(description)
    .bind(&payload.level)
    .bind(payload.teacher_id)
    .bind(payload.capacity)
    .bind(payload.price)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            AppError::BadRequest("Teacher does not exist".to_string())
        } else {
            tracing::error!("Failed to create course: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(course)))
}

pub async fn update_course(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    validate_window(payload.start_date, payload.end_date)?;

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE courses SET ");
    let mut separated = builder.separated(", ");

    if let Some(name) = payload.name {
        separated.push("name = ");
        separated.push_bind_unseparated(name);
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(clean_html(&description));
    }

    if let Some(level) = payload.level {
        separated.push("level = ");
        separated.push_bind_unseparated(level);
    }

    if let Some(teacher_id) = payload.teacher_id {
        separated.push("teacher_id = ");
        separated.push_bind_unseparated(teacher_id);
    }

    if let Some(capacity) = payload.capacity {
        separated.push("capacity = ");
        separated.push_bind_unseparated(capacity);
    }

    if let Some(price) = payload.price {
        separated.push("price = ");
        separated.push_bind_unseparated(price);
    }

    if let Some(start_date) = payload.start_date {
        separated.push("start_date = ");
        separated.push_bind_unseparated(start_date);
    }

    if let Some(end_date) = payload.end_date {
        separated.push("end_date = ");
        separated.push_bind_unseparated(end_date);
    }

    separated.push("updated_at = NOW()");

    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");

    let course = builder
        .build_query_as::<Course>()
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::BadRequest("Teacher does not exist".to_string())
            } else {
                tracing::error!("Failed to update course {}: {:?}", id, e);
                AppError::InternalServerError(e.to_string())
            }
        })?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    Ok(Json(course))
}

pub async fn delete_course(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::Conflict("Course still has classes or exams".to_string())
            } else {
                tracing::error!("Failed to delete course {}: {:?}", id, e);
                AppError::InternalServerError(e.to_string())
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
