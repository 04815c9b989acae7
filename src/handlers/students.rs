// src/handlers/students.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::{AppError, is_foreign_key_violation, is_unique_violation},
    models::{
        class::ClassWithDetails,
        student::{CreateStudentRequest, Student, UpdateStudentRequest},
    },
};

/// Lists all students, newest first.
pub async fn list_students(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let students = sqlx::query_as::<_, Student>("SELECT * FROM students ORDER BY created_at DESC")
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list students: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(students))
}

pub async fn get_student(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch student {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?
        .ok_or(AppError::NotFound("Student not found".to_string()))?;

    Ok(Json(student))
}

pub async fn create_student(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let student = sqlx::query_as::<_, Student>(
        r#"
        INSERT INTO students (first_name, last_name, email, phone, level)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(&payload.level)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Email '{}' is already registered", payload.email))
        } else {
            tracing::error!("Failed to create student: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(student)))
}

/// Partially updates a student. Only fields present in the body are written.
pub async fn update_student(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE students SET ");
    let mut separated = builder.separated(", ");

    if let Some(first_name) = payload.first_name {
        separated.push("first_name = ");
        separated.push_bind_unseparated(first_name);
    }

    if let Some(last_name) = payload.last_name {
        separated.push("last_name = ");
        separated.push_bind_unseparated(last_name);
    }

    if let Some(email) = payload.email {
        separated.push("email = ");
        separated.push_bind_unseparated(email);
    }

    if let Some(phone) = payload.phone {
        separated.push("phone = ");
        separated.push_bind_unseparated(phone);
    }

    if let Some(level) = payload.level {
        separated.push("level = ");
        separated.push_bind_unseparated(level);
    }

    separated.push("updated_at = NOW()");

    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");

    let student = builder
        .build_query_as::<Student>()
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Email is already registered".to_string())
            } else {
                tracing::error!("Failed to update student {}: {:?}", id, e);
                AppError::InternalServerError(e.to_string())
            }
        })?
        .ok_or(AppError::NotFound("Student not found".to_string()))?;

    Ok(Json(student))
}

pub async fn delete_student(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM students WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::Conflict("Student still has exam results".to_string())
            } else {
                tracing::error!("Failed to delete student {}: {:?}", id, e);
                AppError::InternalServerError(e.to_string())
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Student not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Lists the classes of every course the student is enrolled in.
pub async fn list_student_classes(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let classes = sqlx::query_as::<_, ClassWithDetails>(
        r#"
        SELECT cl.*,
            co.name AS course_name,
            t.first_name AS teacher_first_name,
            t.last_name AS teacher_last_name
        FROM classes cl
        JOIN enrollments en ON en.course_id = cl.course_id
        LEFT JOIN courses co ON co.id = cl.course_id
        LEFT JOIN teachers t ON t.id = cl.teacher_id
        WHERE en.student_id = $1
        ORDER BY cl.class_date ASC NULLS LAST
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list classes of student {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(classes))
}
