// src/handlers/teachers.rs

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
        teacher::{CreateTeacherRequest, Teacher, UpdateTeacherRequest},
    },
};

pub async fn list_teachers(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let teachers = sqlx::query_as::<_, Teacher>("SELECT * FROM teachers ORDER BY created_at DESC")
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list teachers: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(teachers))
}

pub async fn get_teacher(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let teacher = sqlx::query_as::<_, Teacher>("SELECT * FROM teachers WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch teacher {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?
        .ok_or(AppError::NotFound("Teacher not found".to_string()))?;

    Ok(Json(teacher))
}

pub async fn create_teacher(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateTeacherRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let teacher = sqlx::query_as::<_, Teacher>(
        r#"
        INSERT INTO teachers (first_name, last_name, email, phone, specialty)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(&payload.specialty)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Email '{}' is already registered", payload.email))
        } else {
            tracing::error!("Failed to create teacher: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(teacher)))
}

pub async fn update_teacher(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTeacherRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE teachers SET ");
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

    if let Some(specialty) = payload.specialty {
        separated.push("specialty = ");
        separated.push_bind_unseparated(specialty);
    }

    separated.push("updated_at = NOW()");

    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");

    let teacher = builder
        .build_query_as::<Teacher>()
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Email is already registered".to_string())
            } else {
                tracing::error!("Failed to update teacher {}: {:?}", id, e);
                AppError::InternalServerError(e.to_string())
            }
        })?
        .ok_or(AppError::NotFound("Teacher not found".to_string()))?;

    Ok(Json(teacher))
}

/// Deletes a teacher. Fails with 409 while courses or classes still reference them.
pub async fn delete_teacher(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM teachers WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::Conflict("Teacher is still assigned to courses or classes".to_string())
            } else {
                tracing::error!("Failed to delete teacher {}: {:?}", id, e);
                AppError::InternalServerError(e.to_string())
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Teacher not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Lists the classes a teacher runs, in date order.
pub async fn list_teacher_classes(
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
        LEFT JOIN courses co ON co.id = cl.course_id
        LEFT JOIN teachers t ON t.id = cl.teacher_id
        WHERE cl.teacher_id = $1
        ORDER BY cl.class_date ASC NULLS LAST
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list classes of teacher {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(classes))
}
