// src/handlers/classes.rs

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
    models::class::{
        Class, ClassWithDetails, CreateClassRequest, ScheduleEvent, ScheduleParams,
        UpdateClassRequest,
    },
    utils::html::clean_html,
};

const CLASS_WITH_DETAILS: &str = r#"
    SELECT cl.*,
        co.name AS course_name,
        t.first_name AS teacher_first_name,
        t.last_name AS teacher_last_name
    FROM classes cl
    LEFT JOIN courses co ON co.id = cl.course_id
    LEFT JOIN teachers t ON t.id = cl.teacher_id
"#;

pub async fn list_classes(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let classes = sqlx::query_as::<_, ClassWithDetails>(&format!(
        "{} ORDER BY cl.class_date ASC NULLS LAST",
        CLASS_WITH_DETAILS
    ))
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list classes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(classes))
}

pub async fn get_class(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let class = sqlx::query_as::<_, ClassWithDetails>(&format!(
        "{} WHERE cl.id = $1",
        CLASS_WITH_DETAILS
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch class {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or(AppError::NotFound("Class not found".to_string()))?;

    Ok(Json(class))
}

pub async fn create_class(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let description = payload.description.as_deref().map(clean_html);

    let class = sqlx::query_as::<_, Class>(
        r#"
        INSERT INTO classes (course_id, teacher_id, title, description, class_date, duration, room)
        VALUES ($1, $2, $3, $4, $5, COALESCE($6, 60), $7)
        RETURNING *
        "#,
    )
    .bind(payload.course_id)
    .bind(payload.teacher_id)
    .bind(&payload.title)
    .bind(description)
    .bind(payload.class_date)
    .bind(payload.duration)
    .bind(&payload.room)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            AppError::BadRequest("Course or teacher does not exist".to_string())
        } else {
            tracing::error!("Failed to create class: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(class)))
}

pub async fn update_class(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE classes SET ");
    let mut separated = builder.separated(", ");

    if let Some(course_id) = payload.course_id {
        separated.push("course_id = ");
        separated.push_bind_unseparated(course_id);
    }

    if let Some(teacher_id) = payload.teacher_id {
        separated.push("teacher_id = ");
        separated.push_bind_unseparated(teacher_id);
    }

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(clean_html(&description));
    }

    if let Some(class_date) = payload.class_date {
        separated.push("class_date = ");
        separated.push_bind_unseparated(class_date);
    }

    if let Some(duration) = payload.duration {
        separated.push("duration = ");
        separated.push_bind_unseparated(duration);
    }

    if let Some(room) = payload.room {
        separated.push("room = ");
        separated.push_bind_unseparated(room);
    }

    separated.push("updated_at = NOW()");

    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");

    let class = builder
        .build_query_as::<Class>()
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::BadRequest("Course or teacher does not exist".to_string())
            } else {
                tracing::error!("Failed to update class {}: {:?}", id, e);
                AppError::InternalServerError(e.to_string())
            }
        })?
        .ok_or(AppError::NotFound("Class not found".to_string()))?;

    Ok(Json(class))
}

pub async fn delete_class(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM classes WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete class {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Class not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScheduleScope {
    Teacher(i64),
    Student(i64),
    All,
}

impl ScheduleScope {
    fn from_params(params: &ScheduleParams) -> Self {
        match (params.user_type.as_deref(), params.user_id) {
            (Some("teacher"), Some(id)) => ScheduleScope::Teacher(id),
            (Some("student"), Some(id)) => ScheduleScope::Student(id),
            _ => ScheduleScope::All,
        }
    }
}

/// Merged class and exam calendar, ordered by date.
///
/// * `user_type=teacher`: classes they teach, exams of their courses.
/// * `user_type=student`: classes and exams of the courses they are enrolled in.
/// * Anything else: every class and exam.
pub async fn get_schedule(
    State(pool): State<PgPool>,
    Query(params): Query<ScheduleParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"
        SELECT 'class' AS event_type, cl.id, cl.title, cl.class_date AS date,
            cl.duration, cl.room, co.name AS course_name,
            t.first_name AS teacher_first_name, t.last_name AS teacher_last_name
        FROM classes cl
        LEFT JOIN courses co ON co.id = cl.course_id
        LEFT JOIN teachers t ON t.id = cl.teacher_id
        WHERE 1 = 1
        "#,
    );

    let scope = ScheduleScope::from_params(&params);

    match scope {
        ScheduleScope::Teacher(id) => {
            builder.push(" AND cl.teacher_id = ");
            builder.push_bind(id);
        }
        ScheduleScope::Student(id) => {
            builder.push(" AND cl.course_id IN ");
            builder.push("(SELECT course_id FROM enrollments WHERE student_id = ");
            builder.push_bind(id);
            builder.push(")");
        }
        ScheduleScope::All => {}
    }

    builder.push(
        r#"
        UNION ALL
        SELECT 'exam' AS event_type, e.id, e.title, e.start_date AS date,
            e.duration, NULL AS room, co.name AS course_name,
            t.first_name AS teacher_first_name, t.last_name AS teacher_last_name
        FROM exams e
        LEFT JOIN courses co ON co.id = e.course_id
        LEFT JOIN teachers t ON t.id = co.teacher_id
        WHERE 1 = 1
        "#,
    );

    match scope {
        ScheduleScope::Teacher(id) => {
            builder.push(" AND co.teacher_id = ");
            builder.push_bind(id);
        }
        ScheduleScope::Student(id) => {
            builder.push(" AND e.course_id IN ");
            builder.push("(SELECT course_id FROM enrollments WHERE student_id = ");
            builder.push_bind(id);
            builder.push(")");
        }
        ScheduleScope::All => {}
    }

    builder.push(r#" ORDER BY "date" ASC NULLS LAST, event_type, id"#);

    let events = builder
        .build_query_as::<ScheduleEvent>()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to build schedule: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(events))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(user_type: Option<&str>, user_id: Option<i64>) -> ScheduleParams {
        ScheduleParams {
            user_type: user_type.map(str::to_string),
            user_id,
        }
    }

    #[test]
    fn test_schedule_scope() {
        let scope = |user_type, user_id| ScheduleScope::from_params(&params(user_type, user_id));

        assert_eq!(scope(Some("teacher"), Some(4)), ScheduleScope::Teacher(4));
        assert_eq!(scope(Some("student"), Some(9)), ScheduleScope::Student(9));
        assert_eq!(scope(Some("student"), None), ScheduleScope::All);
        assert_eq!(scope(Some("admin"), Some(1)), ScheduleScope::All);
        assert_eq!(scope(None, None), ScheduleScope::All);
    }
}
