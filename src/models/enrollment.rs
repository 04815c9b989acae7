// src/models/enrollment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'enrollments' table. One row per (student, course).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    /// 'active', 'completed' or 'dropped'.
    pub status: String,
    pub enrolled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEnrollmentRequest {
    pub student_id: i64,
    pub course_id: i64,
    #[validate(custom(function = validate_enrollment_status))]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EnrollmentListParams {
    pub student_id: Option<i64>,
    pub course_id: Option<i64>,
}

fn validate_enrollment_status(status: &str) -> Result<(), validator::ValidationError> {
    match status {
        "active" | "completed" | "dropped" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_enrollment_status")),
    }
}
