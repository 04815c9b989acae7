// src/models/course.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'courses' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: String,

    /// Sanitized HTML.
    pub description: Option<String>,

    pub level: Option<String>,
    pub teacher_id: Option<i64>,

    /// Maximum number of enrolled students.
    pub capacity: i32,

    pub price: Option<f64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A course joined with its teacher's name.
#[derive(Debug, Serialize, FromRow)]
pub struct CourseWithTeacher {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub course: Course,
    pub teacher_first_name: Option<String>,
    pub teacher_last_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 20000))]
    pub description: Option<String>,
    #[validate(length(max = 50))]
    pub level: Option<String>,
    pub teacher_id: Option<i64>,
    #[validate(range(min = 1, max = 10000))]
    pub capacity: Option<i32>,
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCourseRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 20000))]
    pub description: Option<String>,
    #[validate(length(max = 50))]
    pub level: Option<String>,
    pub teacher_id: Option<i64>,
    #[validate(range(min = 1, max = 10000))]
    pub capacity: Option<i32>,
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}
