// src/models/class.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'classes' table: one scheduled lesson of a course.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Class {
    pub id: i64,
    pub course_id: Option<i64>,
    pub teacher_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub class_date: Option<DateTime<Utc>>,

    /// Minutes.
    pub duration: i32,

    pub room: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A class joined with its course name and teacher name.
#[derive(Debug, Serialize, FromRow)]
pub struct ClassWithDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub class: Class,
    pub course_name: Option<String>,
    pub teacher_first_name: Option<String>,
    pub teacher_last_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClassRequest {
    pub course_id: i64,
    pub teacher_id: i64,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 20000))]
    pub description: Option<String>,
    pub class_date: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 1440))]
    pub duration: Option<i32>,
    #[validate(length(max = 50))]
    pub room: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClassRequest {
    pub course_id: Option<i64>,
    pub teacher_id: Option<i64>,
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 20000))]
    pub description: Option<String>,
    pub class_date: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 1440))]
    pub duration: Option<i32>,
    #[validate(length(max = 50))]
    pub room: Option<String>,
}

/// An entry of the merged class/exam schedule.
#[derive(Debug, Serialize, FromRow)]
pub struct ScheduleEvent {
    /// 'class' or 'exam'.
    #[serde(rename = "type")]
    pub event_type: String,
    pub id: i64,
    pub title: String,
    pub date: Option<DateTime<Utc>>,
    pub duration: Option<i32>,
    pub room: Option<String>,
    pub course_name: Option<String>,
    pub teacher_first_name: Option<String>,
    pub teacher_last_name: Option<String>,
}

/// Query parameters for the schedule.
#[derive(Debug, Deserialize)]
pub struct ScheduleParams {
    /// 'student' or 'teacher'. Anything else returns the whole schedule.
    pub user_type: Option<String>,
    pub user_id: Option<i64>,
}
