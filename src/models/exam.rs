// src/models/exam.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::{PublicQuestion, Question};

/// Represents the 'exams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,

    /// 'pre_registration', 'progress' or 'final'.
    pub exam_type: String,

    pub course_id: Option<i64>,

    /// Minutes.
    pub duration: i32,

    /// Percentage (0-100) a result must reach to pass.
    pub passing_score: i32,

    /// Points achievable across all questions. Must be positive to grade.
    pub total_points: i32,

    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,

    /// Whether the student paper shuffles question order.
    pub is_random: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Staff view: the exam with every question, answers included.
#[derive(Debug, Serialize)]
pub struct ExamWithQuestions {
    pub exam: Exam,
    pub questions: Vec<Question>,
}

/// Student view: the exam with its questions, answers hidden.
#[derive(Debug, Serialize)]
pub struct ExamPaper {
    pub exam: Exam,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 20000))]
    pub description: Option<String>,
    #[validate(custom(function = validate_exam_type))]
    pub exam_type: String,
    pub course_id: Option<i64>,
    #[validate(range(min = 1, max = 600))]
    pub duration: Option<i32>,
    #[validate(range(min = 0, max = 100))]
    pub passing_score: Option<i32>,
    #[validate(range(min = 1, max = 100000))]
    pub total_points: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_random: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExamRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 20000))]
    pub description: Option<String>,
    #[validate(custom(function = validate_exam_type))]
    pub exam_type: Option<String>,
    pub course_id: Option<i64>,
    #[validate(range(min = 1, max = 600))]
    pub duration: Option<i32>,
    #[validate(range(min = 0, max = 100))]
    pub passing_score: Option<i32>,
    #[validate(range(min = 1, max = 100000))]
    pub total_points: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_random: Option<bool>,
}

/// Query parameters for listing exams.
#[derive(Debug, Deserialize)]
pub struct ExamListParams {
    pub course_id: Option<i64>,
}

/// Restricts the exam type to the three kinds the academy runs.
fn validate_exam_type(exam_type: &str) -> Result<(), validator::ValidationError> {
    match exam_type {
        "pre_registration" | "progress" | "final" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_exam_type")),
    }
}

/// Rejects a scheduling window that ends before it starts.
pub fn validate_window(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<(), crate::error::AppError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(crate::error::AppError::BadRequest(
                "end_date must not be before start_date".to_string(),
            ));
        }
    }
    Ok(())
}
