// src/models/exam_result.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

/// Represents the 'exam_results' table in the database.
/// One row per submitted attempt.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: i64,
    pub exam_id: i64,
    pub student_id: i64,

    /// Percentage of the exam's total points earned (0-100, unrounded).
    pub score: f64,

    pub total_points: i32,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Seconds between start and completion.
    pub time_taken: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row for the result list, joined with student and exam.
#[derive(Debug, Serialize, FromRow)]
pub struct ExamResultSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub result: ExamResult,
    pub student_first_name: String,
    pub student_last_name: String,
    pub exam_title: String,
}

/// One graded answer joined with its question.
#[derive(Debug, Serialize, FromRow)]
pub struct AnswerDetail {
    pub id: i64,
    pub question_id: i64,
    pub selected_answer: Option<String>,
    pub is_correct: bool,
    pub points_earned: i32,
    pub question_text: String,
    pub question_type: String,
    pub options: Option<Json<Vec<String>>>,
    pub correct_answer: String,
    pub points: i32,
}

#[derive(Debug, Serialize)]
pub struct ExamResultDetails {
    pub result: ExamResult,
    pub answers: Vec<AnswerDetail>,
}

/// DTO for submitting an exam attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitExamRequest {
    pub exam_id: i64,
    pub student_id: i64,

    /// Key: question id. Value: the student's answer text.
    #[serde(default)]
    pub answers: BTreeMap<i64, String>,

    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Query parameters for listing results.
#[derive(Debug, Deserialize)]
pub struct ExamResultListParams {
    pub student_id: Option<i64>,
    pub exam_id: Option<i64>,
}

/// Outcome stored in `exam_results.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStatus {
    InProgress,
    Passed,
    Failed,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::InProgress => "in_progress",
            ResultStatus::Passed => "passed",
            ResultStatus::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_request_accepts_string_keys() {
        let req: SubmitExamRequest = serde_json::from_value(serde_json::json!({
            "exam_id": 3,
            "student_id": 7,
            "answers": { "12": "B", "15": "true" }
        }))
        .unwrap();

        assert_eq!(req.answers.get(&12).map(String::as_str), Some("B"));
        assert_eq!(req.answers.len(), 2);
        assert!(req.started_at.is_none());
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(ResultStatus::Passed.as_str(), "passed");
        assert_eq!(ResultStatus::Failed.as_str(), "failed");
        assert_eq!(ResultStatus::InProgress.as_str(), "in_progress");
    }
}
