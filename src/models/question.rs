// src/models/question.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use url::Url;
use validator::Validate;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub exam_id: i64,
    pub question_text: String,

    /// e.g. 'multiple_choice', 'true_false', 'short_answer'.
    pub question_type: String,

    /// Choices for multiple choice questions.
    /// Stored as a JSON array in the database.
    pub options: Option<Json<Vec<String>>>,

    /// Compared to submissions by exact, case-sensitive equality.
    pub correct_answer: String,

    pub points: i32,

    /// Display position within the exam.
    #[serde(rename = "order")]
    pub order_num: i32,

    /// Reading text shared by comprehension questions.
    pub passage: Option<String>,
    pub audio_url: Option<String>,
    pub explanation: Option<String>,
    pub grading_rubric: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for sending a question to a student (excludes answer, explanation and rubric).
#[derive(Debug, Serialize, FromRow)]
pub struct PublicQuestion {
    pub id: i64,
    pub exam_id: i64,
    pub question_text: String,
    pub question_type: String,
    pub options: Option<Json<Vec<String>>>,
    pub points: i32,
    #[serde(rename = "order")]
    pub order_num: i32,
    pub passage: Option<String>,
    pub audio_url: Option<String>,
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    pub exam_id: i64,
    #[validate(length(min = 1, max = 5000))]
    pub question_text: String,
    #[validate(length(min = 1, max = 50))]
    pub question_type: Option<String>,
    #[validate(custom(function = validate_options))]
    pub options: Option<Vec<String>>,
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: String,
    #[validate(range(min = 0, max = 1000))]
    pub points: Option<i32>,
    #[serde(rename = "order")]
    pub order_num: Option<i32>,
    #[validate(length(max = 20000))]
    pub passage: Option<String>,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub audio_url: Option<String>,
    #[validate(length(max = 5000))]
    pub explanation: Option<String>,
    #[validate(length(max = 5000))]
    pub grading_rubric: Option<String>,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    pub exam_id: Option<i64>,
    #[validate(length(min = 1, max = 5000))]
    pub question_text: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub question_type: Option<String>,
    #[validate(custom(function = validate_options))]
    pub options: Option<Vec<String>>,
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: Option<String>,
    #[validate(range(min = 0, max = 1000))]
    pub points: Option<i32>,
    #[serde(rename = "order")]
    pub order_num: Option<i32>,
    #[validate(length(max = 20000))]
    pub passage: Option<String>,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub audio_url: Option<String>,
    #[validate(length(max = 5000))]
    pub explanation: Option<String>,
    #[validate(length(max = 5000))]
    pub grading_rubric: Option<String>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.is_empty() {
        return Err(validator::ValidationError::new("options_cannot_be_empty"));
    }
    for opt in options {
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

/// Validates that a string is a correctly formatted URL.
fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateQuestionRequest {
        serde_json::from_value(serde_json::json!({
            "exam_id": 1,
            "question_text": "Choose the past tense of 'go'.",
            "question_type": "multiple_choice",
            "options": ["goed", "went", "gone"],
            "correct_answer": "went",
            "points": 5,
            "order": 2
        }))
        .unwrap()
    }

    #[test]
    fn test_order_field_maps_to_order_num() {
        assert_eq!(request().order_num, Some(2));
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_empty_options_rejected() {
        let mut req = request();
        req.options = Some(vec![]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_audio_url_must_parse() {
        let mut req = request();
        req.audio_url = Some("not a url".to_string());
        assert!(req.validate().is_err());

        req.audio_url = Some("https://cdn.example.com/listening/1.mp3".to_string());
        assert!(req.validate().is_ok());
    }
}
