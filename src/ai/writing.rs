// src/ai/writing.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::{
    ai::{CompletionClient, CompletionRequest, extract_json},
    config::{DEFAULT_MAX_POINTS, DEFAULT_STUDENT_LEVEL},
    error::AppError,
};

const GRADER_SYSTEM_PROMPT: &str = "You are an expert English language grader. You evaluate \
student writing for grammar, vocabulary, content and organization, and give fair, encouraging, \
actionable feedback. Always respond with valid JSON.";

const RUBRIC_SYSTEM_PROMPT: &str = "You are an expert English language assessor. You write \
clear, fair grading rubrics aligned with CEFR standards. Always respond with valid JSON.";

/// DTO for grading a free-text answer.
#[derive(Debug, Deserialize, Validate)]
pub struct WritingEvaluationRequest {
    pub question_id: Option<i64>,
    #[validate(length(min = 1, max = 5000))]
    pub question_text: String,
    #[validate(length(min = 1, max = 20000))]
    pub student_answer: String,
    pub student_level: Option<String>,
    #[validate(range(min = 1, max = 1000))]
    pub max_points: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritingEvaluationResponse {
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub max_score: i32,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_text: Option<String>,
    #[serde(default)]
    pub suggestions: String,
}

/// DTO for generating a grading rubric.
#[derive(Debug, Deserialize, Validate)]
pub struct RubricRequest {
    #[validate(length(min = 1, max = 5000))]
    pub question_text: String,
    #[validate(length(min = 1, max = 50))]
    pub question_type: String,
    #[validate(range(min = 1, max = 1000))]
    pub max_points: Option<i32>,
    pub level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricCriterion {
    pub criteria: String,
    pub max_points: i32,
    #[serde(default)]
    pub description: String,
}

fn level_or_default(level: Option<&str>) -> &str {
    level.filter(|l| !l.trim().is_empty()).unwrap_or(DEFAULT_STUDENT_LEVEL)
}

fn build_evaluation_prompt(req: &WritingEvaluationRequest, level: &str, max_points: i32) -> String {
    format!(
        r#"Evaluate the following written answer.

Question: {question}
Student level: {level} (CEFR)
Student answer: {answer}

Criteria (total {max} points):
1. Grammar accuracy (30%): tenses, sentence structure, grammar rules
2. Vocabulary (25%): word choice, range, precision
3. Content and relevance (25%): answers the prompt and stays on topic
4. Coherence and organization (20%): logical flow, paragraphs, transitions

Score the answer out of {max}, name 2-3 strengths and 2-3 areas to improve, optionally give a corrected version, and end with concrete suggestions.

Reply with a JSON object of this shape:
{{
  "score": 0,
  "max_score": {max},
  "feedback": "string",
  "strengths": ["string"],
  "improvements": ["string"],
  "corrected_text": "string",
  "suggestions": "string"
}}"#,
        question = req.question_text,
        level = level,
        answer = req.student_answer,
        max = max_points,
    )
}

/// Grades a free-text answer against the four writing criteria.
pub async fn evaluate_writing(
    client: &dyn CompletionClient,
    req: &WritingEvaluationRequest,
) -> Result<WritingEvaluationResponse, AppError> {
    let level = level_or_default(req.student_level.as_deref());
    let max_points = req.max_points.unwrap_or(DEFAULT_MAX_POINTS);

    let reply = client
        .complete(CompletionRequest::json(
            GRADER_SYSTEM_PROMPT,
            build_evaluation_prompt(req, level, max_points),
            0.6,
        ))
        .await?;

    let mut result: WritingEvaluationResponse = extract_json(&reply)?;
    result.max_score = max_points;
    result.score = result.score.clamp(0, max_points);

    Ok(result)
}

fn build_rubric_prompt(req: &RubricRequest, level: &str, max_points: i32) -> String {
    format!(
        r#"Write a grading rubric for the following question.

Question type: {kind}
Question: {question}
Student level: {level} (CEFR)
Max points: {max}

Use 3-5 criteria whose points sum to {max}, each with a description of what is expected at this level.

Reply with a JSON object of this shape:
{{
  "rubric": [
    {{ "criteria": "string", "max_points": 0, "description": "string" }}
  ]
}}"#,
        kind = req.question_type,
        question = req.question_text,
        level = level,
        max = max_points,
    )
}

/// Accepts either a bare array of criteria or an object wrapping one.
fn parse_rubric(value: Value) -> Result<Vec<RubricCriterion>, AppError> {
    let list = match value {
        Value::Array(_) => value,
        Value::Object(map) => map
            .into_iter()
            .map(|(_, v)| v)
            .find(Value::is_array)
            .ok_or_else(|| {
                AppError::InternalServerError("Rubric reply has no criteria list".to_string())
            })?,
        _ => {
            return Err(AppError::InternalServerError(
                "Rubric reply is not a JSON object or array".to_string(),
            ));
        }
    };

    serde_json::from_value(list)
        .map_err(|e| AppError::InternalServerError(format!("Failed to parse rubric: {}", e)))
}

/// Asks the completion service for a rubric.
pub async fn generate_rubric(
    client: &dyn CompletionClient,
    req: &RubricRequest,
) -> Result<Vec<RubricCriterion>, AppError> {
    let level = level_or_default(req.level.as_deref());
    let max_points = req.max_points.unwrap_or(DEFAULT_MAX_POINTS);

    let reply = client
        .complete(CompletionRequest::json(
            RUBRIC_SYSTEM_PROMPT,
            build_rubric_prompt(req, level, max_points),
            0.5,
        ))
        .await?;

    parse_rubric(extract_json(&reply)?)
}
