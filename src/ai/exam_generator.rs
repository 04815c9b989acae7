// src/ai/exam_generator.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    ai::{CompletionClient, CompletionRequest, extract_json},
    error::AppError,
};

const SYSTEM_PROMPT: &str = "You are an expert English language test designer specializing in \
CEFR-aligned assessments. You write balanced exams with varied question types. \
Always respond with valid JSON.";

/// DTO for requesting an AI-generated exam.
#[derive(Debug, Deserialize, Validate)]
pub struct ExamGeneratorRequest {
    #[validate(length(min = 1, max = 50))]
    pub exam_type: String,
    #[validate(length(min = 1, max = 10))]
    pub level: String,
    #[validate(custom(function = validate_skills))]
    pub skills: Vec<String>,
    #[validate(range(min = 1, max = 100))]
    pub question_count: u32,
    /// Falls back to `level` when absent.
    pub difficulty: Option<String>,
}

fn validate_skills(skills: &[String]) -> Result<(), validator::ValidationError> {
    if skills.is_empty() {
        return Err(validator::ValidationError::new("skills_cannot_be_empty"));
    }
    if skills.iter().any(|s| s.trim().is_empty()) {
        return Err(validator::ValidationError::new("skill_cannot_be_blank"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub question_text: String,
    #[serde(default)]
    pub question_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub points: i32,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamGeneratorResponse {
    pub exam_title: String,
    #[serde(default)]
    pub exam_type: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub duration: i32,
    #[serde(default)]
    pub passing_score: i32,
    #[serde(default)]
    pub total_points: i32,
    pub questions: Vec<GeneratedQuestion>,
}

fn build_prompt(req: &ExamGeneratorRequest) -> String {
    let difficulty = req
        .difficulty
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or(&req.level);

    format!(
        r#"Generate a {exam_type} English exam for CEFR level {level}.

Exam details:
- Type: {exam_type}
- Level: {level}
- Skills to test: {skills}
- Number of questions: {count}
- Difficulty: {difficulty}

Requirements:
1. Follow CEFR descriptors for {level}.
2. Write exactly {count} distinct questions.
3. Mix these question types: multiple_choice, true_false, short_answer, fill_blank, matching, reading_comprehension, writing.
4. Give each question 1-3 points according to its complexity, with all points summing to 100.
5. Give a short, unambiguous correct answer and a brief explanation for every question.
6. Reading comprehension questions share a 100-150 word passage, 3-5 questions per passage.

Reply with a JSON object of this shape:
{{
  "exam_title": "string",
  "exam_type": "{exam_type}",
  "level": "{level}",
  "duration": 60,
  "passing_score": 60,
  "total_points": 100,
  "questions": [
    {{
      "question_text": "string",
      "question_type": "multiple_choice|true_false|short_answer|fill_blank|matching|reading_comprehension|writing",
      "options": ["option1", "option2", "option3", "option4"],
      "correct_answer": "string",
      "points": 1,
      "explanation": "string",
      "passage": "string (reading_comprehension only)"
    }}
  ]
}}"#,
        exam_type = req.exam_type,
        level = req.level,
        skills = req.skills.join(", "),
        count = req.question_count,
        difficulty = difficulty,
    )
}

/// Asks the completion service for a full exam draft.
pub async fn generate_exam(
    client: &dyn CompletionClient,
    req: &ExamGeneratorRequest,
) -> Result<ExamGeneratorResponse, AppError> {
    let reply = client
        .complete(CompletionRequest::json(SYSTEM_PROMPT, build_prompt(req), 0.7))
        .await?;

    extract_json(&reply)
}
