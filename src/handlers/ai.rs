// src/handlers/ai.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    ai::{
        CompletionClient,
        adaptive::{self, AdaptiveDifficultyRequest},
        chat::{ChatRequest, ChatSessionStore},
        exam_generator::{self, ExamGeneratorRequest},
        writing::{self, RubricRequest, WritingEvaluationRequest},
    },
    error::AppError,
};

/// Drafts a complete exam for review. Nothing is stored.
pub async fn generate_exam(
    State(llm): State<Arc<dyn CompletionClient>>,
    Json(payload): Json<ExamGeneratorRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let exam = exam_generator::generate_exam(llm.as_ref(), &payload)
        .await
        .map_err(|e| {
            tracing::error!("Exam generation failed: {}", e);
            e
        })?;

    tracing::info!(
        "Generated {} exam '{}' with {} questions",
        payload.level,
        exam.exam_title,
        exam.questions.len()
    );

    Ok(Json(exam))
}

pub async fn chat(
    State(llm): State<Arc<dyn CompletionClient>>,
    State(sessions): State<ChatSessionStore>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let reply = sessions.chat(llm.as_ref(), &payload).await?;

    Ok(Json(reply))
}

pub async fn clear_chat_history(
    State(sessions): State<ChatSessionStore>,
    Path(student_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let cleared = sessions.clear(&student_id);

    Ok(Json(serde_json::json!({
        "student_id": student_id,
        "cleared": cleared,
        "message": "Chat history cleared"
    })))
}

pub async fn evaluate_writing(
    State(llm): State<Arc<dyn CompletionClient>>,
    Json(payload): Json<WritingEvaluationRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let evaluation = writing::evaluate_writing(llm.as_ref(), &payload).await?;

    Ok(Json(evaluation))
}

pub async fn generate_rubric(
    State(llm): State<Arc<dyn CompletionClient>>,
    Json(payload): Json<RubricRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let rubric = writing::generate_rubric(llm.as_ref(), &payload).await?;

    Ok(Json(rubric))
}

/// Always answers once the request is valid; the model is optional here.
pub async fn adaptive_difficulty(
    State(llm): State<Arc<dyn CompletionClient>>,
    Json(payload): Json<AdaptiveDifficultyRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.check()?;

    Ok(Json(adaptive::adaptive_difficulty(llm.as_ref(), &payload).await))
}
