// src/ai/adaptive.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    ai::{CompletionClient, CompletionRequest, extract_json},
    error::AppError,
};

/// CEFR levels, easiest first.
pub const CEFR_LEVELS: [&str; 6] = ["A1", "A2", "B1", "B2", "C1", "C2"];

const SYSTEM_PROMPT: &str = "You are an expert English language assessor specializing in CEFR \
level placement and adaptive testing. Always respond with valid JSON.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentQuestion {
    pub question_text: String,
    #[serde(default)]
    pub question_type: Option<String>,
    #[serde(default)]
    pub answered_correctly: Option<bool>,
}

/// DTO for a difficulty recommendation.
#[derive(Debug, Deserialize, Validate)]
pub struct AdaptiveDifficultyRequest {
    #[validate(length(min = 1, max = 10))]
    pub current_level: String,
    pub correct_answers: u32,
    pub total_questions: u32,
    #[serde(default)]
    pub recent_questions: Vec<RecentQuestion>,
    #[serde(default)]
    pub student_id: Option<String>,
}

impl AdaptiveDifficultyRequest {
    /// Field validation plus the cross-field count check.
    pub fn check(&self) -> Result<(), AppError> {
        self.validate()?;
        if self.correct_answers > self.total_questions {
            return Err(AppError::BadRequest(
                "correct_answers cannot exceed total_questions".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdaptiveDifficultyResponse {
    pub recommended_level: String,
    pub confidence: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question_type: Option<String>,
}

/// Table-driven outcome, independent of the completion service.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub level: String,
    pub confidence: f64,
    pub accuracy: f64,
}

/// Fields the model may contribute. Level and confidence always come from the table.
#[derive(Debug, Default, Deserialize)]
struct Enrichment {
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    next_question_type: Option<String>,
}

/// Applies the accuracy thresholds to the CEFR ladder.
///
/// Unknown levels are held with confidence 0.5. Advancing past C2 or
/// regressing below A1 also holds the current level with confidence 0.5.
pub fn recommend(
    current_level: &str,
    correct_answers: u32,
    total_questions: u32,
) -> Recommendation {
    let accuracy = if total_questions > 0 {
        correct_answers as f64 / total_questions as f64
    } else {
        0.0
    };

    let Some(index) = CEFR_LEVELS.iter().position(|l| *l == current_level) else {
        return Recommendation {
            level: current_level.to_string(),
            confidence: 0.5,
            accuracy,
        };
    };

    let top = CEFR_LEVELS.len() - 1;
    let (target, confidence) = if accuracy >= 0.9 && index < top {
        (index + 1, 0.85)
    } else if accuracy >= 0.9 {
        (index, 0.5)
    } else if accuracy >= 0.75 {
        (index, 0.9)
    } else if accuracy >= 0.6 {
        (index, 0.75)
    } else if index > 0 {
        (index - 1, 0.8)
    } else {
        (index, 0.5)
    };

    Recommendation {
        level: CEFR_LEVELS[target].to_string(),
        confidence,
        accuracy,
    }
}

fn build_prompt(req: &AdaptiveDifficultyRequest, rec: &Recommendation) -> String {
    let recent = req
        .recent_questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let outcome = match q.answered_correctly {
                Some(true) => "correct",
                Some(false) => "incorrect",
                None => "unknown",
            };
            format!(
                "Q{}: {} (type: {}, answer: {})",
                i + 1,
                q.question_text,
                q.question_type.as_deref().unwrap_or("unspecified"),
                outcome
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Student performance:
- Current level: {current}
- Accuracy: {accuracy:.2}% ({correct}/{total} correct)
- Recommended level: {recommended}

Recent questions:
{recent}

Identify specific strengths and weaknesses (grammar areas, vocabulary domains, skills) and suggest the next question type that would best confirm the placement.

Reply with a JSON object of this shape:
{{
  "strengths": ["string"],
  "weaknesses": ["string"],
  "next_question_type": "multiple_choice|true_false|fill_blank|reading_comprehension|writing"
}}"#,
        current = req.current_level,
        accuracy = rec.accuracy * 100.0,
        correct = req.correct_answers,
        total = req.total_questions,
        recommended = rec.level,
        recent = if recent.is_empty() { "(none)".to_string() } else { recent },
    )
}

async fn enrich(
    client: &dyn CompletionClient,
    req: &AdaptiveDifficultyRequest,
    rec: &Recommendation,
) -> Result<Enrichment, AppError> {
    let reply = client
        .complete(CompletionRequest::json(SYSTEM_PROMPT, build_prompt(req, rec), 0.5))
        .await?;

    extract_json(&reply)
}

/// Recommends the next level. Never fails: when the model cannot be reached
/// or its reply cannot be parsed, the table result is returned as is.
pub async fn adaptive_difficulty(
    client: &dyn CompletionClient,
    req: &AdaptiveDifficultyRequest,
) -> AdaptiveDifficultyResponse {
    let rec = recommend(&req.current_level, req.correct_answers, req.total_questions);

    let enrichment = match enrich(client, req, &rec).await {
        Ok(enrichment) => enrichment,
        Err(e) => {
            tracing::warn!("Adaptive difficulty enrichment unavailable, using table result: {}", e);
            Enrichment::default()
        }
    };

    AdaptiveDifficultyResponse {
        recommended_level: rec.level,
        confidence: rec.confidence,
        strengths: enrichment.strengths,
        weaknesses: enrichment.weaknesses,
        next_question_type: enrichment.next_question_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl CompletionClient for Unreachable {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, AppError> {
            Err(AppError::InternalServerError("connection refused".to_string()))
        }
    }

    struct Canned(&'static str);

    #[async_trait]
    impl CompletionClient for Canned {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, AppError> {
            Ok(self.0.to_string())
        }
    }

    fn request(level: &str, correct: u32, total: u32) -> AdaptiveDifficultyRequest {
        AdaptiveDifficultyRequest {
            current_level: level.to_string(),
            correct_answers: correct,
            total_questions: total,
            recent_questions: vec![],
            student_id: None,
        }
    }

    #[test]
    fn test_recommend_thresholds() {
        assert_eq!(recommend("B1", 9, 10).level, "B2");
        assert_eq!(recommend("B1", 9, 10).confidence, 0.85);

        let hold_high = recommend("B1", 8, 10);
        assert_eq!((hold_high.level.as_str(), hold_high.confidence), ("B1", 0.9));

        let hold_mid = recommend("B1", 6, 10);
        assert_eq!((hold_mid.level.as_str(), hold_mid.confidence), ("B1", 0.75));

        let regress = recommend("B1", 5, 10);
        assert_eq!((regress.level.as_str(), regress.confidence), ("A2", 0.8));
    }

    #[test]
    fn test_recommend_boundary_accuracy() {
        // 3/4 is exactly 0.75, which holds with high confidence.
        assert_eq!(recommend("A2", 3, 4).confidence, 0.9);
        // 3/5 is exactly 0.6, which holds with medium confidence.
        assert_eq!(recommend("A2", 3, 5).confidence, 0.75);
    }

    #[test]
    fn test_recommend_holds_at_ladder_ends_with_low_confidence() {
        let top = recommend("C2", 10, 10);
        assert_eq!((top.level.as_str(), top.confidence), ("C2", 0.5));

        let bottom = recommend("A1", 0, 10);
        assert_eq!((bottom.level.as_str(), bottom.confidence), ("A1", 0.5));

        // Holding bands are unaffected at the ends.
        assert_eq!(recommend("C2", 8, 10).confidence, 0.9);
        assert_eq!(recommend("A1", 6, 10).confidence, 0.75);
    }

    #[test]
    fn test_recommend_unknown_level_and_no_questions() {
        let unknown = recommend("Z9", 10, 10);
        assert_eq!((unknown.level.as_str(), unknown.confidence), ("Z9", 0.5));

        let empty = recommend("B2", 0, 0);
        assert_eq!(empty.accuracy, 0.0);
        assert_eq!(empty.level, "B1");
    }

    #[test]
    fn test_validation_rejects_more_correct_than_total() {
        assert!(matches!(request("B1", 11, 10).check(), Err(AppError::BadRequest(_))));
        assert!(request("", 1, 10).check().is_err());
        assert!(request("B1", 10, 10).check().is_ok());
    }

    #[tokio::test]
    async fn test_falls_back_when_service_fails() {
        let resp = adaptive_difficulty(&Unreachable, &request("B1", 9, 10)).await;

        assert_eq!(resp.recommended_level, "B2");
        assert_eq!(resp.confidence, 0.85);
        assert!(resp.strengths.is_empty());
        assert!(resp.weaknesses.is_empty());
    }

    #[tokio::test]
    async fn test_falls_back_on_unparseable_reply() {
        let client = Canned("I cannot help with that.");
        let resp = adaptive_difficulty(&client, &request("B1", 9, 10)).await;
        assert_eq!(resp.recommended_level, "B2");
        assert!(resp.next_question_type.is_none());
    }

    #[tokio::test]
    async fn test_model_only_enriches_explanations() {
        let reply = r#"{"recommended_level": "C2", "confidence": 0.1,
            "strengths": ["past tenses"], "weaknesses": ["phrasal verbs"],
            "next_question_type": "writing"}"#;
        let resp = adaptive_difficulty(&Canned(reply), &request("B1", 9, 10)).await;

        assert_eq!(resp.recommended_level, "B2");
        assert_eq!(resp.confidence, 0.85);
        assert_eq!(resp.strengths, vec!["past tenses"]);
        assert_eq!(resp.weaknesses, vec!["phrasal verbs"]);
        assert_eq!(resp.next_question_type.as_deref(), Some("writing"));
    }
}
