// src/handlers/exam_results.rs

use std::collections::{BTreeMap, HashMap};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppError,
    models::exam_result::{
        AnswerDetail, ExamResult, ExamResultDetails, ExamResultListParams, ExamResultSummary,
        ResultStatus, SubmitExamRequest,
    },
};

/// Grading settings of the exam being submitted.
#[derive(sqlx::FromRow)]
struct ExamGrading {
    passing_score: i32,
    total_points: i32,
}

/// Helper struct for fetching answer keys.
#[derive(Debug, sqlx::FromRow)]
struct AnswerKey {
    id: i64,
    correct_answer: String,
    points: i32,
}

/// A submitted answer after comparison with its key.
#[derive(Debug, PartialEq)]
struct GradedAnswer {
    question_id: i64,
    selected_answer: String,
    is_correct: bool,
    points_earned: i32,
}

/// Grades every submitted answer that has a key.
/// Answers to questions outside the exam are dropped.
fn grade_answers(
    submitted: &BTreeMap<i64, String>,
    keys: &HashMap<i64, AnswerKey>,
) -> Vec<GradedAnswer> {
    submitted
        .iter()
        .filter_map(|(question_id, answer)| {
            let key = keys.get(question_id)?;
            // Strict string matching
            let is_correct = *answer == key.correct_answer;
            Some(GradedAnswer {
                question_id: *question_id,
                selected_answer: answer.clone(),
                is_correct,
                points_earned: if is_correct { key.points } else { 0 },
            })
        })
        .collect()
}

/// Percentage of `total_points` earned. Caller guarantees `total_points > 0`.
fn calculate_score(earned: i64, total_points: i32) -> f64 {
    earned as f64 / total_points as f64 * 100.0
}

fn result_status(score: f64, passing_score: i32) -> ResultStatus {
    if score >= passing_score as f64 {
        ResultStatus::Passed
    } else {
        ResultStatus::Failed
    }
}

fn elapsed_seconds(started_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> i32 {
    (completed_at - started_at)
        .num_seconds()
        .clamp(0, i32::MAX as i64) as i32
}

/// Submits an exam attempt, grades it and stores the result.
///
/// * Loads the exam and the answer keys of the submitted questions.
/// * Scores the attempt as a percentage of the exam's total points.
/// * Inserts the result and one answer row per graded question.
///
/// Everything runs in one transaction: on any failure nothing is stored.
pub async fn submit_exam(
    State(pool): State<PgPool>,
    Json(req): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await.map_err(|e| {
        tracing::error!("Failed to begin submission transaction: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let exam = sqlx::query_as::<_, ExamGrading>(
        "SELECT passing_score, total_points FROM exams WHERE id = $1",
    )
    .bind(req.exam_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load exam {}: {:?}", req.exam_id, e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    if exam.total_points <= 0 {
        return Err(AppError::BadRequest(
            "Exam total_points must be positive to grade a submission".to_string(),
        ));
    }

    let question_ids: Vec<i64> = req.answers.keys().copied().collect();

    let keys: HashMap<i64, AnswerKey> = sqlx::query_as::<_, AnswerKey>(
        "SELECT id, correct_answer, points FROM questions WHERE exam_id = $1 AND id = ANY($2)",
    )
    .bind(req.exam_id)
    .bind(&question_ids)
    .fetch_all(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load answer keys: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .into_iter()
    .map(|k| (k.id, k))
    .collect();

    let graded = grade_answers(&req.answers, &keys);
    let earned: i64 = graded.iter().map(|a| a.points_earned as i64).sum();
    let score = calculate_score(earned, exam.total_points);
    let status = result_status(score, exam.passing_score);

    let started_at = req.started_at.unwrap_or_else(Utc::now);
    let completed_at = req.completed_at.unwrap_or_else(Utc::now);
    let time_taken = elapsed_seconds(started_at, completed_at);

    let result = sqlx::query_as::<_, ExamResult>(
        r#"
        INSERT INTO exam_results
            (exam_id, student_id, score, total_points, status, started_at, completed_at, time_taken)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(req.exam_id)
    .bind(req.student_id)
    .bind(score)
    .bind(exam.total_points)
    .bind(status.as_str())
    .bind(started_at)
    .bind(completed_at)
    .bind(time_taken)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert exam result: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if !graded.is_empty() {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO answers (exam_result_id, question_id, selected_answer, is_correct, points_earned) ",
        );
        builder.push_values(&graded, |mut row, answer| {
            row.push_bind(result.id)
                .push_bind(answer.question_id)
                .push_bind(answer.selected_answer.clone())
                .push_bind(answer.is_correct)
                .push_bind(answer.points_earned);
        });

        builder.build().execute(&mut *tx).await.map_err(|e| {
            tracing::error!("Failed to insert answers for result {}: {:?}", result.id, e);
            AppError::InternalServerError(e.to_string())
        })?;
    }

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to commit exam submission: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!(
        "Exam {} submitted by student {}: score {:.2} ({}), {} of {} answers graded",
        result.exam_id,
        result.student_id,
        result.score,
        result.status,
        graded.len(),
        req.answers.len()
    );

    Ok((StatusCode::CREATED, Json(result)))
}

/// Lists results, newest first, optionally filtered by student and exam.
pub async fn list_exam_results(
    State(pool): State<PgPool>,
    Query(params): Query<ExamResultListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"
        SELECT er.*,
            s.first_name AS student_first_name,
            s.last_name AS student_last_name,
            e.title AS exam_title
        FROM exam_results er
        JOIN students s ON s.id = er.student_id
        JOIN exams e ON e.id = er.exam_id
        WHERE 1 = 1
        "#,
    );

    if let Some(student_id) = params.student_id {
        builder.push(" AND er.student_id = ");
        builder.push_bind(student_id);
    }

    if let Some(exam_id) = params.exam_id {
        builder.push(" AND er.exam_id = ");
        builder.push_bind(exam_id);
    }

    builder.push(" ORDER BY er.created_at DESC, er.id DESC");

    let results = builder
        .build_query_as::<ExamResultSummary>()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list exam results: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(results))
}

/// Returns a result with its answer-by-answer breakdown.
pub async fn get_exam_result_details(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query_as::<_, ExamResult>("SELECT * FROM exam_results WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch exam result {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?
        .ok_or(AppError::NotFound("Exam result not found".to_string()))?;

    let answers = sqlx::query_as::<_, AnswerDetail>(
        r#"
        SELECT a.id, a.question_id, a.selected_answer, a.is_correct, a.points_earned,
            q.question_text, q.question_type, q.options, q.correct_answer, q.points
        FROM answers a
        JOIN questions q ON q.id = a.question_id
        WHERE a.exam_result_id = $1
        ORDER BY q.order_num, q.id
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch answers of result {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(ExamResultDetails { result, answers }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn keys(entries: &[(i64, &str, i32)]) -> HashMap<i64, AnswerKey> {
        entries
            .iter()
            .map(|(id, answer, points)| {
                (
                    *id,
                    AnswerKey {
                        id: *id,
                        correct_answer: answer.to_string(),
                        points: *points,
                    },
                )
            })
            .collect()
    }

    fn answers(entries: &[(i64, &str)]) -> BTreeMap<i64, String> {
        entries.iter().map(|(id, a)| (*id, a.to_string())).collect()
    }

    fn earned(graded: &[GradedAnswer]) -> i64 {
        graded.iter().map(|a| a.points_earned as i64).sum()
    }

    #[test]
    fn test_partial_credit_passes_at_threshold() {
        let keys = keys(&[(1, "B", 60), (2, "true", 40)]);
        let graded = grade_answers(&answers(&[(1, "B"), (2, "false")]), &keys);

        assert_eq!(graded.len(), 2);
        assert!(graded[0].is_correct);
        assert!(!graded[1].is_correct);

        let score = calculate_score(earned(&graded), 100);
        assert_eq!(score, 60.0);
        assert_eq!(result_status(score, 60), ResultStatus::Passed);
    }

    #[test]
    fn test_all_wrong_scores_zero() {
        let keys = keys(&[(1, "B", 60), (2, "true", 40)]);
        let graded = grade_answers(&answers(&[(1, "A"), (2, "false")]), &keys);

        let score = calculate_score(earned(&graded), 100);
        assert_eq!(score, 0.0);
        assert_eq!(result_status(score, 60), ResultStatus::Failed);
        assert!(graded.iter().all(|a| a.points_earned == 0));
    }

    #[test]
    fn test_all_correct_scores_full() {
        let keys = keys(&[(1, "A", 50), (2, "B", 50)]);
        let graded = grade_answers(&answers(&[(1, "A"), (2, "B")]), &keys);

        let score = calculate_score(earned(&graded), 100);
        assert_eq!(score, 100.0);
        assert_eq!(result_status(score, 100), ResultStatus::Passed);
    }

    #[test]
    fn test_unknown_questions_are_skipped() {
        let keys = keys(&[(1, "B", 10)]);
        let graded = grade_answers(&answers(&[(1, "B"), (99, "B")]), &keys);

        assert_eq!(
            graded,
            vec![GradedAnswer {
                question_id: 1,
                selected_answer: "B".to_string(),
                is_correct: true,
                points_earned: 10,
            }]
        );
    }

    #[test]
    fn test_matching_is_exact() {
        let keys = keys(&[(1, "True", 5), (2, "paris", 5)]);
        let graded = grade_answers(&answers(&[(1, "true"), (2, "paris ")]), &keys);

        assert!(graded.iter().all(|a| !a.is_correct));
    }

    #[test]
    fn test_empty_submission() {
        let graded = grade_answers(&BTreeMap::new(), &keys(&[(1, "A", 10)]));
        assert!(graded.is_empty());
        assert_eq!(calculate_score(0, 100), 0.0);
        assert_eq!(result_status(0.0, 0), ResultStatus::Passed);
    }

    #[test]
    fn test_score_is_unrounded() {
        let score = calculate_score(1, 3);
        assert!((score - 33.333_333).abs() < 1e-4);
        assert_eq!(result_status(score, 34), ResultStatus::Failed);
    }

    #[test]
    fn test_elapsed_seconds() {
        let start = Utc::now();
        assert_eq!(elapsed_seconds(start, start + Duration::seconds(95)), 95);
        assert_eq!(elapsed_seconds(start, start - Duration::seconds(5)), 0);
    }
}
