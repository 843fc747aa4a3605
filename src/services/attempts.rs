// src/services/attempts.rs

use chrono::Utc;
use serde_json::Value;
use sqlx::{SqlitePool, types::Json};

use crate::{
    error::{AppError, is_unique_violation},
    models::{attempt::Attempt, test::TestDetail},
    services::scoring::{answers_object, calculate_score, parse_answers},
};

const ATTEMPT_COLUMNS: &str = "id, user_id, test_id, answers, score, created_at";

async fn has_attempt(pool: &SqlitePool, user_id: i64, test_id: i64) -> Result<bool, AppError> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT id FROM attempts WHERE user_id = ? AND test_id = ? LIMIT 1")
            .bind(user_id)
            .bind(test_id)
            .fetch_optional(pool)
            .await?;

    Ok(found.is_some())
}

/// Scores a submission and stores it as a new attempt.
///
/// * Tests without retakes accept one attempt per user; a second one fails
///   with `AttemptAlreadyExists` and writes nothing.
/// * A payload that is not a mapping fails with `MalformedAnswers`.
/// * The row is written by a single statement. For single-attempt tests that
///   statement only inserts when no attempt exists, and the partial unique
///   index on (user_id, test_id) rejects whichever racing insert comes second.
pub async fn submit_attempt(
    pool: &SqlitePool,
    detail: &TestDetail,
    user_id: i64,
    raw_answers: &Value,
) -> Result<Attempt, AppError> {
    let test = &detail.test;

    if !test.allow_retake && has_attempt(pool, user_id, test.id).await? {
        tracing::info!("User {} denied a retake of test {}", user_id, test.id);
        return Err(AppError::AttemptAlreadyExists);
    }

    let answers = answers_object(raw_answers)?;
    let (correct_count, score) = calculate_score(&detail.questions, &parse_answers(&answers));

    let stored_answers = Json(Value::Object(answers));
    let now = Utc::now();

    let inserted = if test.allow_retake {
        sqlx::query_as::<_, Attempt>(&format!(
            r#"
            INSERT INTO attempts (user_id, test_id, answers, score, exclusive, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        ))
        .bind(user_id)
        .bind(test.id)
        .bind(stored_answers)
        .bind(score)
        .bind(now)
        .fetch_optional(pool)
        .await
    } else {
        sqlx::query_as::<_, Attempt>(&format!(
            r#"
            INSERT INTO attempts (user_id, test_id, answers, score, exclusive, created_at)
            SELECT ?, ?, ?, ?, 1, ?
            WHERE NOT EXISTS (SELECT 1 FROM attempts WHERE user_id = ? AND test_id = ?)
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        ))
        .bind(user_id)
        .bind(test.id)
        .bind(stored_answers)
        .bind(score)
        .bind(now)
        .bind(user_id)
        .bind(test.id)
        .fetch_optional(pool)
        .await
    };

    let attempt = match inserted {
        Ok(Some(attempt)) => attempt,
        Ok(None) => return Err(AppError::AttemptAlreadyExists),
        Err(e) if is_unique_violation(&e) => return Err(AppError::AttemptAlreadyExists),
        Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
            return Err(AppError::NotFound("User or test not found".to_string()));
        }
        Err(e) => {
            tracing::error!("Failed to insert attempt: {:?}", e);
            return Err(AppError::from(e));
        }
    };

    tracing::info!(
        "User {} scored {:.1} on test {} ({}/{} correct)",
        user_id,
        score,
        test.id,
        correct_count,
        detail.questions.len()
    );

    Ok(attempt)
}

pub async fn list_user_attempts(pool: &SqlitePool, user_id: i64) -> Result<Vec<Attempt>, AppError> {
    let attempts = sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {} FROM attempts WHERE user_id = ? ORDER BY id DESC",
        ATTEMPT_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(attempts)
}

pub async fn list_all_attempts(pool: &SqlitePool) -> Result<Vec<Attempt>, AppError> {
    let attempts = sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {} FROM attempts ORDER BY id DESC",
        ATTEMPT_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    Ok(attempts)
}

pub async fn fetch_attempt(pool: &SqlitePool, id: i64) -> Result<Attempt, AppError> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {} FROM attempts WHERE id = ?",
        ATTEMPT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))
}
