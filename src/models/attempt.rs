// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

/// Represents the 'attempts' table in the database.
/// One scored submission of a test by a user. The score is fixed at submission.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub user_id: i64,
    pub test_id: i64,

    /// The answer map exactly as submitted: question id -> chosen option.
    pub answers: Json<serde_json::Value>,

    /// Percentage of correctly answered questions, 0..=100.
    pub score: f64,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for submitting a test attempt.
///
/// `answers` is either a JSON object or a string holding one; the
/// distinction is resolved by the scorer.
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    pub answers: serde_json::Value,
}
