// src/models/practice.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use validator::Validate;

/// Represents the 'practices' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Practice {
    pub id: i64,
    pub title: String,
    pub description: String,

    /// Link to the assignment file, if any.
    pub file_url: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'practice_submissions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PracticeSubmission {
    pub id: i64,
    pub user_id: i64,
    pub practice_id: i64,
    pub file_url: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating or replacing a practice assignment.
#[derive(Debug, Deserialize, Validate)]
pub struct PracticeRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub file_url: Option<String>,
}

/// DTO for a student handing in a practice assignment.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitPracticeRequest {
    #[validate(length(min = 1, max = 500), custom(function = validate_url_string))]
    pub file_url: String,
}

/// Validates a file reference: either an absolute URL or a server-relative
/// path such as `/uploads/practices/report.pdf`.
fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    let parsed = if url.starts_with('/') && !url.starts_with("//") {
        Url::parse("http://localhost").and_then(|base| base.join(url))
    } else {
        Url::parse(url)
    };

    if parsed.is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}
