// src/handlers/practices.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::practice::{Practice, PracticeSubmission, SubmitPracticeRequest},
    utils::jwt::AuthUser,
};

pub(crate) const PRACTICE_COLUMNS: &str = "id, title, description, file_url, created_at";
pub(crate) const SUBMISSION_COLUMNS: &str = "id, user_id, practice_id, file_url, created_at";

pub(crate) async fn fetch_practice(pool: &SqlitePool, id: i64) -> Result<Practice, AppError> {
    sqlx::query_as::<_, Practice>(&format!(
        "SELECT {} FROM practices WHERE id = ?",
        PRACTICE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Practice not found".to_string()))
}

pub async fn list_practices(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let practices = sqlx::query_as::<_, Practice>(&format!(
        "SELECT {} FROM practices ORDER BY id",
        PRACTICE_COLUMNS
    ))
    .fetch_all(&pool)
    .await?;

    Ok(Json(practices))
}

pub async fn get_practice(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(fetch_practice(&pool, id).await?))
}

/// Hands in a practice assignment. The file itself is stored elsewhere;
/// only its URL is recorded. Resubmitting is allowed.
pub async fn submit_practice(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<SubmitPracticeRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    fetch_practice(&pool, id).await?;

    let submission = sqlx::query_as::<_, PracticeSubmission>(&format!(
        r#"
        INSERT INTO practice_submissions (user_id, practice_id, file_url, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING {}
        "#,
        SUBMISSION_COLUMNS
    ))
    .bind(auth.id)
    .bind(id)
    .bind(&req.file_url)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to record practice submission: {:?}", e);
        AppError::from(e)
    })?;

    tracing::info!("User {} submitted practice {}", auth.id, id);
    Ok((StatusCode::CREATED, Json(submission)))
}

/// Lists the caller's own submissions, newest first.
pub async fn my_submissions(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let submissions = sqlx::query_as::<_, PracticeSubmission>(&format!(
        "SELECT {} FROM practice_submissions WHERE user_id = ? ORDER BY id DESC",
        SUBMISSION_COLUMNS
    ))
    .bind(auth.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(submissions))
}

/// Returns one submission. Only its owner or an admin may read it.
pub async fn get_submission(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let submission = sqlx::query_as::<_, PracticeSubmission>(&format!(
        "SELECT {} FROM practice_submissions WHERE id = ?",
        SUBMISSION_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))?;

    if submission.user_id != auth.id && !auth.is_admin() {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    Ok(Json(submission))
}
