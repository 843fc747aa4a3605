// src/handlers/admin.rs

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
    error::{AppError, is_unique_violation},
    handlers::practices::{PRACTICE_COLUMNS, SUBMISSION_COLUMNS, fetch_practice},
    models::{
        grade::{
            GradeKind, SetPracticeGradeRequest, SetTestGradeRequest, UpdatePracticeGradeRequest,
            UpdateTestGradeRequest,
        },
        practice::{Practice, PracticeRequest, PracticeSubmission},
        test::{CreateTestRequest, UpdateTestRequest},
        user::{AdminUpdateUserRequest, User},
    },
    services::{
        attempts,
        grades::{self, GradeAmendment, GradeInput, GradeOutcome},
        test_catalog,
    },
    utils::{html::clean_html, jwt::AuthUser},
};

const USER_COLUMNS: &str = "id, name, email, password, role, created_at";

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users ORDER BY id DESC",
        USER_COLUMNS
    ))
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(users))
}

/// Updates name, email and/or role of a user.
/// Admin only.
pub async fn update_user(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let current = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE id = ?",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let name = payload.name.unwrap_or(current.name);
    let email = payload
        .email
        .map(|e| e.trim().to_lowercase())
        .unwrap_or(current.email);
    let role = payload.role.unwrap_or(current.role);

    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET name = ?, email = ?, role = ? WHERE id = ? RETURNING {}",
        USER_COLUMNS
    ))
    .bind(name)
    .bind(&email)
    .bind(role)
    .bind(id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("A user with email '{}' already exists", email))
        } else {
            tracing::error!("Failed to update user: {:?}", e);
            AppError::from(e)
        }
    })?;

    tracing::info!("User {} updated (role: {})", id, user.role);
    Ok(Json(user))
}

/// Deletes a user by ID.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id == auth.id {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_test(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let detail = test_catalog::create_test(&pool, payload).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn update_test(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    Ok(Json(test_catalog::update_test(&pool, id, payload).await?))
}

pub async fn delete_test(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    test_catalog::delete_test(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Every attempt by every user, newest first.
pub async fn list_attempts(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(attempts::list_all_attempts(&pool).await?))
}

fn grade_response(outcome: GradeOutcome) -> impl IntoResponse {
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (status, Json(outcome.grade))
}

/// Sets the final grade of a user on a test, replacing any earlier one.
pub async fn set_test_grade(
    State(pool): State<SqlitePool>,
    Json(payload): Json<SetTestGradeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let outcome = grades::set_grade(
        &pool,
        GradeKind::Test,
        GradeInput {
            user_id: payload.user_id,
            assessable_id: payload.test_id,
            grade: payload.grade,
            comment: payload.comment,
            source_id: payload.attempt_id,
        },
    )
    .await?;

    Ok(grade_response(outcome))
}

/// Amends a test grade addressed by its id.
pub async fn update_test_grade(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTestGradeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let grade = grades::update_grade(
        &pool,
        GradeKind::Test,
        id,
        GradeAmendment {
            grade: payload.grade,
            comment: payload.comment,
            source_id: payload.attempt_id,
        },
    )
    .await?;

    Ok(Json(grade))
}

pub async fn delete_test_grade(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    grades::delete_grade(&pool, GradeKind::Test, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_practice(
    State(pool): State<SqlitePool>,
    Json(payload): Json<PracticeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let practice = sqlx::query_as::<_, Practice>(&format!(
        r#"
        INSERT INTO practices (title, description, file_url, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING {}
        "#,
        PRACTICE_COLUMNS
    ))
    .bind(clean_html(&payload.title))
    .bind(clean_html(&payload.description))
    .bind(payload.file_url)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create practice: {:?}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(practice)))
}

pub async fn update_practice(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<PracticeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    fetch_practice(&pool, id).await?;

    let practice = sqlx::query_as::<_, Practice>(&format!(
        "UPDATE practices SET title = ?, description = ?, file_url = ? WHERE id = ? RETURNING {}",
        PRACTICE_COLUMNS
    ))
    .bind(clean_html(&payload.title))
    .bind(clean_html(&payload.description))
    .bind(payload.file_url)
    .bind(id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(practice))
}

pub async fn delete_practice(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM practices WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Practice not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Every practice submission, newest first.
pub async fn list_submissions(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let submissions = sqlx::query_as::<_, PracticeSubmission>(&format!(
        "SELECT {} FROM practice_submissions ORDER BY id DESC",
        SUBMISSION_COLUMNS
    ))
    .fetch_all(&pool)
    .await?;

    Ok(Json(submissions))
}

/// Sets the final grade of a user on a practice, replacing any earlier one.
pub async fn set_practice_grade(
    State(pool): State<SqlitePool>,
    Json(payload): Json<SetPracticeGradeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let outcome = grades::set_grade(
        &pool,
        GradeKind::Practice,
        GradeInput {
            user_id: payload.user_id,
            assessable_id: payload.practice_id,
            grade: payload.grade,
            comment: payload.comment,
            source_id: payload.submission_id,
        },
    )
    .await?;

    Ok(grade_response(outcome))
}

pub async fn update_practice_grade(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePracticeGradeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let grade = grades::update_grade(
        &pool,
        GradeKind::Practice,
        id,
        GradeAmendment {
            grade: payload.grade,
            comment: payload.comment,
            source_id: payload.submission_id,
        },
    )
    .await?;

    Ok(Json(grade))
}

pub async fn delete_practice_grade(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    grades::delete_grade(&pool, GradeKind::Practice, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
