// src/handlers/grades.rs

use axum::{Json, extract::State, response::IntoResponse};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::grade::GradeKind,
    services::grades,
    utils::jwt::AuthUser,
};

/// The caller's own test grades.
pub async fn my_test_grades(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(grades::list_user_grades(&pool, GradeKind::Test, auth.id).await?))
}

/// The caller's own practice grades.
pub async fn my_practice_grades(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(grades::list_user_grades(&pool, GradeKind::Practice, auth.id).await?))
}
