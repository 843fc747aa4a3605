// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::user::{LoginRequest, RegisterRequest, Role, User, UserSummary},
    utils::{
        hash::{hash_password, verify_password},
        jwt::TokenCodec,
    },
};

/// Registers a new student account.
///
/// Hashes the password using Argon2 before storing it and signs a token so
/// the client is logged in straight away.
pub async fn register(
    State(pool): State<SqlitePool>,
    State(tokens): State<TokenCodec>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();
    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email, password, role, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, name, email, password, role, created_at
        "#,
    )
    .bind(payload.name.trim())
    .bind(&email)
    .bind(hashed_password)
    .bind(Role::Student)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("A user with email '{}' already exists", email))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    let token = tokens.issue(user.id, &user.email, user.role)?;
    tracing::info!("Registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "token": token,
            "type": "Bearer",
            "user": UserSummary::from(&user),
        })),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// Unknown email and wrong password produce the same response.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(tokens): State<TokenCodec>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password, role, created_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(payload.email.trim().to_lowercase())
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::from(e)
    })?;

    let invalid = || AppError::AuthError("Invalid email or password".to_string());

    let user = user.ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(invalid());
    }

    let token = tokens.issue(user.id, &user.email, user.role)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "expires_in": tokens.expiration_seconds(),
        "user": UserSummary::from(&user),
    })))
}
