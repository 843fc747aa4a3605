// tests/common/mod.rs
#![allow(dead_code)]

use std::str::FromStr;

use chrono::Utc;
use portal_core::{config::Config, db, routes, state::AppState};
use serde_json::{Value, json};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

pub const PASSWORD: &str = "password123";

/// A fresh in-memory database with the schema applied.
///
/// A single long-lived connection: an in-memory SQLite database disappears
/// with the connection that opened it.
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:").expect("bad sqlite url");

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory database");

    db::migrate(&pool).await.expect("Failed to migrate database");
    pool
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        port: 0,
    }
}

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers a student and returns (user id, token).
    pub async fn register(&self) -> (i64, String) {
        let email = unique_email();
        let body: Value = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "name": "Test Student", "email": email, "password": PASSWORD }))
            .send()
            .await
            .expect("Register failed")
            .json()
            .await
            .expect("Failed to parse register json");

        (
            body["user"]["id"].as_i64().expect("user id missing"),
            body["token"].as_str().expect("token missing").to_string(),
        )
    }

    /// Registers a user, promotes it to admin and logs in again so the
    /// token carries the new role. Returns (user id, token).
    pub async fn admin(&self) -> (i64, String) {
        let email = unique_email();
        let body: Value = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "name": "Test Admin", "email": email, "password": PASSWORD }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let id = body["user"]["id"].as_i64().unwrap();

        sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .unwrap();

        let login: Value = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": PASSWORD }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        (id, login["token"].as_str().unwrap().to_string())
    }

    /// Creates a test through the admin API and returns its JSON.
    pub async fn create_test(&self, admin_token: &str, allow_retake: bool) -> Value {
        let response = self
            .client
            .post(self.url("/api/admin/tests"))
            .bearer_auth(admin_token)
            .json(&json!({
                "title": "Rivers of Europe",
                "type": "single",
                "allow_retake": allow_retake,
                "questions": [
                    { "content": "Longest river?", "options": ["Danube", "Volga", "Rhine"], "correct_option": 1 },
                    { "content": "Flows through Vienna?", "options": ["Danube", "Seine"], "correct_option": 0 }
                ]
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 201);
        response.json().await.unwrap()
    }
}

/// Spawns the app on a random port over an in-memory database.
pub async fn spawn_app() -> TestApp {
    let pool = test_pool().await;
    let state = AppState::new(pool.clone(), test_config());
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        client: reqwest::Client::new(),
    }
}

pub fn unique_email() -> String {
    format!("u_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8])
}

/// Inserts a student directly and returns its id.
pub async fn seed_user(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO users (name, email, password, role, created_at) VALUES (?, ?, ?, 'student', ?) RETURNING id",
    )
    .bind("Seeded")
    .bind(unique_email())
    .bind("not-a-real-hash")
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Inserts a test with the given correct options and returns its id.
pub async fn seed_test(pool: &SqlitePool, allow_retake: bool, correct: &[i64]) -> i64 {
    let now = Utc::now();
    let test_id: i64 = sqlx::query_scalar(
        "INSERT INTO tests (title, description, type, allow_retake, created_at, updated_at) VALUES ('Seeded', '', 'single', ?, ?, ?) RETURNING id",
    )
    .bind(allow_retake)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .unwrap();

    for (i, c) in correct.iter().enumerate() {
        sqlx::query(
            "INSERT INTO questions (test_id, position, content, options, correct_option) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(test_id)
        .bind(i as i64 + 1)
        .bind(format!("Question {}", i))
        .bind(json!(["A", "B", "C", "D"]).to_string())
        .bind(c)
        .execute(pool)
        .await
        .unwrap();
    }

    test_id
}

pub async fn seed_practice(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO practices (title, description, created_at) VALUES ('Seeded practice', '', ?) RETURNING id",
    )
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn count(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}
