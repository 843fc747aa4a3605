// src/services/test_catalog.rs

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction, types::Json};

use crate::{
    error::AppError,
    models::test::{
        CreateTestRequest, NewQuestion, Question, Test, TestDetail, UpdateTestRequest,
        build_questions,
    },
    utils::html::clean_html,
};

const TEST_COLUMNS: &str =
    "id, title, description, type, allow_retake, created_at, updated_at";

pub async fn list_tests(pool: &SqlitePool) -> Result<Vec<Test>, AppError> {
    let tests = sqlx::query_as::<_, Test>(&format!(
        "SELECT {} FROM tests ORDER BY id",
        TEST_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    Ok(tests)
}

pub async fn fetch_test(pool: &SqlitePool, id: i64) -> Result<Test, AppError> {
    sqlx::query_as::<_, Test>(&format!("SELECT {} FROM tests WHERE id = ?", TEST_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Test not found".to_string()))
}

pub async fn fetch_questions(pool: &SqlitePool, test_id: i64) -> Result<Vec<Question>, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, test_id, position, content, options, correct_option
        FROM questions
        WHERE test_id = ?
        ORDER BY position, id
        "#,
    )
    .bind(test_id)
    .fetch_all(pool)
    .await?;

    Ok(questions)
}

/// Loads a test with its ordered questions, or `NotFound`.
pub async fn load_test_detail(pool: &SqlitePool, id: i64) -> Result<TestDetail, AppError> {
    let test = fetch_test(pool, id).await?;
    let questions = fetch_questions(pool, id).await?;
    Ok(TestDetail { test, questions })
}

async fn insert_questions(
    tx: &mut Transaction<'_, Sqlite>,
    test_id: i64,
    questions: &[NewQuestion],
) -> Result<(), AppError> {
    for q in questions {
        sqlx::query(
            r#"
            INSERT INTO questions (test_id, position, content, options, correct_option)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(test_id)
        .bind(q.position())
        .bind(q.content())
        .bind(Json(q.options()))
        .bind(q.correct_option())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Creates a test and all of its questions in one transaction.
pub async fn create_test(pool: &SqlitePool, req: CreateTestRequest) -> Result<TestDetail, AppError> {
    let questions = build_questions(req.questions)?;
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let test_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO tests (title, description, type, allow_retake, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(clean_html(&req.title))
    .bind(clean_html(&req.description))
    .bind(req.test_type)
    .bind(req.allow_retake)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    insert_questions(&mut tx, test_id, &questions).await?;

    tx.commit().await?;

    tracing::info!("Created test {} with {} questions", test_id, questions.len());
    load_test_detail(pool, test_id).await
}

/// Applies a partial update. A present question list replaces the old one.
pub async fn update_test(
    pool: &SqlitePool,
    id: i64,
    req: UpdateTestRequest,
) -> Result<TestDetail, AppError> {
    let current = fetch_test(pool, id).await?;

    let questions = req.questions.map(build_questions).transpose()?;

    let title = req.title.map(|t| clean_html(&t)).unwrap_or(current.title);
    let description = req
        .description
        .map(|d| clean_html(&d))
        .unwrap_or(current.description);
    let test_type = req.test_type.unwrap_or(current.test_type);
    let allow_retake = req.allow_retake.unwrap_or(current.allow_retake);

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE tests
        SET title = ?, description = ?, type = ?, allow_retake = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(title)
    .bind(description)
    .bind(test_type)
    .bind(allow_retake)
    .bind(Utc::now())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if let Some(questions) = &questions {
        sqlx::query("DELETE FROM questions WHERE test_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_questions(&mut tx, id, questions).await?;
    }

    tx.commit().await?;

    tracing::info!("Updated test {}", id);
    load_test_detail(pool, id).await
}

pub async fn delete_test(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM tests WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Test not found".to_string()));
    }

    tracing::info!("Deleted test {}", id);
    Ok(())
}
