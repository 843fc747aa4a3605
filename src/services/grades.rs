// src/services/grades.rs

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    error::{AppError, is_unique_violation},
    models::grade::{Grade, GradeKind},
    utils::html::clean_html,
};

/// How many insert/update rounds `set_grade` tries before giving up. A round
/// is only repeated when a conflicting row vanished between the two steps.
const MAX_UPSERT_ROUNDS: usize = 3;

/// Values to record for a (user, item) pair.
#[derive(Debug, Clone)]
pub struct GradeInput {
    pub user_id: i64,
    pub assessable_id: i64,
    pub grade: f64,
    pub comment: String,
    /// Attempt or submission the grade refers to. `None` keeps whatever an
    /// existing grade already points at.
    pub source_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct GradeOutcome {
    pub grade: Grade,
    /// True when a new row was inserted, false when an existing one was amended.
    pub created: bool,
}

fn returning_columns(kind: GradeKind) -> String {
    format!(
        "id, user_id, {} AS assessable_id, {} AS source_id, grade, comment, created_at, updated_at",
        kind.item_column(),
        kind.source_column()
    )
}

async fn ensure_exists(pool: &SqlitePool, table: &str, id: i64, what: &str) -> Result<(), AppError> {
    let found: Option<i64> = sqlx::query_scalar(&format!("SELECT id FROM {} WHERE id = ?", table))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    found
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("{} not found", what)))
}

/// The source record must exist and belong to the same user and item.
async fn ensure_source_matches(
    pool: &SqlitePool,
    kind: GradeKind,
    user_id: i64,
    item_id: i64,
    source_id: i64,
) -> Result<(), AppError> {
    let owner: Option<(i64, i64)> = sqlx::query_as(&format!(
        "SELECT user_id, {} FROM {} WHERE id = ?",
        kind.item_column(),
        kind.source_table()
    ))
    .bind(source_id)
    .fetch_optional(pool)
    .await?;

    match owner {
        None => Err(AppError::NotFound(format!("{} not found", kind.source_name()))),
        Some((owner_id, owner_item)) if owner_id != user_id || owner_item != item_id => {
            Err(AppError::BadRequest(format!(
                "{} {} does not belong to this user and {}",
                kind.source_name(),
                source_id,
                kind.item_name().to_lowercase()
            )))
        }
        Some(_) => Ok(()),
    }
}

async fn try_insert(
    pool: &SqlitePool,
    kind: GradeKind,
    input: &GradeInput,
    comment: &str,
) -> Result<Option<Grade>, AppError> {
    let now = Utc::now();
    let inserted = sqlx::query_as::<_, Grade>(&format!(
        r#"
        INSERT INTO {table} (user_id, {item}, {source}, grade, comment, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING {columns}
        "#,
        table = kind.grade_table(),
        item = kind.item_column(),
        source = kind.source_column(),
        columns = returning_columns(kind),
    ))
    .bind(input.user_id)
    .bind(input.assessable_id)
    .bind(input.source_id)
    .bind(input.grade)
    .bind(comment)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await;

    match inserted {
        Ok(grade) => Ok(Some(grade)),
        Err(e) if is_unique_violation(&e) => Ok(None),
        Err(e) => Err(AppError::from(e)),
    }
}

async fn try_update(
    pool: &SqlitePool,
    kind: GradeKind,
    input: &GradeInput,
    comment: &str,
) -> Result<Option<Grade>, AppError> {
    let updated = sqlx::query_as::<_, Grade>(&format!(
        r#"
        UPDATE {table}
        SET grade = ?, comment = ?, {source} = COALESCE(?, {source}), updated_at = ?
        WHERE user_id = ? AND {item} = ?
        RETURNING {columns}
        "#,
        table = kind.grade_table(),
        item = kind.item_column(),
        source = kind.source_column(),
        columns = returning_columns(kind),
    ))
    .bind(input.grade)
    .bind(comment)
    .bind(input.source_id)
    .bind(Utc::now())
    .bind(input.user_id)
    .bind(input.assessable_id)
    .fetch_optional(pool)
    .await?;

    Ok(updated)
}

/// Records the authoritative grade for a (user, item) pair.
///
/// The insert runs under the table's UNIQUE (user, item) constraint; a
/// violation means the pair is already graded and the call becomes an update
/// of that row, keeping its id. Concurrent calls for one pair therefore end
/// with exactly one row holding the last writer's values.
pub async fn set_grade(
    pool: &SqlitePool,
    kind: GradeKind,
    input: GradeInput,
) -> Result<GradeOutcome, AppError> {
    ensure_exists(pool, "users", input.user_id, "User").await?;
    ensure_exists(pool, kind.item_table(), input.assessable_id, kind.item_name()).await?;
    if let Some(source_id) = input.source_id {
        ensure_source_matches(pool, kind, input.user_id, input.assessable_id, source_id).await?;
    }

    let comment = clean_html(&input.comment);

    for _ in 0..MAX_UPSERT_ROUNDS {
        if let Some(grade) = try_insert(pool, kind, &input, &comment).await? {
            tracing::info!(
                "Created {:?} grade {} for user {} on item {}",
                kind,
                grade.id,
                input.user_id,
                input.assessable_id
            );
            return Ok(GradeOutcome { grade, created: true });
        }

        if let Some(grade) = try_update(pool, kind, &input, &comment).await? {
            tracing::info!(
                "Updated {:?} grade {} for user {} on item {}",
                kind,
                grade.id,
                input.user_id,
                input.assessable_id
            );
            return Ok(GradeOutcome { grade, created: false });
        }
    }

    tracing::error!(
        "Grade upsert for user {} on {:?} {} kept conflicting",
        input.user_id,
        kind,
        input.assessable_id
    );
    Err(AppError::InternalServerError(
        "Failed to record grade".to_string(),
    ))
}

/// New values for a grade addressed by its id.
#[derive(Debug, Clone)]
pub struct GradeAmendment {
    pub grade: f64,
    /// `None` keeps the stored comment.
    pub comment: Option<String>,
    /// `None` keeps the stored source.
    pub source_id: Option<i64>,
}

pub async fn fetch_grade(pool: &SqlitePool, kind: GradeKind, id: i64) -> Result<Grade, AppError> {
    sqlx::query_as::<_, Grade>(&format!(
        "SELECT {} FROM {} WHERE id = ?",
        returning_columns(kind),
        kind.grade_table()
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Grade not found".to_string()))
}

/// Amends an existing grade in place. The (user, item) pair of the row never
/// changes; a new source must belong to that same pair.
pub async fn update_grade(
    pool: &SqlitePool,
    kind: GradeKind,
    id: i64,
    amendment: GradeAmendment,
) -> Result<Grade, AppError> {
    let current = fetch_grade(pool, kind, id).await?;

    if let Some(source_id) = amendment.source_id {
        ensure_source_matches(pool, kind, current.user_id, current.assessable_id, source_id)
            .await?;
    }

    let comment = amendment.comment.map(|c| clean_html(&c));

    let grade = sqlx::query_as::<_, Grade>(&format!(
        r#"
        UPDATE {table}
        SET grade = ?, comment = COALESCE(?, comment), {source} = COALESCE(?, {source}), updated_at = ?
        WHERE id = ?
        RETURNING {columns}
        "#,
        table = kind.grade_table(),
        source = kind.source_column(),
        columns = returning_columns(kind),
    ))
    .bind(amendment.grade)
    .bind(comment)
    .bind(amendment.source_id)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Grade not found".to_string()))?;

    tracing::info!("Amended {:?} grade {}", kind, id);
    Ok(grade)
}

pub async fn list_user_grades(
    pool: &SqlitePool,
    kind: GradeKind,
    user_id: i64,
) -> Result<Vec<Grade>, AppError> {
    let grades = sqlx::query_as::<_, Grade>(&format!(
        "SELECT {} FROM {} WHERE user_id = ? ORDER BY id",
        returning_columns(kind),
        kind.grade_table()
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(grades)
}

pub async fn delete_grade(pool: &SqlitePool, kind: GradeKind, id: i64) -> Result<(), AppError> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", kind.grade_table()))
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Grade not found".to_string()));
    }

    tracing::info!("Deleted {:?} grade {}", kind, id);
    Ok(())
}
