// src/models/grade.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Which assessable item a grade belongs to.
///
/// Both kinds share one upsert contract; they differ only in the tables and
/// columns they live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeKind {
    Test,
    Practice,
}

impl GradeKind {
    pub(crate) fn grade_table(self) -> &'static str {
        match self {
            GradeKind::Test => "test_grades",
            GradeKind::Practice => "practice_grades",
        }
    }

    pub(crate) fn item_table(self) -> &'static str {
        match self {
            GradeKind::Test => "tests",
            GradeKind::Practice => "practices",
        }
    }

    pub(crate) fn item_column(self) -> &'static str {
        match self {
            GradeKind::Test => "test_id",
            GradeKind::Practice => "practice_id",
        }
    }

    pub(crate) fn source_table(self) -> &'static str {
        match self {
            GradeKind::Test => "attempts",
            GradeKind::Practice => "practice_submissions",
        }
    }

    pub(crate) fn source_column(self) -> &'static str {
        match self {
            GradeKind::Test => "attempt_id",
            GradeKind::Practice => "submission_id",
        }
    }

    pub(crate) fn item_name(self) -> &'static str {
        match self {
            GradeKind::Test => "Test",
            GradeKind::Practice => "Practice",
        }
    }

    pub(crate) fn source_name(self) -> &'static str {
        match self {
            GradeKind::Test => "Attempt",
            GradeKind::Practice => "Submission",
        }
    }
}

/// An authoritative, admin-authored grade for a (user, item) pair.
///
/// Read from either `test_grades` or `practice_grades`; the item and source
/// columns are aliased to `assessable_id` / `source_id`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Grade {
    pub id: i64,
    pub user_id: i64,
    pub assessable_id: i64,

    /// Attempt (tests) or submission (practices) the grade was based on.
    pub source_id: Option<i64>,

    pub grade: f64,
    pub comment: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for setting a test grade.
#[derive(Debug, Deserialize, Validate)]
pub struct SetTestGradeRequest {
    pub user_id: i64,
    pub test_id: i64,
    pub attempt_id: Option<i64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub grade: f64,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub comment: String,
}

/// DTO for setting a practice grade.
#[derive(Debug, Deserialize, Validate)]
pub struct SetPracticeGradeRequest {
    pub user_id: i64,
    pub practice_id: i64,
    pub submission_id: Option<i64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub grade: f64,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub comment: String,
}

/// DTO for amending an existing test grade by its id.
/// An absent comment or attempt keeps the stored one.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTestGradeRequest {
    pub attempt_id: Option<i64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub grade: f64,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

/// DTO for amending an existing practice grade by its id.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePracticeGradeRequest {
    pub submission_id: Option<i64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub grade: f64,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}
