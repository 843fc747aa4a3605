// src/services/scoring.rs

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::{error::AppError, models::test::Question};

/// Resolves a raw answer payload to a JSON object.
///
/// Accepts the object itself or a string containing one. Anything else is
/// `MalformedAnswers`.
pub fn answers_object(raw: &Value) -> Result<Map<String, Value>, AppError> {
    match raw {
        Value::Object(map) => Ok(map.clone()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(AppError::MalformedAnswers(
                "answers must be an object of question id to option index".to_string(),
            )),
            Err(e) => Err(AppError::MalformedAnswers(e.to_string())),
        },
        _ => Err(AppError::MalformedAnswers(
            "answers must be an object of question id to option index".to_string(),
        )),
    }
}

/// Converts one answer value to an option index.
///
/// Integers, floats without a fractional part and integer strings count.
/// Everything else is `None` and the entry is skipped.
fn option_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Parses the answer object into question id -> chosen option.
/// Entries with a non-numeric key or an unusable value are dropped.
pub fn parse_answers(answers: &Map<String, Value>) -> HashMap<i64, i64> {
    answers
        .iter()
        .filter_map(|(key, value)| {
            let question_id = key.trim().parse::<i64>().ok()?;
            let chosen = option_index(value)?;
            Some((question_id, chosen))
        })
        .collect()
}

/// Helper function to calculate score.
/// Returns (correct_count, score_percentage).
///
/// Unanswered questions count as wrong, answers to questions outside the test
/// are ignored, and a test without questions scores 0.
pub fn calculate_score(questions: &[Question], answers: &HashMap<i64, i64>) -> (usize, f64) {
    let total_questions = questions.len();

    if total_questions == 0 {
        return (0, 0.0);
    }

    let correct_count = questions
        .iter()
        .filter(|q| answers.get(&q.id) == Some(&q.correct_option))
        .count();

    let score = (correct_count as f64 / total_questions as f64) * 100.0;
    (correct_count, score)
}
