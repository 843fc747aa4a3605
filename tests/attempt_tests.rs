// tests/attempt_tests.rs

mod common;

use std::collections::HashMap;

use common::{count, seed_test, seed_user, spawn_app, test_pool};
use portal_core::{
    error::AppError,
    services::{attempts::submit_attempt, test_catalog::load_test_detail},
};
use serde_json::{Value, json};

fn question_ids(test: &Value) -> Vec<i64> {
    test["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn half_correct_submission_scores_fifty() {
    let app = spawn_app().await;
    let (_, admin_token) = app.admin().await;
    let (_, token) = app.register().await;
    let test = app.create_test(&admin_token, false).await;
    let ids = question_ids(&test);

    // First question is right (1), second points past the options (5).
    let mut answers = HashMap::new();
    answers.insert(ids[0].to_string(), 1);
    answers.insert(ids[1].to_string(), 5);

    let response = app
        .client
        .post(app.url(&format!("/api/tests/{}/attempts", test["id"])))
        .bearer_auth(&token)
        .json(&json!({ "answers": answers }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 201);
    let attempt: Value = response.json().await.unwrap();
    assert_eq!(attempt["score"], 50.0);
}

#[tokio::test]
async fn stringified_answers_are_accepted() {
    let app = spawn_app().await;
    let (_, admin_token) = app.admin().await;
    let (_, token) = app.register().await;
    let test = app.create_test(&admin_token, false).await;
    let ids = question_ids(&test);

    let answers = format!("{{\"{}\": 1, \"{}\": 0}}", ids[0], ids[1]);
    let attempt: Value = app
        .client
        .post(app.url(&format!("/api/tests/{}/attempts", test["id"])))
        .bearer_auth(&token)
        .json(&json!({ "answers": answers }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(attempt["score"], 100.0);
}

#[tokio::test]
async fn second_attempt_is_rejected_without_retake() {
    let app = spawn_app().await;
    let (_, admin_token) = app.admin().await;
    let (user_id, token) = app.register().await;
    let test = app.create_test(&admin_token, false).await;
    let url = app.url(&format!("/api/tests/{}/attempts", test["id"]));

    let first = app
        .client
        .post(&url)
        .bearer_auth(&token)
        .json(&json!({ "answers": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 201);

    let second = app
        .client
        .post(&url)
        .bearer_auth(&token)
        .json(&json!({ "answers": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 403);

    let rows = count(
        &app.pool,
        &format!("SELECT COUNT(*) FROM attempts WHERE user_id = {}", user_id),
    )
    .await;
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn retake_tests_keep_every_attempt() {
    let app = spawn_app().await;
    let (_, admin_token) = app.admin().await;
    let (_, token) = app.register().await;
    let test = app.create_test(&admin_token, true).await;
    let ids = question_ids(&test);
    let url = app.url(&format!("/api/tests/{}/attempts", test["id"]));

    for answer in [0, 1] {
        let response = app
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&json!({ "answers": HashMap::from([(ids[0].to_string(), answer)]) }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
    }

    let mine: Vec<Value> = app
        .client
        .get(app.url("/api/tests/attempts"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(mine.len(), 2);
    let mut scores: Vec<f64> = mine.iter().map(|a| a["score"].as_f64().unwrap()).collect();
    scores.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(scores, vec![0.0, 50.0]);
}

#[tokio::test]
async fn malformed_answers_are_rejected_without_a_row() {
    let app = spawn_app().await;
    let (_, admin_token) = app.admin().await;
    let (_, token) = app.register().await;
    let test = app.create_test(&admin_token, false).await;

    let response = app
        .client
        .post(app.url(&format!("/api/tests/{}/attempts", test["id"])))
        .bearer_auth(&token)
        .json(&json!({ "answers": [1, 0] }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(count(&app.pool, "SELECT COUNT(*) FROM attempts").await, 0);
}

#[tokio::test]
async fn submitting_to_missing_test_is_404() {
    let app = spawn_app().await;
    let (_, token) = app.register().await;

    let response = app
        .client
        .post(app.url("/api/tests/9999/attempts"))
        .bearer_auth(&token)
        .json(&json!({ "answers": {} }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn students_do_not_see_correct_options() {
    let app = spawn_app().await;
    let (_, admin_token) = app.admin().await;
    let (_, token) = app.register().await;
    let test = app.create_test(&admin_token, false).await;
    assert!(test["questions"][0].get("correct_option").is_some());

    let public: Value = app
        .client
        .get(app.url(&format!("/api/tests/{}", test["id"])))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(public["questions"].as_array().unwrap().len(), 2);
    assert!(public["questions"][0].get("correct_option").is_none());
}

#[tokio::test]
async fn out_of_range_correct_option_is_rejected() {
    let app = spawn_app().await;
    let (_, admin_token) = app.admin().await;

    let response = app
        .client
        .post(app.url("/api/admin/tests"))
        .bearer_auth(&admin_token)
        .json(&json!({
            "title": "Broken",
            "questions": [
                { "content": "Pick one", "options": ["A", "B"], "correct_option": 2 }
            ]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(count(&app.pool, "SELECT COUNT(*) FROM tests").await, 0);
}

#[tokio::test]
async fn attempts_are_private_to_owner_and_admin() {
    let app = spawn_app().await;
    let (_, admin_token) = app.admin().await;
    let (_, owner_token) = app.register().await;
    let (_, other_token) = app.register().await;
    let test = app.create_test(&admin_token, false).await;

    let attempt: Value = app
        .client
        .post(app.url(&format!("/api/tests/{}/attempts", test["id"])))
        .bearer_auth(&owner_token)
        .json(&json!({ "answers": {} }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let url = app.url(&format!("/api/tests/attempts/{}", attempt["id"]));

    for (token, expected) in [(&owner_token, 200), (&admin_token, 200), (&other_token, 403)] {
        let response = app.client.get(&url).bearer_auth(token).send().await.unwrap();
        assert_eq!(response.status().as_u16(), expected);
    }
}

#[tokio::test]
async fn zero_question_test_always_scores_zero() {
    let pool = test_pool().await;
    let user_id = seed_user(&pool).await;
    let test_id = seed_test(&pool, true, &[]).await;
    let detail = load_test_detail(&pool, test_id).await.unwrap();

    for raw in [json!({}), json!({"1": 0, "2": 3})] {
        let attempt = submit_attempt(&pool, &detail, user_id, &raw).await.unwrap();
        assert_eq!(attempt.score, 0.0);
    }
}

#[tokio::test]
async fn full_and_empty_answer_maps_score_extremes() {
    let pool = test_pool().await;
    let user_id = seed_user(&pool).await;
    let test_id = seed_test(&pool, true, &[2, 0, 3]).await;
    let detail = load_test_detail(&pool, test_id).await.unwrap();

    let mut perfect = serde_json::Map::new();
    let mut wrong = serde_json::Map::new();
    for q in &detail.questions {
        perfect.insert(q.id.to_string(), json!(q.correct_option));
        wrong.insert(q.id.to_string(), json!(q.correct_option + 1));
    }

    let best = submit_attempt(&pool, &detail, user_id, &Value::Object(perfect)).await.unwrap();
    let worst = submit_attempt(&pool, &detail, user_id, &Value::Object(wrong)).await.unwrap();

    assert_eq!(best.score, 100.0);
    assert_eq!(worst.score, 0.0);
}

#[tokio::test]
async fn retake_check_happens_before_answer_parsing() {
    let pool = test_pool().await;
    let user_id = seed_user(&pool).await;
    let test_id = seed_test(&pool, false, &[0]).await;
    let detail = load_test_detail(&pool, test_id).await.unwrap();

    submit_attempt(&pool, &detail, user_id, &json!({})).await.unwrap();
    let second = submit_attempt(&pool, &detail, user_id, &json!("garbage")).await;

    assert!(matches!(second, Err(AppError::AttemptAlreadyExists)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_single_attempts_produce_one_row() {
    let pool = test_pool().await;
    let user_id = seed_user(&pool).await;
    let test_id = seed_test(&pool, false, &[1, 1]).await;
    let detail = load_test_detail(&pool, test_id).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = pool.clone();
        let detail = detail.clone();
        handles.push(tokio::spawn(async move {
            submit_attempt(&pool, &detail, user_id, &json!({})).await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(AppError::AttemptAlreadyExists) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM attempts").await, 1);
}
