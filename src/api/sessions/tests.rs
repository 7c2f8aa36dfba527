use axum::http::{Method, StatusCode};
use serde_json::json;
use time::Duration;
use tower::ServiceExt;

use crate::core::time::primitive_now_utc;
use crate::db::types::{AttemptOutcome, DifficultyLevel};
use crate::services::session_order;
use crate::test_support;

#[tokio::test]
async fn templates_are_grouped_by_category() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/sessions/templates",
            Some(&token),
            None,
        ))
        .await
        .expect("templates");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");

    let groups = body["data"].as_array().expect("groups");
    let categories: Vec<&str> =
        groups.iter().filter_map(|group| group["category"].as_str()).collect();
    assert_eq!(categories, vec!["daily", "pattern", "weekend"]);
    assert_eq!(groups[1]["templates"][0]["key"], "pattern_deep_dive");
    assert_eq!(groups[1]["templates"][0]["requires_pattern"], true);
}

#[tokio::test]
async fn daily_revision_respects_budget_and_difficulty_ceiling() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    let month_ago = primitive_now_utc() - Duration::days(30);
    for (title, difficulty) in [
        ("Two Sum", DifficultyLevel::Easy),
        ("Valid Anagram", DifficultyLevel::Easy),
        ("Group Anagrams", DifficultyLevel::Medium),
        ("Median of Two Sorted Arrays", DifficultyLevel::Hard),
    ] {
        let problem =
            test_support::insert_problem(ctx.state.db(), &user.id, title, difficulty).await;
        if difficulty == DifficultyLevel::Easy {
            test_support::insert_attempt(
                ctx.state.db(),
                &user.id,
                &problem.id,
                AttemptOutcome::Failed,
                10,
                month_ago,
            )
            .await;
        }
    }

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/sessions/generate",
            Some(&token),
            Some(json!({ "template_key": "daily_revision" })),
        ))
        .await
        .expect("generate");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");

    let total = body["data"]["total_planned_min"].as_u64().expect("total");
    assert!(total <= 35, "total {total}");
    assert_eq!(total, 30);
    assert_eq!(body["data"]["planned_duration_min"], 35);

    let problems = body["data"]["problems"].as_array().expect("problems");
    assert_eq!(problems.len(), 2);
    assert!(problems.iter().all(|problem| problem["difficulty"] == "easy"));
    let sum: u64 = problems.iter().filter_map(|problem| problem["planned_min"].as_u64()).sum();
    assert_eq!(sum, total);
    for (index, problem) in problems.iter().enumerate() {
        assert_eq!(problem["order_index"], index);
        assert!(!problem["reason"].as_str().unwrap_or_default().is_empty());
    }
}

#[tokio::test]
async fn daily_revision_rejects_sets_without_quick_wins() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    test_support::insert_problem(ctx.state.db(), &user.id, "Group Anagrams", DifficultyLevel::Medium)
        .await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/sessions/generate",
            Some(&token),
            Some(json!({ "template_key": "daily_revision" })),
        ))
        .await
        .expect("generate");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap_or_default()
        .starts_with("Not enough quick wins"));
}

#[tokio::test]
async fn generation_rejects_unmatched_pattern_and_unknown_template() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    test_support::insert_problem(ctx.state.db(), &user.id, "Two Sum", DifficultyLevel::Easy).await;
    let pattern = test_support::insert_pattern(ctx.state.db(), Some(&user.id), "Graphs").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/sessions/generate",
            Some(&token),
            Some(json!({ "template_key": "daily_mixed", "pattern_id": pattern.id })),
        ))
        .await
        .expect("generate");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap_or_default()
        .starts_with("No eligible problems"));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/sessions/generate",
            Some(&token),
            Some(json!({ "template_key": "pattern_deep_dive" })),
        ))
        .await
        .expect("generate");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/sessions/generate",
            Some(&token),
            Some(json!({ "template_key": "nightly" })),
        ))
        .await
        .expect("generate");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Unknown template 'nightly'");
}

#[tokio::test]
async fn create_session_keeps_requested_order() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    let easy =
        test_support::insert_problem(ctx.state.db(), &user.id, "Two Sum", DifficultyLevel::Easy)
            .await;
    let hard = test_support::insert_problem(
        ctx.state.db(),
        &user.id,
        "Word Ladder",
        DifficultyLevel::Hard,
    )
    .await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/sessions",
            Some(&token),
            Some(json!({
                "template_key": "daily_mixed",
                "planned_duration_min": 55,
                "problem_ids": [hard.id, easy.id]
            })),
        ))
        .await
        .expect("create");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert!(body["data"]["session_name"]
        .as_str()
        .unwrap_or_default()
        .starts_with("Daily Mixed "));
    assert_eq!(body["data"]["total_planned_min"], 55);
    assert_eq!(body["data"]["problems"][0]["id"], hard.id.as_str());
    assert_eq!(body["data"]["problems"][0]["planned_min"], 40);
    assert_eq!(body["data"]["problems"][1]["id"], easy.id.as_str());
    assert_eq!(body["data"]["problems"][1]["order_index"], 1);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/sessions",
            Some(&token),
            None,
        ))
        .await
        .expect("list");
    let body = test_support::read_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["problem_count"], 2);
}

#[tokio::test]
async fn create_session_rejects_foreign_problems() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let other = test_support::insert_user(ctx.state.db(), "bob@example.com", "long-password").await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    let foreign =
        test_support::insert_problem(ctx.state.db(), &other.id, "Two Sum", DifficultyLevel::Easy)
            .await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/sessions",
            Some(&token),
            Some(json!({
                "template_key": "daily_mixed",
                "planned_duration_min": 30,
                "problem_ids": [foreign.id]
            })),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

async fn stored_order(pool: &sqlx::PgPool, session_id: &str) -> Vec<(String, i32)> {
    sqlx::query_as::<_, (String, i32)>(
        "SELECT problem_id, order_index FROM session_problems \
         WHERE session_id = $1 ORDER BY order_index",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await
    .expect("session order")
}

fn assert_dense(order: &[(String, i32)]) {
    let indices: Vec<i32> = order.iter().map(|(_, index)| *index).collect();
    assert!(session_order::is_dense(&indices), "indices {indices:?}");
}

#[tokio::test]
async fn reorder_requires_the_same_problem_set() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    let mut ids = Vec::new();
    for title in ["A", "B", "C"] {
        let problem =
            test_support::insert_problem(ctx.state.db(), &user.id, title, DifficultyLevel::Easy)
                .await;
        ids.push(problem.id);
    }
    let session = test_support::insert_session(ctx.state.db(), &user.id, &ids).await;
    let uri = format!("/api/v1/sessions/{}/reorder", session.id);
    let initial = stored_order(ctx.state.db(), &session.id).await;
    assert_dense(&initial);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({ "problem_ids": [ids[0], ids[1]] })),
        ))
        .await
        .expect("reorder");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(stored_order(ctx.state.db(), &session.id).await, initial);

    let reversed = [ids[2].clone(), ids[1].clone(), ids[0].clone()];
    let mut states = Vec::new();
    for _ in 0..2 {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PUT,
                &uri,
                Some(&token),
                Some(json!({ "problem_ids": reversed })),
            ))
            .await
            .expect("reorder");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        let order: Vec<String> = body["data"]["problems"]
            .as_array()
            .expect("problems")
            .iter()
            .filter_map(|problem| problem["id"].as_str().map(str::to_string))
            .collect();
        assert_eq!(order, reversed.to_vec());

        let stored = stored_order(ctx.state.db(), &session.id).await;
        assert_dense(&stored);
        states.push(stored);
    }
    assert_eq!(states[0], states[1]);
    let stored_ids: Vec<&str> = states[0].iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(stored_ids, reversed.iter().map(String::as_str).collect::<Vec<_>>());
}

#[tokio::test]
async fn skip_moves_problem_to_the_end() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    let mut ids = Vec::new();
    for title in ["A", "B", "C"] {
        let problem =
            test_support::insert_problem(ctx.state.db(), &user.id, title, DifficultyLevel::Easy)
                .await;
        ids.push(problem.id);
    }
    let session = test_support::insert_session(ctx.state.db(), &user.id, &ids).await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/sessions/{}/skip", session.id),
            Some(&token),
            Some(json!({ "problem_id": ids[0] })),
        ))
        .await
        .expect("skip");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");

    let problems = body["data"]["problems"].as_array().expect("problems");
    assert_eq!(problems[0]["id"], ids[1].as_str());
    assert_eq!(problems[1]["id"], ids[2].as_str());
    assert_eq!(problems[2]["id"], ids[0].as_str());
    assert_eq!(problems[2]["order_index"], 2);
}

#[tokio::test]
async fn completed_sessions_cannot_be_reordered() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    let mut ids = Vec::new();
    for title in ["A", "B"] {
        let problem =
            test_support::insert_problem(ctx.state.db(), &user.id, title, DifficultyLevel::Easy)
                .await;
        ids.push(problem.id);
    }
    let session = test_support::insert_session(ctx.state.db(), &user.id, &ids).await;

    for _ in 0..2 {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PUT,
                &format!("/api/v1/sessions/{}/complete", session.id),
                Some(&token),
                None,
            ))
            .await
            .expect("complete");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        assert!(body["data"]["completed_at"].is_string());
    }

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/sessions/{}/skip", session.id),
            Some(&token),
            Some(json!({ "problem_id": ids[0] })),
        ))
        .await
        .expect("skip");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/sessions/{}/timer", session.id),
            Some(&token),
            Some(json!({ "elapsed_time_seconds": 30, "timer_state": "running" })),
        ))
        .await
        .expect("timer");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn sessions_are_scoped_to_their_owner() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let other = test_support::insert_user(ctx.state.db(), "bob@example.com", "long-password").await;
    let problem =
        test_support::insert_problem(ctx.state.db(), &owner.id, "Two Sum", DifficultyLevel::Easy)
            .await;
    let session = test_support::insert_session(ctx.state.db(), &owner.id, &[problem.id]).await;
    let other_token = test_support::bearer_token(&other.id, ctx.state.settings());
    let owner_token = test_support::bearer_token(&owner.id, ctx.state.settings());
    let uri = format!("/api/v1/sessions/{}", session.id);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::DELETE, &uri, Some(&other_token), None))
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::DELETE, &uri, Some(&owner_token), None))
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, &uri, Some(&owner_token), None))
        .await
        .expect("get");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
