use axum::http::{Method, StatusCode};
use serde_json::json;
use time::Duration;
use tower::ServiceExt;

use crate::core::time::primitive_now_utc;
use crate::db::types::{AttemptOutcome, DifficultyLevel};
use crate::repositories;
use crate::test_support;

#[tokio::test]
async fn create_and_fetch_problem_with_patterns() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    let global = test_support::insert_pattern(ctx.state.db(), None, "Sliding Window").await;
    let own = test_support::insert_pattern(ctx.state.db(), Some(&user.id), "Two Pointers").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/problems",
            Some(&token),
            Some(json!({
                "title": "Longest Substring Without Repeating Characters",
                "source": "leetcode",
                "url": "https://leetcode.com/problems/longest-substring-without-repeating-characters/",
                "difficulty": "medium",
                "pattern_ids": [global.id, own.id]
            })),
        ))
        .await
        .expect("create");
    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["data"]["status"], "unsolved");
    assert_eq!(created["data"]["total_attempts"], 0);
    assert_eq!(created["data"]["patterns"].as_array().map(Vec::len), Some(2));

    let problem_id = created["data"]["id"].as_str().expect("id").to_string();
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/problems/{problem_id}"),
            Some(&token),
            None,
        ))
        .await
        .expect("get");
    let status = response.status();
    let fetched = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {fetched}");
    assert_eq!(fetched["data"]["difficulty"], "medium");
    assert!(fetched["data"]["schedule"].is_null());
}

#[tokio::test]
async fn invisible_pattern_ids_are_rejected() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let other = test_support::insert_user(ctx.state.db(), "bob@example.com", "long-password").await;
    let foreign = test_support::insert_pattern(ctx.state.db(), Some(&other.id), "Private").await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/problems",
            Some(&token),
            Some(json!({
                "title": "Two Sum",
                "difficulty": "easy",
                "pattern_ids": [foreign.id]
            })),
        ))
        .await
        .expect("create");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
}

#[tokio::test]
async fn create_rejects_empty_title_and_bad_url() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());

    for body in [
        json!({ "title": "", "difficulty": "easy" }),
        json!({ "title": "Two Sum", "difficulty": "easy", "url": "not a url" }),
    ] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/problems",
                Some(&token),
                Some(body),
            ))
            .await
            .expect("create");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn list_filters_by_query_difficulty_and_status() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    let db = ctx.state.db();

    let two_sum = test_support::insert_problem(db, &user.id, "Two Sum", DifficultyLevel::Easy).await;
    test_support::insert_problem(db, &user.id, "Three Sum", DifficultyLevel::Medium).await;
    test_support::insert_problem(db, &user.id, "Word Ladder", DifficultyLevel::Hard).await;
    test_support::insert_attempt(
        db,
        &user.id,
        &two_sum.id,
        AttemptOutcome::Passed,
        80,
        primitive_now_utc() - Duration::days(2),
    )
    .await;

    let cases = [
        ("/api/v1/problems?q=sum", 2),
        ("/api/v1/problems?q=SUM&difficulty=medium", 1),
        ("/api/v1/problems?status=solved", 1),
        ("/api/v1/problems?status=unsolved", 2),
        ("/api/v1/problems?page=2&page_size=2", 1),
    ];

    for (uri, expected) in cases {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, uri, Some(&token), None))
            .await
            .expect("list");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "{uri}: {body}");
        assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(expected), "{uri}: {body}");
    }
}

#[tokio::test]
async fn problems_of_other_users_are_not_found() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let other = test_support::insert_user(ctx.state.db(), "bob@example.com", "long-password").await;
    let problem =
        test_support::insert_problem(ctx.state.db(), &owner.id, "Two Sum", DifficultyLevel::Easy)
            .await;
    let token = test_support::bearer_token(&other.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/problems/{}", problem.id),
            Some(&token),
            None,
        ))
        .await
        .expect("get");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_is_blocked_while_attempts_exist() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    let problem =
        test_support::insert_problem(ctx.state.db(), &user.id, "Two Sum", DifficultyLevel::Easy)
            .await;
    test_support::insert_attempt(
        ctx.state.db(),
        &user.id,
        &problem.id,
        AttemptOutcome::Failed,
        30,
        primitive_now_utc(),
    )
    .await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/problems/{}", problem.id),
            Some(&token),
            None,
        ))
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn delete_recompacts_sessions_containing_the_problem() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    let db = ctx.state.db();

    let first = test_support::insert_problem(db, &user.id, "First", DifficultyLevel::Easy).await;
    let middle = test_support::insert_problem(db, &user.id, "Middle", DifficultyLevel::Easy).await;
    let last = test_support::insert_problem(db, &user.id, "Last", DifficultyLevel::Easy).await;
    let session = test_support::insert_session(
        db,
        &user.id,
        &[first.id.clone(), middle.id.clone(), last.id.clone()],
    )
    .await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/problems/{}", middle.id),
            Some(&token),
            None,
        ))
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let rows = repositories::sessions::list_problems(db, &session.id).await.expect("rows");
    let ids: Vec<&str> = rows.iter().map(|row| row.problem_id.as_str()).collect();
    let indices: Vec<i32> = rows.iter().map(|row| row.order_index).collect();
    assert_eq!(ids, vec![first.id.as_str(), last.id.as_str()]);
    assert_eq!(indices, vec![0, 1]);
}

#[tokio::test]
async fn urgent_ranks_weak_stale_hard_problems_first() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    let db = ctx.state.db();
    let now = primitive_now_utc();

    let fresh = test_support::insert_problem(db, &user.id, "Fresh", DifficultyLevel::Easy).await;
    let stale = test_support::insert_problem(db, &user.id, "Stale", DifficultyLevel::Hard).await;
    test_support::insert_attempt(db, &user.id, &fresh.id, AttemptOutcome::Passed, 80, now - Duration::days(2))
        .await;
    test_support::insert_attempt(db, &user.id, &stale.id, AttemptOutcome::Passed, 20, now - Duration::days(30))
        .await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/problems/urgent?limit=1",
            Some(&token),
            None,
        ))
        .await
        .expect("urgent");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");

    let items = body["data"].as_array().expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], stale.id.as_str());
    assert_eq!(items[0]["days_since_last"], 30);
    assert_eq!(items[0]["confidence"], 20);
    assert!(items[0]["reason"].as_str().is_some_and(|reason| !reason.is_empty()));
}

#[tokio::test]
async fn problem_attempts_are_listed_newest_first() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    let db = ctx.state.db();
    let now = primitive_now_utc();
    let problem = test_support::insert_problem(db, &user.id, "Two Sum", DifficultyLevel::Easy).await;

    let older = test_support::insert_attempt(
        db,
        &user.id,
        &problem.id,
        AttemptOutcome::Failed,
        30,
        now - Duration::days(5),
    )
    .await;
    let newer =
        test_support::insert_attempt(db, &user.id, &problem.id, AttemptOutcome::Passed, 90, now)
            .await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/problems/{}/attempts", problem.id),
            Some(&token),
            None,
        ))
        .await
        .expect("attempts");
    let body = test_support::read_json(response).await;
    let ids: Vec<&str> =
        body["data"].as_array().expect("items").iter().filter_map(|a| a["id"].as_str()).collect();
    assert_eq!(ids, vec![newer.id.as_str(), older.id.as_str()]);
}
