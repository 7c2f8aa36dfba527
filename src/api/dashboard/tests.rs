use axum::http::{Method, StatusCode};
use time::Duration;
use tower::ServiceExt;

use crate::core::time::primitive_now_utc;
use crate::db::types::{AttemptOutcome, DifficultyLevel};
use crate::test_support;

#[tokio::test]
async fn empty_account_has_zeroed_stats() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/dashboard/stats",
            Some(&token),
            None,
        ))
        .await
        .expect("stats");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["data"]["total_problems"], 0);
    assert_eq!(body["data"]["avg_confidence"], 0.0);
    assert_eq!(body["data"]["current_streak"], 0);
    assert!(body["data"]["weakest_pattern"].is_null());
}

#[tokio::test]
async fn stats_reflect_latest_attempts_streak_and_weakest_pattern() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    let graphs = test_support::insert_pattern(ctx.state.db(), Some(&user.id), "Graphs").await;
    let arrays = test_support::insert_pattern(ctx.state.db(), Some(&user.id), "Arrays").await;
    test_support::insert_pattern(ctx.state.db(), Some(&user.id), "Tries").await;

    let course = test_support::insert_problem(
        ctx.state.db(),
        &user.id,
        "Course Schedule",
        DifficultyLevel::Medium,
    )
    .await;
    let two_sum =
        test_support::insert_problem(ctx.state.db(), &user.id, "Two Sum", DifficultyLevel::Easy)
            .await;
    test_support::insert_problem(ctx.state.db(), &user.id, "Word Search II", DifficultyLevel::Hard)
        .await;
    test_support::link_patterns(ctx.state.db(), &course.id, &[graphs.id.clone()]).await;
    test_support::link_patterns(ctx.state.db(), &two_sum.id, &[arrays.id.clone()]).await;

    let now = primitive_now_utc();
    test_support::insert_attempt(
        ctx.state.db(),
        &user.id,
        &course.id,
        AttemptOutcome::Failed,
        30,
        now - Duration::days(1),
    )
    .await;
    test_support::insert_attempt(
        ctx.state.db(),
        &user.id,
        &two_sum.id,
        AttemptOutcome::Passed,
        40,
        now - Duration::days(2),
    )
    .await;
    test_support::insert_attempt(
        ctx.state.db(),
        &user.id,
        &two_sum.id,
        AttemptOutcome::Passed,
        90,
        now,
    )
    .await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/dashboard/stats",
            Some(&token),
            None,
        ))
        .await
        .expect("stats");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");

    let stats = &body["data"];
    assert_eq!(stats["total_problems"], 3);
    assert_eq!(stats["mastered_problems"], 1);
    assert_eq!(stats["total_attempts"], 3);
    assert_eq!(stats["avg_confidence"], 60.0);
    assert_eq!(stats["current_streak"], 3);
    assert_eq!(stats["weakest_pattern"]["id"], graphs.id.as_str());
    assert_eq!(stats["weakest_pattern"]["avg_confidence"], 30.0);
}
