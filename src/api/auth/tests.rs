use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;
use crate::test_support;

async fn login(app: &axum::Router, email: &str, password: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        ))
        .await
        .expect("login");
    let status = response.status();
    (status, test_support::read_json(response).await)
}

#[tokio::test]
async fn login_returns_token_pair_and_user() {
    let ctx = test_support::setup_test_context().await;
    test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;

    let (status, body) = login(&ctx.app, "Ana@Example.com", "long-password").await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["data"]["token_type"], "bearer");
    assert_eq!(body["data"]["expires_in"], 30 * 60);
    assert_eq!(body["data"]["user"]["email"], "ana@example.com");
    assert!(body["data"]["user"].get("hashed_password").is_none());

    let access = body["data"]["access_token"].as_str().expect("access token");
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/auth/me", Some(access), None))
        .await
        .expect("me");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let ctx = test_support::setup_test_context().await;
    test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;

    let (status, body) = login(&ctx.app, "ana@example.com", "wrong-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "response: {body}");
    assert_eq!(body["error"]["message"], "Incorrect email or password");
}

#[tokio::test]
async fn inactive_user_is_forbidden() {
    let ctx = test_support::setup_test_context().await;
    let user =
        test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;
    repositories::users::update(
        ctx.state.db(),
        &user.id,
        repositories::users::UpdateUser {
            name: None,
            role: Some(UserRole::User),
            is_active: Some(false),
            hashed_password: None,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .expect("deactivate");

    let (status, _) = login(&ctx.app, "ana@example.com", "long-password").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_is_rate_limited_per_email() {
    let ctx = test_support::setup_test_context().await;

    for _ in 0..10 {
        let (status, _) = login(&ctx.app, "nobody@example.com", "whatever-pass").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _) = login(&ctx.app, "nobody@example.com", "whatever-pass").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn refresh_rotates_and_revokes_the_old_token() {
    let ctx = test_support::setup_test_context().await;
    test_support::insert_user(ctx.state.db(), "ana@example.com", "long-password").await;

    let (_, body) = login(&ctx.app, "ana@example.com", "long-password").await;
    let first = body["data"]["refresh_token"].as_str().expect("refresh").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": first })),
        ))
        .await
        .expect("refresh");
    let status = response.status();
    let rotated = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {rotated}");
    let second = rotated["data"]["refresh_token"].as_str().expect("refresh").to_string();
    assert_ne!(first, second);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": first })),
        ))
        .await
        .expect("reuse");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/logout",
            None,
            Some(json!({ "refresh_token": second })),
        ))
        .await
        .expect("logout");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": second })),
        ))
        .await
        .expect("after logout");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_requires_bearer_token() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/auth/me", None, None))
        .await
        .expect("me");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["www-authenticate"], "Bearer");
}
