/// Registration, login and token refresh

mod common;

use axum::http::StatusCode;
use common::TestContext;
use serde_json::json;
use uuid::Uuid;

fn unique_email() -> String {
    format!("awa-{}@Example.com", Uuid::new_v4())
}

#[tokio::test]
async fn test_register_client_gets_welcome_bonus() {
    let ctx = TestContext::new().await.unwrap();
    let email = unique_email();

    let (status, body) = ctx
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "email": email,
                "password": "secret123",
                "full_name": "Awa Kone",
                "role": "client",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["token_type"], "bearer");
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert_eq!(body["user"]["email"], email.to_lowercase());
    assert_eq!(body["user"]["coin_balance"], 50);
    assert_eq!(body["user"]["language"], "fr");
    assert!(body["user"]["tasker_profile"].is_null());
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_tasker_creates_profile() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "email": unique_email(),
                "password": "secret123",
                "full_name": "Moussa Diallo",
                "role": "tasker",
                "country": "senegal",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["user"]["tasker_profile"]["is_available"], true);
    assert_eq!(body["user"]["country"], "senegal");
}

#[tokio::test]
async fn test_register_rejects_duplicates_admins_and_weak_passwords() {
    let ctx = TestContext::new().await.unwrap();
    let email = unique_email();
    let register = |email: String, password: &str, role: &str| {
        json!({
            "email": email,
            "password": password,
            "full_name": "Test User",
            "role": role,
        })
    };

    let (status, _) = ctx
        .request("POST", "/api/auth/register", None, Some(register(email.clone(), "secret123", "client")))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Email comparison ignores case
    let (status, body) = ctx
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(register(email.to_uppercase(), "secret123", "client")),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email already registered");

    let (status, _) = ctx
        .request("POST", "/api/auth/register", None, Some(register(unique_email(), "secret123", "admin")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .request("POST", "/api/auth/register", None, Some(register(unique_email(), "onlyletters", "client")))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_login_refresh_and_me() {
    let ctx = TestContext::new().await.unwrap();
    let email = unique_email();

    let (status, _) = ctx
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "email": email,
                "password": "secret123",
                "full_name": "Awa Kone",
                "role": "client",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = ctx
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": "wrong-password1" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, login) = ctx
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", login);

    // A refresh token is not accepted as an access token
    let refresh_token = login["refresh_token"].as_str().unwrap().to_string();
    let as_access = common::TestUser {
        user: ctx.client.user.clone(),
        token: refresh_token.clone(),
    };
    let (status, _) = ctx.request("GET", "/api/auth/me", Some(&as_access), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, refreshed) = ctx
        .request(
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh_token })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", refreshed);

    let access = common::TestUser {
        user: ctx.client.user.clone(),
        token: refreshed["access_token"].as_str().unwrap().to_string(),
    };
    let (status, me) = ctx.request("GET", "/api/auth/me", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], email.to_lowercase());
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = ctx.request("GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx.request("GET", "/api/categories", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
