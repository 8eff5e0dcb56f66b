//! Registration, login and user management.
//!
//! Requires PostgreSQL: TEST_DATABASE_URL=... cargo test -- --ignored

mod common;

use common::{TestApp, TEST_PASSWORD};
use serde_json::{json, Value};
use serial_test::serial;

#[tokio::test]
#[ignore] // Requires database
#[serial]
async fn register_creates_trialing_company_with_admin() {
    let app = TestApp::spawn().await;
    let company = app.register_company("Acme Builders").await;

    let response = app.get("/auth/me", &company.admin_token).await;
    assert_eq!(response.status(), 200);
    let me: Value = response.json().await.unwrap();
    assert_eq!(me["role"], "ADMIN");
    assert_eq!(me["companyId"], company.company_id.to_string());

    let response = app.get("/billing/status", &company.admin_token).await;
    assert_eq!(response.status(), 200);
    let status: Value = response.json().await.unwrap();
    assert_eq!(status["plan"], "STARTER");
    assert_eq!(status["status"], "TRIALING");
}

#[tokio::test]
#[ignore]
#[serial]
async fn duplicate_registration_is_conflict() {
    let app = TestApp::spawn().await;
    let body = json!({
        "companyName": "Acme Builders",
        "name": "Owner",
        "email": "owner@acme.test",
        "password": TEST_PASSWORD,
    });

    assert_eq!(app.post_public("/auth/register", &body).await.status(), 201);
    assert_eq!(app.post_public("/auth/register", &body).await.status(), 409);
}

#[tokio::test]
#[ignore]
#[serial]
async fn login_rejects_wrong_password() {
    let app = TestApp::spawn().await;
    let body = json!({
        "companyName": "Acme Builders",
        "name": "Owner",
        "email": "login@acme.test",
        "password": TEST_PASSWORD,
    });
    assert_eq!(app.post_public("/auth/register", &body).await.status(), 201);

    let response = app
        .post_public(
            "/auth/login",
            &json!({ "email": "login@acme.test", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(response.status(), 401);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["error"], "Invalid email or password");

    let response = app
        .post_public(
            "/auth/login",
            &json!({ "email": "LOGIN@acme.test", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let auth: Value = response.json().await.unwrap();
    assert_eq!(auth["tokenType"], "Bearer");
    assert!(auth["accessToken"].as_str().is_some());
}

#[tokio::test]
#[ignore]
#[serial]
async fn users_are_company_scoped_and_hide_password_hashes() {
    let app = TestApp::spawn().await;
    let acme = app.register_company("Acme Builders").await;
    let other = app.register_company("Other Co").await;

    let (_, manager_token) = app.user_token(&acme.admin_token, "MANAGER").await;

    let response = app.get("/users", &manager_token).await;
    assert_eq!(response.status(), 200);
    let users: Vec<Value> = response.json().await.unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("passwordHash").is_none()));
    assert!(users
        .iter()
        .all(|u| u["companyId"] == acme.company_id.to_string()));

    let response = app.get("/users", &other.admin_token).await;
    let users: Vec<Value> = response.json().await.unwrap();
    assert_eq!(users.len(), 1);

    // Only ADMIN may create users
    let response = app
        .post(
            "/users",
            &manager_token,
            &json!({
                "email": "new@acme.test",
                "name": "New",
                "password": TEST_PASSWORD,
                "role": "WORKER"
            }),
        )
        .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
#[serial]
async fn starter_plan_caps_users() {
    let app = TestApp::spawn().await;
    let company = app.register_company("Acme Builders").await;

    // STARTER allows five users including the ADMIN
    for _ in 0..4 {
        app.user_token(&company.admin_token, "WORKER").await;
    }

    let response = app
        .post(
            "/users",
            &company.admin_token,
            &json!({
                "email": "sixth@acme.test",
                "name": "Sixth",
                "password": TEST_PASSWORD,
                "role": "WORKER"
            }),
        )
        .await;
    assert_eq!(response.status(), 403);
    let error: Value = response.json().await.unwrap();
    assert_eq!(
        error["error"],
        "Plan limit reached. Upgrade your plan to continue."
    );

    let response = app.get("/billing/limits", &company.admin_token).await;
    let limits: Value = response.json().await.unwrap();
    assert_eq!(limits["usage"]["users"], 5);
    assert_eq!(limits["canAddUser"], false);
    assert_eq!(limits["canAddProject"], true);
}
