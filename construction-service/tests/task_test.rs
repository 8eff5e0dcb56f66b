//! Tasks, assignment and worker time logs.
//!
//! Requires PostgreSQL: TEST_DATABASE_URL=... cargo test -- --ignored

mod common;

use common::TestApp;
use serde_json::{json, Value};
use serial_test::serial;

async fn create_task(app: &TestApp, token: &str, project_id: &str, title: &str) -> Value {
    let response = app
        .post(
            "/tasks",
            token,
            &json!({
                "title": title,
                "projectId": project_id,
                "date": "2025-03-01",
                "duration": 8
            }),
        )
        .await;
    assert_eq!(response.status(), 201, "task creation failed");
    response.json().await.unwrap()
}

#[tokio::test]
#[ignore] // Requires database
#[serial]
async fn workers_only_see_assigned_tasks() {
    let app = TestApp::spawn().await;
    let company = app.register_company("Acme Builders").await;
    let (worker_id, worker_token) = app.user_token(&company.admin_token, "WORKER").await;

    let customer = app.create_customer(&company.admin_token, "Jane Client").await;
    let project = app
        .create_project(&company.admin_token, customer["id"].as_str().unwrap(), "Kitchen")
        .await;
    assert_eq!(project["status"], "PENDING");
    let project_id = project["id"].as_str().unwrap();

    let assigned = create_task(&app, &company.admin_token, project_id, "Demo").await;
    let unassigned = create_task(&app, &company.admin_token, project_id, "Paint").await;
    let assigned_id = assigned["id"].as_str().unwrap();

    let response = app
        .patch(
            &format!("/tasks/{}/assign", assigned_id),
            &company.admin_token,
            &json!({ "userIds": [worker_id, worker_id] }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let task: Value = response.json().await.unwrap();
    assert_eq!(task["assignedUsers"].as_array().unwrap().len(), 1);
    assert_eq!(task["project"]["name"], "Kitchen");

    let tasks: Vec<Value> = app.get("/tasks", &worker_token).await.json().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], assigned["id"]);

    let response = app
        .get(
            &format!("/tasks/{}", unassigned["id"].as_str().unwrap()),
            &worker_token,
        )
        .await;
    assert_eq!(response.status(), 403);

    // Workers may move status and notes only
    let response = app
        .patch(
            &format!("/tasks/{}", assigned_id),
            &worker_token,
            &json!({ "status": "IN_PROGRESS", "notes": "Started", "title": "Renamed" }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let task: Value = response.json().await.unwrap();
    assert_eq!(task["status"], "IN_PROGRESS");
    assert_eq!(task["notes"], "Started");
    assert_eq!(task["title"], "Demo");
}

#[tokio::test]
#[ignore]
#[serial]
async fn assigning_foreign_users_is_rejected() {
    let app = TestApp::spawn().await;
    let acme = app.register_company("Acme Builders").await;
    let other = app.register_company("Other Co").await;
    let (outsider_id, _) = app.user_token(&other.admin_token, "WORKER").await;

    let customer = app.create_customer(&acme.admin_token, "Jane Client").await;
    let project = app
        .create_project(&acme.admin_token, customer["id"].as_str().unwrap(), "Kitchen")
        .await;
    let task = create_task(&app, &acme.admin_token, project["id"].as_str().unwrap(), "Demo").await;

    let response = app
        .patch(
            &format!("/tasks/{}/assign", task["id"].as_str().unwrap()),
            &acme.admin_token,
            &json!({ "userIds": [outsider_id] }),
        )
        .await;
    assert_eq!(response.status(), 400);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["error"], "One or more users not found in your company");
}

#[tokio::test]
#[ignore]
#[serial]
async fn time_logs_belong_to_the_logging_worker() {
    let app = TestApp::spawn().await;
    let company = app.register_company("Acme Builders").await;
    let (worker_id, worker_token) = app.user_token(&company.admin_token, "WORKER").await;
    let (_, other_worker_token) = app.user_token(&company.admin_token, "WORKER").await;

    let customer = app.create_customer(&company.admin_token, "Jane Client").await;
    let project = app
        .create_project(&company.admin_token, customer["id"].as_str().unwrap(), "Kitchen")
        .await;
    let task = create_task(&app, &company.admin_token, project["id"].as_str().unwrap(), "Demo").await;

    // Only workers log time
    let body = json!({ "taskId": task["id"], "date": "2025-03-01", "hours": 7.5 });
    assert_eq!(
        app.post("/timelogs", &company.admin_token, &body).await.status(),
        403
    );

    let zero = json!({ "taskId": task["id"], "date": "2025-03-01", "hours": 0 });
    assert_eq!(app.post("/timelogs", &worker_token, &zero).await.status(), 400);

    let response = app.post("/timelogs", &worker_token, &body).await;
    assert_eq!(response.status(), 201);
    let log: Value = response.json().await.unwrap();
    assert_eq!(log["userId"], worker_id.to_string());
    assert_eq!(log["type"], "REGULAR");
    assert_eq!(log["approved"], false);

    let path = format!("/timelogs/{}", log["id"].as_str().unwrap());
    assert_eq!(app.get(&path, &worker_token).await.status(), 200);
    assert_eq!(app.get(&path, &other_worker_token).await.status(), 403);
    assert_eq!(app.get(&path, &company.admin_token).await.status(), 200);

    let logs: Vec<Value> = app
        .get("/timelogs", &other_worker_token)
        .await
        .json()
        .await
        .unwrap();
    assert!(logs.is_empty());
}
