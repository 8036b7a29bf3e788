/// Integration tests for the Organizit API
///
/// These tests drive the full router (auth layer, handlers, error mapping)
/// over the in-memory store:
/// - Health and authentication
/// - Task CRUD and ownership
/// - Free plan gate
/// - Plan and profile endpoints

mod common;

use axum::http::StatusCode;
use common::TestContext;
use organizit_shared::models::user::Plan;
use organizit_shared::plan_gate::UPGRADE_REQUIRED_MESSAGE;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_health_reports_memory_store() {
    let ctx = TestContext::new();

    let (status, body) = ctx.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "memory");
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let ctx = TestContext::new();

    let (status, body) = ctx.send("GET", "/api/tasks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = ctx
        .send("GET", "/api/tasks", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx.send("POST", "/api/payment/initialize", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_unknown_user_is_rejected() {
    let ctx = TestContext::new();
    let ghost = ctx.create_user("Ghost", Plan::Free);
    let other = TestContext::new();

    // Token is valid but the user only exists in the other context
    let (status, _) = other.get("/api/user/plan", &ghost).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_security_headers_present() {
    let ctx = TestContext::new();

    let response = {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        ctx.app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap()
    };

    assert_eq!(response.headers().get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
}

#[tokio::test]
async fn test_task_crud_lifecycle() {
    let ctx = TestContext::new();
    let user = ctx.create_user("Ada", Plan::Free);

    // Create
    let (status, body) = ctx
        .post(
            "/api/tasks",
            &user,
            json!({ "title": "  Write report  ", "description": "Quarterly numbers" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Task created successfully");
    assert_eq!(body["task"]["title"], "Write report");
    assert_eq!(body["task"]["status"], "pending");
    let task_id = body["task"]["id"].as_str().unwrap().to_string();
    let task_uri = format!("/api/tasks/{}", task_id);

    // Show
    let (status, body) = ctx.get(&task_uri, &user).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"]["description"], "Quarterly numbers");

    // Update title and clear description
    let (status, body) = ctx
        .send(
            "PUT",
            &task_uri,
            Some(&user.token),
            Some(json!({ "title": "Write final report", "description": null })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"]["title"], "Write final report");
    assert!(body["task"]["description"].is_null());

    // Toggle twice
    let toggle_uri = format!("{}/toggle", task_uri);
    let (status, body) = ctx.send("PATCH", &toggle_uri, Some(&user.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"]["status"], "completed");

    let (_, body) = ctx.send("PATCH", &toggle_uri, Some(&user.token), None).await;
    assert_eq!(body["task"]["status"], "pending");

    // Delete
    let (status, body) = ctx.send("DELETE", &task_uri, Some(&user.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task deleted successfully");

    let (status, body) = ctx.get(&task_uri, &user).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_list_tasks_newest_first_with_usage() {
    let ctx = TestContext::new();
    let user = ctx.create_user("Lister", Plan::Free);

    for title in ["first", "second", "third"] {
        let (status, _) = ctx.create_task(&user, title).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = ctx.get("/api/tasks", &user).await;
    assert_eq!(status, StatusCode::OK);

    let titles: Vec<&str> = body["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["third", "second", "first"]);
    assert_eq!(body["total_tasks"], 3);
    assert_eq!(body["task_limit"], 5);
    assert_eq!(body["remaining_tasks"], 2);
}

#[tokio::test]
async fn test_tasks_of_other_users_are_forbidden() {
    let ctx = TestContext::new();
    let owner = ctx.create_user("Owner", Plan::Free);
    let intruder = ctx.create_user("Intruder", Plan::Pro);

    let (_, body) = ctx.create_task(&owner, "Private").await;
    let task_uri = format!("/api/tasks/{}", body["task"]["id"].as_str().unwrap());

    let (status, body) = ctx.get(&task_uri, &intruder).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
    assert_eq!(body["message"], "Unauthorized");
    assert!(body.get("upgrade_required").is_none());

    let (status, _) = ctx
        .send("PUT", &task_uri, Some(&intruder.token), Some(json!({ "title": "mine" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.send("DELETE", &task_uri, Some(&intruder.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .send("PATCH", &format!("{}/toggle", task_uri), Some(&intruder.token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Intruder's list does not include it
    let (_, body) = ctx.get("/api/tasks", &intruder).await;
    assert_eq!(body["total_tasks"], 0);

    // Still intact for the owner
    let (status, body) = ctx.get(&task_uri, &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"]["title"], "Private");
}

#[tokio::test]
async fn test_create_task_validation() {
    let ctx = TestContext::new();
    let user = ctx.create_user("Validator", Plan::Free);

    let (status, body) = ctx.post("/api/tasks", &user, json!({ "title": "   " })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "title");

    let (status, _) = ctx
        .post("/api/tasks", &user, json!({ "title": "a".repeat(256) }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = ctx.post("/api/tasks", &user, json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, body) = ctx.get("/api/tasks", &user).await;
    assert_eq!(body["total_tasks"], 0);
}

#[tokio::test]
async fn test_free_plan_blocks_sixth_task() {
    let ctx = TestContext::new();
    let user = ctx.create_user("Limited", Plan::Free);

    for i in 0..5 {
        let (status, _) = ctx.create_task(&user, &format!("Task {}", i + 1)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = ctx.create_task(&user, "Task 6").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "upgrade_required");
    assert_eq!(body["message"], UPGRADE_REQUIRED_MESSAGE);
    assert_eq!(body["upgrade_required"], true);

    let (_, body) = ctx.get("/api/tasks", &user).await;
    assert_eq!(body["total_tasks"], 5);
    assert_eq!(body["remaining_tasks"], 0);
}

#[tokio::test]
async fn test_gate_answers_before_validation() {
    let ctx = TestContext::new();
    let user = ctx.create_user("Full", Plan::Free);
    ctx.seed_tasks(&user, 5).await;

    // Invalid body, but the limit is reported first
    let (status, body) = ctx.post("/api/tasks", &user, json!({ "title": "" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "upgrade_required");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_never_exceed_free_limit() {
    let ctx = Arc::new(TestContext::new());
    let user = Arc::new(ctx.create_user("Racer", Plan::Free));
    ctx.seed_tasks(&user, 4).await;

    let mut handles = Vec::new();
    for i in 0..12 {
        let ctx = ctx.clone();
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            ctx.create_task(&user, &format!("Racing task {}", i)).await.0
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::FORBIDDEN => {}
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(created, 1);
    let (_, body) = ctx.get("/api/tasks", &user).await;
    assert_eq!(body["total_tasks"], 5);
}

#[tokio::test]
async fn test_deleting_frees_a_slot() {
    let ctx = TestContext::new();
    let user = ctx.create_user("Recycler", Plan::Free);
    ctx.seed_tasks(&user, 5).await;

    let (_, body) = ctx.get("/api/tasks", &user).await;
    let oldest = body["tasks"][4]["id"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .send("DELETE", &format!("/api/tasks/{}", oldest), Some(&user.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx.create_task(&user, "Replacement").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_pro_plan_is_unlimited() {
    let ctx = TestContext::new();
    let user = ctx.create_user("Unlimited", Plan::Pro);
    ctx.seed_tasks(&user, 12).await;

    let (status, _) = ctx.create_task(&user, "Thirteenth").await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = ctx.get("/api/tasks", &user).await;
    assert_eq!(body["total_tasks"], 13);
    assert!(body["task_limit"].is_null());
    assert!(body["remaining_tasks"].is_null());
}

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let ctx = TestContext::new();
    let user = ctx.create_user("Seeker", Plan::Free);

    let uri = format!("/api/tasks/{}", uuid::Uuid::new_v4());
    let (status, body) = ctx.get(&uri, &user).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Task not found");
}

#[tokio::test]
async fn test_plan_endpoint() {
    let ctx = TestContext::new();
    let free = ctx.create_user("Free", Plan::Free);
    ctx.seed_tasks(&free, 2).await;

    let (status, body) = ctx.get("/api/user/plan", &free).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plan"], "free");
    assert_eq!(body["is_pro"], false);
    assert_eq!(body["task_limit"], 5);
    assert_eq!(body["current_tasks"], 2);
    assert_eq!(body["remaining_tasks"], 3);

    let pro = ctx.create_user("Pro", Plan::Pro);
    let (_, body) = ctx.get("/api/user/plan", &pro).await;
    assert_eq!(body["plan"], "pro");
    assert_eq!(body["is_pro"], true);
    assert!(body["task_limit"].is_null());
    assert!(body["remaining_tasks"].is_null());
}

#[tokio::test]
async fn test_profile_read_and_update() {
    let ctx = TestContext::new();
    let user = ctx.create_user("Profile", Plan::Free);
    ctx.seed_tasks(&user, 1).await;

    let (status, body) = ctx.get("/api/user/profile", &user).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], user.id().to_string());
    assert_eq!(body["plan"], "free");
    assert_eq!(body["current_tasks"], 1);

    let (status, body) = ctx
        .send(
            "PUT",
            "/api/user/profile",
            Some(&user.token),
            Some(json!({ "name": "Ada Lovelace", "email": "Ada.Lovelace@Example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Ada Lovelace");
    assert_eq!(body["user"]["email"], "ada.lovelace@example.com");
    assert_eq!(body["user"]["plan"], "free");
}

#[tokio::test]
async fn test_profile_update_rejects_bad_and_duplicate_email() {
    let ctx = TestContext::new();
    let first = ctx.create_user("First", Plan::Free);
    let second = ctx.create_user("Second", Plan::Free);

    let (status, _) = ctx
        .send(
            "PUT",
            "/api/user/profile",
            Some(&second.token),
            Some(json!({ "email": "nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = ctx
        .send(
            "PUT",
            "/api/user/profile",
            Some(&second.token),
            Some(json!({ "email": first.user.email })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_profile_update_cannot_change_plan() {
    let ctx = TestContext::new();
    let user = ctx.create_user("Sneaky", Plan::Free);

    let (status, _) = ctx
        .send(
            "PUT",
            "/api/user/profile",
            Some(&user.token),
            Some(json!({ "name": "Sneaky", "plan": "pro" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctx.plan_of(&user).await, Plan::Free);
}
