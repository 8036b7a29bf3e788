//! Common test utilities for integration tests
//!
//! Builds the full router over a `MemoryStore` and a scripted
//! `MockProcessor`, so tests need no database or network:
//! - Test user creation (free or pro) with JWT tokens
//! - Request helpers returning status and JSON body
//! - Webhook delivery helper

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use organizit_api::app::{build_router, AppState};
use organizit_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig, PaymentConfig};
use organizit_shared::auth::jwt::{create_token, Claims};
use organizit_shared::models::task::CreateTask;
use organizit_shared::models::user::{Plan, User};
use organizit_shared::payments::mock::MockProcessor;
use organizit_shared::payments::webhook::SIGNATURE_HEADER;
use organizit_shared::store::{MemoryStore, Store};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";
pub const WEBHOOK_SECRET: &str = "test-webhook-secret-hash";

/// A seeded user and a bearer token for them
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub processor: Arc<MockProcessor>,
    pub app: Router,
    pub config: Config,
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: Vec::new(),
            production: false,
        },
        database: DatabaseConfig {
            url: None,
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
        payment: PaymentConfig {
            flutterwave_secret_key: "FLWSECK_TEST-integration".to_string(),
            webhook_secret_hash: Some(WEBHOOK_SECRET.to_string()),
            frontend_url: "http://localhost:5173".to_string(),
            ..Default::default()
        },
    }
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let processor = Arc::new(MockProcessor::new());

        let state = AppState::new(store.clone(), processor.clone(), config.clone());
        let app = build_router(state);

        TestContext {
            store,
            processor,
            app,
            config,
        }
    }

    /// Seeds a user on `plan` and signs a token for them
    pub fn create_user(&self, name: &str, plan: Plan) -> TestUser {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}-{}@example.com", name.to_lowercase(), Uuid::new_v4()),
            plan,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_user(user.clone()).unwrap();

        let token = create_token(&Claims::new(user.id), JWT_SECRET).unwrap();
        TestUser { user, token }
    }

    /// Inserts `count` tasks for `user` directly in the store
    pub async fn seed_tasks(&self, user: &TestUser, count: usize) {
        for i in 0..count {
            self.store
                .create_task(CreateTask {
                    user_id: user.id(),
                    title: format!("Seeded task {}", i + 1),
                    description: None,
                })
                .await
                .unwrap();
        }
    }

    pub async fn plan_of(&self, user: &TestUser) -> Plan {
        self.store.find_user(user.id()).await.unwrap().unwrap().plan
    }

    /// Sends a request and returns the status and parsed JSON body
    /// (`Value::Null` for an empty body)
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        read_json(response).await
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send("GET", uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(&user.token), Some(body)).await
    }

    pub async fn create_task(&self, user: &TestUser, title: &str) -> (StatusCode, Value) {
        self.post("/api/tasks", user, serde_json::json!({ "title": title }))
            .await
    }

    /// Delivers a webhook with an optional `verif-hash` header
    pub async fn deliver_webhook(&self, body: &str, signature: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/payment/webhook")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }

        let request = builder.body(Body::from(body.to_string())).unwrap();
        let response = self.app.clone().oneshot(request).await.unwrap();
        read_json(response).await
    }
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };

    (status, body)
}

/// A `charge.completed` payload as the processor sends it
pub fn webhook_payload(tx_ref: &str, status: &str, amount: u32, user_id: &str) -> String {
    serde_json::json!({
        "event": "charge.completed",
        "data": {
            "id": 285959875,
            "tx_ref": tx_ref,
            "status": status,
            "amount": amount,
            "currency": "NGN",
            "meta": { "user_id": user_id, "plan": "pro" }
        }
    })
    .to_string()
}
