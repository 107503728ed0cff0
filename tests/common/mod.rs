use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use assignit::config::Config;
use assignit::email::Mailer;
use assignit::state::AppState;
use assignit::upload::{ImageUploader, UploadError};

/// Records every delivered mail. Addresses at `bounce.test` are rejected.
#[derive(Default)]
pub struct FakeMailer {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, to: &str, _subject: &str, html_body: &str) -> Result<(), String> {
        if to.ends_with("@bounce.test") {
            return Err("mailbox unavailable".to_string());
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), html_body.to_string()));
        Ok(())
    }
}

/// Hands out a fixed URL for every upload.
pub struct FakeUploader;

#[async_trait]
impl ImageUploader for FakeUploader {
    async fn upload(&self, _bytes: Bytes, filename: &str) -> Result<String, UploadError> {
        Ok(format!("https://images.test/{filename}"))
    }
}

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
    pub mailer: Arc<FakeMailer>,
}

/// A registered user and their token.
pub struct TestUser {
    pub id: String,
    pub token: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/register"))
            .json(&json!({ "username": username, "email": email, "password": password }))
            .send()
            .await
            .expect("register request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn login(&self, email: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("login request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Register `{name}@test.com` and return its id and token.
    pub async fn user(&self, name: &str) -> TestUser {
        let (body, status) = self
            .register(name, &format!("{name}@test.com"), "password123")
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {name} failed: {body}");
        TestUser {
            id: body["user"]["id"].as_str().unwrap().to_string(),
            token: body["access_token"].as_str().unwrap().to_string(),
        }
    }

    /// Create a workspace owned by `owner`, return the workspace JSON.
    pub async fn create_workspace(&self, owner: &TestUser, name: &str) -> Value {
        let (body, status) = self
            .post_auth("/api/v1/workspaces", &owner.token, &json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create workspace failed: {body}");
        body
    }

    /// `user` joins the workspace through its invite code.
    pub async fn join(&self, user: &TestUser, workspace: &Value) -> StatusCode {
        let (_, status) = self
            .post_auth(
                "/api/v1/workspaces/join",
                &user.token,
                &json!({ "inviteCode": workspace["inviteCode"] }),
            )
            .await;
        status
    }

    /// Create a project with the given statuses (`None` for the defaults).
    pub async fn create_project(
        &self,
        token: &str,
        workspace_id: &str,
        name: &str,
        statuses: Option<Value>,
    ) -> Value {
        let mut body = json!({
            "name": name,
            "startDate": "2026-01-01T00:00:00Z",
            "dueDate": "2026-12-31T00:00:00Z",
        });
        if let Some(statuses) = statuses {
            body["statuses"] = statuses;
        }
        let (body, status) = self
            .post_auth(&format!("/api/v1/workspaces/{workspace_id}/projects"), token, &body)
            .await;
        assert_eq!(status, StatusCode::CREATED, "create project failed: {body}");
        body
    }

    pub async fn create_sprint(&self, token: &str, project_id: &str, name: &str) -> Value {
        let (body, status) = self
            .post_auth(
                &format!("/api/v1/projects/{project_id}/sprints"),
                token,
                &json!({
                    "name": name,
                    "startDate": "2026-02-01T00:00:00Z",
                    "endDate": "2026-02-14T00:00:00Z",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create sprint failed: {body}");
        body
    }

    pub async fn create_task(&self, token: &str, sprint_id: &str, body: &Value) -> Value {
        let (body, status) = self
            .post_auth(&format!("/api/v1/sprints/{sprint_id}/tasks"), token, body)
            .await;
        assert_eq!(status, StatusCode::CREATED, "create task failed: {body}");
        body
    }

    /// Project statuses keyed by name.
    pub async fn status_ids(&self, token: &str, project_id: &str) -> Vec<(String, String)> {
        let (body, status) = self
            .get_auth(&format!("/api/v1/projects/{project_id}/statuses"), token)
            .await;
        assert_eq!(status, StatusCode::OK, "list statuses failed: {body}");
        body["statuses"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| {
                (
                    s["name"].as_str().unwrap().to_string(),
                    s["id"].as_str().unwrap().to_string(),
                )
            })
            .collect()
    }

    pub async fn count(&self, sql: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(&self.pool)
            .await
            .expect("count query failed")
    }

    /// Make an authenticated GET request.
    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated POST request with JSON body.
    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated PUT request with JSON body.
    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated DELETE request.
    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Spawn a test app with a fresh temporary database.
pub async fn spawn_app() -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let db_name = format!("assignit_test_{}", Uuid::now_v7().simple());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let config = Config {
        database_url: test_url,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        client_url: "http://localhost:5173".to_string(),
        max_body_size: 1_048_576,
        log_level: "warn".to_string(),
        smtp: None,
        upload: None,
    };

    let mailer = Arc::new(FakeMailer::default());
    let state = Arc::new(AppState {
        pool: pool.clone(),
        config,
        mailer: Some(mailer.clone() as Arc<dyn Mailer>),
        uploader: Some(Arc::new(FakeUploader) as Arc<dyn ImageUploader>),
    });
    let app = assignit::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        pool,
        client: Client::new(),
        db_name,
        mailer,
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
