//! Common test utilities for integration tests
//!
//! Every test gets its own router over a fresh in-memory account store and
//! a mailer that records outgoing messages, so the suites run without
//! PostgreSQL or SMTP.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use partnerdesk_api::app::{build_router, AppState};
use partnerdesk_api::config::Config;
use partnerdesk_shared::auth::jwt::TokenLifetimes;
use partnerdesk_shared::mail::{MailError, Mailer, OutgoingEmail};
use partnerdesk_shared::store::{memory::MemoryAccountStore, AccountStore};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const ADMIN_EMAIL: &str = "root@partnerdesk.test";

/// Mailer that keeps every message it is asked to send
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    pub fail: bool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Transport("relay unreachable".to_string()));
        }
        self.sent.lock().await.push(email);
        Ok(())
    }
}

/// Response status, `Set-Cookie` values and parsed JSON body
pub struct TestResponse {
    pub status: StatusCode,
    pub cookies: Vec<String>,
    pub body: Value,
}

impl TestResponse {
    /// Value of the cookie `name` as set by this response
    pub fn cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{}=", name);
        self.cookies.iter().find_map(|cookie| {
            cookie
                .strip_prefix(&prefix)
                .and_then(|rest| rest.split(';').next())
                .map(str::to_string)
        })
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: Router,
    pub store: Arc<MemoryAccountStore>,
    pub mailer: Arc<RecordingMailer>,
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgresql://localhost/unused".to_string()),
        "JWT_SECRET" => Some(JWT_SECRET.to_string()),
        "ADMIN_EMAILS" => Some(ADMIN_EMAIL.to_string()),
        "FRONTEND_URL" => Some("https://partners.test".to_string()),
        _ => None,
    })
    .expect("test config")
}

impl TestContext {
    pub fn new() -> Self {
        Self::build(RecordingMailer::default(), TokenLifetimes::default())
    }

    /// Context whose mailer rejects every message
    pub fn with_failing_mailer() -> Self {
        Self::build(
            RecordingMailer {
                fail: true,
                ..Default::default()
            },
            TokenLifetimes::default(),
        )
    }

    pub fn with_lifetimes(lifetimes: TokenLifetimes) -> Self {
        Self::build(RecordingMailer::default(), lifetimes)
    }

    fn build(mailer: RecordingMailer, lifetimes: TokenLifetimes) -> Self {
        let store = Arc::new(MemoryAccountStore::new());
        let mailer = Arc::new(mailer);

        let state = AppState::with_lifetimes(
            test_config(),
            store.clone() as Arc<dyn AccountStore>,
            mailer.clone() as Arc<dyn Mailer>,
            lifetimes,
        );

        Self {
            app: build_router(state),
            store,
            mailer,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.app.clone().oneshot(request).await.expect("response");

        let status = response.status();
        let cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            cookies,
            body,
        }
    }

    pub async fn post_json(&self, uri: &str, body: Value, cookie: Option<&str>) -> TestResponse {
        self.request(Method::POST, uri, Some(body), cookie).await
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, None, cookie).await
    }

    /// Logs in as the allow-listed admin and returns the `Cookie` header value
    pub async fn admin_cookie(&self) -> String {
        let response = self
            .post_json(
                "/admin/login",
                serde_json::json!({ "email": ADMIN_EMAIL, "password": "Adm1n!Pass" }),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);

        let token = response.cookie("adminToken").expect("admin cookie");
        format!("adminToken={}", token)
    }

    /// Signs up an email account and returns the `Cookie` header value
    pub async fn session_cookie(&self, name: &str, email: &str, password: &str) -> String {
        let response = self
            .post_json(
                "/signup",
                serde_json::json!({ "name": name, "email": email, "password": password }),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);

        let token = response.cookie("token").expect("session cookie");
        format!("token={}", token)
    }

    /// Invite token from the most recent email sent to `email`
    pub async fn last_invite_token(&self, email: &str) -> String {
        let sent = self.mailer.sent.lock().await;
        let message = sent
            .iter()
            .rev()
            .find(|m| m.to == email)
            .expect("invite email");

        let start = message.text.find("token=").expect("token in link") + "token=".len();
        message.text[start..]
            .split(|c: char| c == '&' || c.is_whitespace())
            .next()
            .expect("token value")
            .to_string()
    }
}
