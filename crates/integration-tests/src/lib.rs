//! Integration tests for the Emporium API.
//!
//! Each test builds the full router over a fresh in-memory store and drives
//! it with `tower::ServiceExt::oneshot`, so no database or network is needed.
//!
//! ```bash
//! cargo test -p emporium-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use emporium_api::config::{ApiConfig, LogFormat, SentryConfig, StoreBackend};
use emporium_api::db::MemoryStore;
use emporium_api::routes;
use emporium_api::state::AppState;

pub const TEST_PASSWORD: &str = "Passw0rd!";
const TEST_TOKEN_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6!";
const BODY_LIMIT: usize = 1024 * 1024;

/// A registered, logged-in user.
#[derive(Debug, Clone)]
pub struct Customer {
    pub id: String,
    pub token: String,
}

/// A decoded response: status plus the JSON envelope (or a JSON string for
/// plain-text bodies).
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    #[must_use]
    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }

    #[must_use]
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

pub struct TestApp {
    router: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let config = ApiConfig {
            store: StoreBackend::Memory,
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            token_secret: SecretString::from(TEST_TOKEN_SECRET),
            token_ttl_secs: 3600,
            log_format: LogFormat::Text,
            sentry: SentryConfig::default(),
        };
        let state = AppState::new(config, Arc::new(MemoryStore::new()));
        Self {
            router: routes::app(state),
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), BODY_LIMIT).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Reply { status, body }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Reply {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Reply {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> Reply {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>, body: Value) -> Reply {
        self.request(Method::DELETE, uri, token, Some(body)).await
    }

    /// Register a user and log them in.
    pub async fn customer(&self, email: &str, phone: &str) -> Customer {
        let reply = self
            .post("/users/register", None, registration(email, phone))
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);

        let reply = self
            .post(
                "/users/login",
                None,
                json!({"email": email, "password": TEST_PASSWORD}),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{:?}", reply.body);

        Customer {
            id: reply.data()["userId"].as_str().unwrap().to_string(),
            token: reply.data()["token"].as_str().unwrap().to_string(),
        }
    }

    /// Create a product (in its own category) and return its id.
    pub async fn product(&self, title: &str, price: &str, availability: bool) -> String {
        let reply = self
            .post(
                "/categories",
                None,
                json!({"name": format!("{title} category"), "description": "test"}),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
        let category_id = reply.data()["id"].as_str().unwrap().to_string();

        let reply = self
            .post(
                "/products",
                None,
                json!({
                    "title": title,
                    "description": format!("{title} for testing"),
                    "price": price,
                    "availability": availability,
                    "categoryId": category_id,
                }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
        reply.data()["id"].as_str().unwrap().to_string()
    }
}

/// A complete, valid registration body.
#[must_use]
pub fn registration(email: &str, phone: &str) -> Value {
    let address = json!({"street": "1 Orchard Lane", "city": "Springfield", "pincode": 560_001});
    json!({
        "name": "Test Customer",
        "email": email,
        "phone": phone,
        "password": TEST_PASSWORD,
        "address": {"shipping": address, "billing": address},
    })
}
