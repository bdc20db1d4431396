// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body, BodyDataStream},
    http::{header, Method, Request, StatusCode},
    Router,
};
use futures::StreamExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use oficina_backend::{
    build_router,
    config::StoreBackend,
    db::{DocumentStore, MemoryDocumentStore},
    AppConfig, AppState,
};

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryDocumentStore>,
}

pub fn app() -> TestApp {
    let config = AppConfig {
        jwt_secret: "segredo-de-teste".into(),
        store_backend: StoreBackend::Memory,
        bind_addr: "127.0.0.1:0".into(),
        trial_duration_days: 14,
        token_ttl_days: 7,
        bcrypt_cost: 4,
        business_utc_offset_hours: -3,
    };
    let store = Arc::new(MemoryDocumentStore::new());
    let dyn_store: Arc<dyn DocumentStore> = store.clone();
    TestApp { router: build_router(AppState::with_store(config, dyn_store)), store }
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    }
}

pub async fn call(app: &TestApp, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request(method, uri, token, body)).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
    (status, value)
}

pub async fn register(app: &TestApp, email: &str) -> (String, String) {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "fullName": "Dona da Oficina",
            "email": email,
            "password": "senha123",
            "confirmPassword": "senha123",
            "phone": "(11) 90000-0000"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (body["token"].as_str().unwrap().to_string(), body["uid"].as_str().unwrap().to_string())
}

pub async fn login(app: &TestApp, email: &str, password: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_string()
}

/// Cria um técnico pelo dono e devolve (token do técnico, uid).
pub async fn technician(app: &TestApp, owner_token: &str, email: &str, permissions: Value) -> (String, String) {
    let (status, created) = call(
        app,
        Method::POST,
        "/api/technicians",
        Some(owner_token),
        Some(json!({ "name": "Carlos", "email": email, "password": "123456", "permissions": permissions })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let uid = created["uid"].as_str().unwrap().to_string();
    (login(app, email, "123456").await, uid)
}

/// Leitor de eventos SSE sobre o corpo da resposta.
pub struct EventReader {
    body: BodyDataStream,
    buffer: String,
}

impl EventReader {
    /// Próximo evento (nome, data). `None` quando o servidor fecha o stream.
    pub async fn next(&mut self) -> Option<(String, String)> {
        loop {
            if let Some(end) = self.buffer.find("\n\n") {
                let block: String = self.buffer.drain(..end + 2).collect();
                // Comentários (keep-alive) não são eventos.
                if block.starts_with(':') {
                    continue;
                }
                let mut name = String::from("message");
                let mut data = String::new();
                for line in block.lines() {
                    if let Some(value) = line.strip_prefix("event:") {
                        name = value.trim().to_string();
                    } else if let Some(value) = line.strip_prefix("data:") {
                        data.push_str(value.trim_start());
                    }
                }
                return Some((name, data));
            }

            match tokio::time::timeout(Duration::from_secs(5), self.body.next()).await {
                Ok(Some(Ok(bytes))) => self.buffer.push_str(&String::from_utf8_lossy(&bytes)),
                Ok(Some(Err(_))) | Ok(None) => return None,
                Err(_) => panic!("stream sem eventos por 5s"),
            }
        }
    }

    /// Nomes dos próximos `count` eventos.
    pub async fn names(&mut self, count: usize) -> Vec<String> {
        let mut names = Vec::with_capacity(count);
        for _ in 0..count {
            let (name, _) = self.next().await.expect("stream fechou antes da hora");
            names.push(name);
        }
        names
    }
}

pub async fn open_stream(app: &TestApp, token: &str) -> EventReader {
    let response = app
        .router
        .clone()
        .oneshot(request(Method::GET, "/api/stream", Some(token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    EventReader { body: response.into_body().into_data_stream(), buffer: String::new() }
}
