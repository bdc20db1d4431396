// tests/stream_flow.rs

mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Map, Value};

use common::{app, call, open_stream, register, technician};
use oficina_backend::db::{
    store::{DocPath, SetMode},
    DocumentStore,
};

#[tokio::test]
async fn owner_stream_starts_with_every_collection_and_settings() {
    let app = app();
    let (token, _) = register(&app, "dona@oficina.com").await;
    let (status, _) = call(&app, Method::POST, "/api/records/clients", Some(&token), Some(json!({ "name": "João" }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let mut stream = open_stream(&app, &token).await;
    let (name, data) = stream.next().await.unwrap();
    assert_eq!(name, "clients");
    let clients: Value = serde_json::from_str(&data).unwrap();
    assert_eq!(clients[0]["name"], "João");

    assert_eq!(
        stream.names(8).await,
        ["professionals", "services", "appointments", "transactions", "budgets", "yard", "stock", "settings"]
    );
}

#[tokio::test]
async fn technician_stream_skips_collections_without_permission() {
    let app = app();
    let (owner_token, _) = register(&app, "dona@oficina.com").await;
    let (tech_token, _) = technician(&app, &owner_token, "carlos@oficina.com", json!({ "agenda": true })).await;

    let mut stream = open_stream(&app, &tech_token).await;
    assert_eq!(stream.names(5).await, ["clients", "professionals", "services", "appointments", "settings"]);

    // Alteração numa coleção liberada chega como novo snapshot.
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/records/appointments",
        Some(&owner_token),
        Some(json!({ "clientName": "João" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (name, data) = stream.next().await.unwrap();
    assert_eq!(name, "appointments");
    assert_eq!(serde_json::from_str::<Value>(&data).unwrap().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn logout_closes_the_open_stream() {
    let app = app();
    let (token, uid) = register(&app, "dona@oficina.com").await;

    let mut stream = open_stream(&app, &token).await;
    assert_eq!(stream.names(9).await.len(), 9);
    assert_eq!(app.store.change_feed().active_listeners(), 9);

    let (status, _) = call(&app, Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let path = DocPath::parse(&format!("users/{uid}/clients/c9")).unwrap();
    app.store.set(&path, Map::new(), SetMode::Replace).await.unwrap();

    assert_eq!(stream.next().await, None);
    assert_eq!(app.store.change_feed().active_listeners(), 0);
}

#[tokio::test]
async fn revoked_permission_drops_the_collection_from_the_stream() {
    let app = app();
    let (owner_token, _) = register(&app, "dona@oficina.com").await;
    let (tech_token, tech_uid) = technician(
        &app,
        &owner_token,
        "carlos@oficina.com",
        json!({ "agenda": true, "financeiro": true }),
    )
    .await;

    let mut stream = open_stream(&app, &tech_token).await;
    assert_eq!(
        stream.names(6).await,
        ["clients", "professionals", "services", "appointments", "transactions", "settings"]
    );

    let (status, _) = call(
        &app,
        Method::PATCH,
        &format!("/api/technicians/{tech_uid}/permissions"),
        Some(&owner_token),
        Some(json!({ "key": "financeiro", "enabled": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/records/transactions",
        Some(&owner_token),
        Some(json!({ "type": "receita", "totalAmount": 100 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Religado sem o financeiro: snapshots novos e nada de transações.
    assert_eq!(stream.names(5).await, ["clients", "professionals", "services", "appointments", "settings"]);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/records/appointments",
        Some(&owner_token),
        Some(json!({ "clientName": "João" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(stream.next().await.unwrap().0, "appointments");
}
