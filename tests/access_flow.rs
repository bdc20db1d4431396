// tests/access_flow.rs

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{app, call, login, register};
use oficina_backend::{db::DocumentStore, models::scope::profile_path};

#[tokio::test]
async fn owner_signup_starts_a_trial_scoped_to_itself() {
    let app = app();
    let (token, uid) = register(&app, "Dona@Oficina.com").await;

    let (status, session) = call(&app, Method::GET, "/api/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["role"], "admin");
    assert_eq!(session["ownerUid"], uid.as_str());
    assert_eq!(session["email"], "dona@oficina.com");
    assert_eq!(session["subscription"]["status"], "trialing");
    assert_eq!(session["subscription"]["isActive"], true);
    assert_eq!(session["subscription"]["trialDaysLeft"], 14);
    assert_eq!(session["navigation"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn signup_rejects_mismatched_confirmation() {
    let app = app();
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "fullName": "Dona",
            "email": "dona@oficina.com",
            "password": "senha123",
            "confirmPassword": "outra123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("senhas"), "{body}");
}

#[tokio::test]
async fn technician_is_scoped_to_owner_and_redirected_once() {
    let app = app();
    let (owner_token, owner_uid) = register(&app, "dona@oficina.com").await;

    let (status, created) = call(
        &app,
        Method::POST,
        "/api/technicians",
        Some(&owner_token),
        Some(json!({
            "name": "Carlos",
            "email": "carlos@oficina.com",
            "password": "123456",
            "permissions": { "agenda": true, "financeiro": false }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["permissions"]["agenda"], true);
    assert_eq!(created["mustChangePassword"], true);

    let tech_token = login(&app, "carlos@oficina.com", "123456").await;
    let (_, session) = call(&app, Method::GET, "/api/session", Some(&tech_token), None).await;
    assert_eq!(session["role"], "employee");
    assert_eq!(session["ownerUid"], owner_uid.as_str());
    assert_eq!(session["mustChangePassword"], true);

    let (_, first) = call(&app, Method::GET, "/api/pages/financeiro", Some(&tech_token), None).await;
    assert_eq!(first["allowed"], false);
    assert_eq!(first["page"], "dashboard");
    assert_eq!(first["reason"], "missingPermission");
    assert!(first["notice"].is_string());

    let (_, second) = call(&app, Method::GET, "/api/pages/financeiro", Some(&tech_token), None).await;
    assert_eq!(second["page"], "dashboard");
    assert!(second["notice"].is_null());

    let (_, agenda) = call(&app, Method::GET, "/api/pages/agenda", Some(&tech_token), None).await;
    assert_eq!(agenda["allowed"], true);

    // Leitura de dados segue as mesmas permissões.
    let (status, _) = call(&app, Method::GET, "/api/records/transactions", Some(&tech_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, appointments) = call(&app, Method::GET, "/api/records/appointments", Some(&tech_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(appointments, json!([]));

    // Gestão da equipe é só do dono.
    let (status, _) = call(&app, Method::GET, "/api/technicians", Some(&tech_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn records_never_cross_tenants() {
    let app = app();
    let (token_a, _) = register(&app, "a@oficina.com").await;
    let (token_b, _) = register(&app, "b@oficina.com").await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/records/clients",
        Some(&token_b),
        Some(json!({ "name": "Cliente da B" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, clients_a) = call(&app, Method::GET, "/api/records/clients", Some(&token_a), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(clients_a, json!([]));

    let (_, clients_b) = call(&app, Method::GET, "/api/records/clients", Some(&token_b), None).await;
    assert_eq!(clients_b.as_array().unwrap().len(), 1);
    assert_eq!(clients_b[0]["name"], "Cliente da B");
}

#[tokio::test]
async fn inactive_subscription_blocks_business_routes_but_not_account() {
    let app = app();
    let (token, uid) = register(&app, "dona@oficina.com").await;

    let mut patch = serde_json::Map::new();
    patch.insert("subscriptionStatus".into(), json!("canceled"));
    app.store.update(&profile_path(&uid), patch).await.unwrap();

    let (status, _) = call(&app, Method::GET, "/api/records/clients", Some(&token), None).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

    let (_, page) = call(&app, Method::GET, "/api/pages/agenda", Some(&token), None).await;
    assert_eq!(page["page"], "conta");
    assert_eq!(page["reason"], "subscriptionInactive");

    let (_, account) = call(&app, Method::GET, "/api/pages/conta", Some(&token), None).await;
    assert_eq!(account["allowed"], true);
}

#[tokio::test]
async fn logout_invalidates_issued_tokens() {
    let app = app();
    let (token, _) = register(&app, "dona@oficina.com").await;

    let (status, me) = call(&app, Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "dona@oficina.com");

    let (status, _) = call(&app, Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, Method::GET, "/api/session", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
