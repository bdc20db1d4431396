// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::AppState,
    docs::ApiDoc,
    handlers,
    middleware::{access::access_guard, auth::auth_guard},
};

pub fn build_router(app_state: AppState) -> Router {
    // Rotas públicas
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Só precisam do token: não dependem de papel nem de oficina resolvidos
    let session_routes = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/users/me", get(handlers::auth::get_me).patch(handlers::auth::update_me))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Tudo daqui para baixo roda com papel e escopo do dono já resolvidos
    let tenant_routes = Router::new()
        .route("/session", get(handlers::access::get_session))
        .route("/navigation", get(handlers::access::get_navigation))
        .route("/pages/{page}", get(handlers::access::check_page))
        .route("/account/personal-data", put(handlers::access::update_personal_data))
        .route("/account/password", put(handlers::access::change_password))
        .route("/migration/legacy", post(handlers::access::migrate_legacy))
        // Equipe técnica
        .route(
            "/technicians",
            post(handlers::technicians::create_technician).get(handlers::technicians::list_technicians),
        )
        .route("/technicians/{uid}", axum::routing::delete(handlers::technicians::delete_technician))
        .route(
            "/technicians/{uid}/permissions",
            put(handlers::technicians::replace_permissions).patch(handlers::technicians::toggle_permission),
        )
        .route("/technicians/{uid}/professional", put(handlers::technicians::link_professional))
        // Dados de negócio
        .route(
            "/records/{collection}",
            get(handlers::records::list_records).post(handlers::records::create_record),
        )
        .route(
            "/records/{collection}/{id}",
            get(handlers::records::get_record)
                .patch(handlers::records::update_record)
                .delete(handlers::records::delete_record),
        )
        .route("/yard/{id}/release", post(handlers::records::release_vehicle))
        .route("/dashboard", get(handlers::dashboard::get_dashboard))
        .route("/settings", get(handlers::settings::get_settings))
        .route(
            "/settings/logo",
            put(handlers::settings::update_logo).delete(handlers::settings::remove_logo),
        )
        .route("/stream", get(handlers::stream::stream_snapshots))
        // `layer` envolve de fora para dentro: o auth_guard roda primeiro.
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), access_guard))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/permissions", get(handlers::access::list_permissions))
        .nest("/api/auth", auth_routes)
        .nest("/api", session_routes.merge(tenant_routes))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}
