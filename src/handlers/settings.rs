// src/handlers/settings.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{access::Access, i18n::Locale, rbac::RequireAdmin},
    models::settings::{AppSettings, UpdateLogoPayload},
};

// GET /api/settings
#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "Settings",
    responses((status = 200, description = "Configurações da oficina", body = AppSettings)),
    security(("api_jwt" = []))
)]
pub async fn get_settings(
    State(app_state): State<AppState>,
    locale: Locale,
    Access(ctx): Access,
) -> Result<impl IntoResponse, ApiError> {
    let settings = app_state
        .settings_service
        .get(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(settings)))
}

// PUT /api/settings/logo
#[utoipa::path(
    put,
    path = "/api/settings/logo",
    tag = "Settings",
    request_body = UpdateLogoPayload,
    responses(
        (status = 200, description = "Logo salvo", body = AppSettings),
        (status = 400, description = "Não é imagem ou passa de 2MB"),
        (status = 403, description = "Só o dono da oficina")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_logo(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireAdmin,
    Access(ctx): Access,
    Json(payload): Json<UpdateLogoPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let settings = app_state
        .settings_service
        .set_logo(&ctx, &payload.logo_url)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(settings)))
}

// DELETE /api/settings/logo
#[utoipa::path(
    delete,
    path = "/api/settings/logo",
    tag = "Settings",
    responses((status = 200, description = "Logo removido", body = AppSettings)),
    security(("api_jwt" = []))
)]
pub async fn remove_logo(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireAdmin,
    Access(ctx): Access,
) -> Result<impl IntoResponse, ApiError> {
    let settings = app_state
        .settings_service
        .remove_logo(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(settings)))
}
