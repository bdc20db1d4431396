// src/handlers/access.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{access::Access, i18n::Locale, rbac::RequireAdmin},
    models::{
        access::SessionView,
        auth::{AuthResponse, ChangePasswordPayload},
        permissions::{navigation_for, NavItem, Page, PermissionKey, PERMISSION_CATALOG},
        technician::UpdatePersonalDataPayload,
    },
    services::{access_service::AccessService, migration_service::MigrationReport, page_gate::PageDecision},
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionInfo {
    pub key: PermissionKey,
    pub label: String,
    pub description: String,
    pub depends_on: Option<PermissionKey>,
}

// GET /api/permissions
#[utoipa::path(
    get,
    path = "/api/permissions",
    tag = "Access",
    responses((status = 200, description = "Catálogo de permissões dos técnicos", body = Vec<PermissionInfo>))
)]
pub async fn list_permissions() -> Json<Vec<PermissionInfo>> {
    let catalog = PERMISSION_CATALOG
        .iter()
        .map(|entry| PermissionInfo {
            key: entry.key,
            label: entry.label.to_string(),
            description: entry.description.to_string(),
            depends_on: entry.depends_on,
        })
        .collect();
    Json(catalog)
}

// GET /api/session
#[utoipa::path(
    get,
    path = "/api/session",
    tag = "Access",
    responses(
        (status = 200, description = "Papel, oficina, permissões e assinatura resolvidos", body = SessionView),
        (status = 401, description = "Token inválido"),
        (status = 403, description = "Perfil não resolvido")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_session(Access(ctx): Access) -> Json<SessionView> {
    Json(AccessService::session_view(&ctx, Utc::now()))
}

// GET /api/navigation
#[utoipa::path(
    get,
    path = "/api/navigation",
    tag = "Access",
    responses((status = 200, description = "Itens do menu para o usuário", body = Vec<NavItem>)),
    security(("api_jwt" = []))
)]
pub async fn get_navigation(Access(ctx): Access) -> Json<Vec<NavItem>> {
    Json(navigation_for(ctx.role(), &ctx.permissions))
}

// GET /api/pages/{page}
#[utoipa::path(
    get,
    path = "/api/pages/{page}",
    tag = "Access",
    params(("page" = String, Path, description = "Id da página, ex.: financeiro")),
    responses(
        (status = 200, description = "Página liberada ou destino do redirecionamento", body = PageDecision),
        (status = 404, description = "Página desconhecida")
    ),
    security(("api_jwt" = []))
)]
pub async fn check_page(
    State(app_state): State<AppState>,
    locale: Locale,
    Access(ctx): Access,
    Path(page): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let page = Page::parse(&page)
        .ok_or_else(|| AppError::NotFound(format!("página '{page}'")).to_api_error(&locale))?;

    let decision = app_state.page_gate.check(&ctx, page, locale.lang());
    Ok((StatusCode::OK, Json(decision)))
}

// PUT /api/account/personal-data
#[utoipa::path(
    put,
    path = "/api/account/personal-data",
    tag = "Account",
    request_body = UpdatePersonalDataPayload,
    responses(
        (status = 204, description = "Dados pessoais salvos"),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_personal_data(
    State(app_state): State<AppState>,
    locale: Locale,
    Access(ctx): Access,
    Json(payload): Json<UpdatePersonalDataPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    app_state
        .account_service
        .update_personal_data(&ctx, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

// PUT /api/account/password
#[utoipa::path(
    put,
    path = "/api/account/password",
    tag = "Account",
    request_body = ChangePasswordPayload,
    responses(
        (status = 200, description = "Senha trocada; token novo", body = AuthResponse),
        (status = 400, description = "Senha fraca ou confirmação diferente"),
        (status = 401, description = "Senha atual incorreta")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_password(
    State(app_state): State<AppState>,
    locale: Locale,
    Access(ctx): Access,
    Json(payload): Json<ChangePasswordPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let session = app_state
        .account_service
        .change_password(&ctx, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    // Tokens antigos morreram; streams abertos com eles também.
    app_state.session_signals.notify(&ctx.identity.uid);
    Ok((StatusCode::OK, Json(session)))
}

// POST /api/migration/legacy
#[utoipa::path(
    post,
    path = "/api/migration/legacy",
    tag = "Access",
    responses(
        (status = 200, description = "Relatório da migração (ou da execução anterior)", body = MigrationReport),
        (status = 403, description = "Só o dono da oficina")
    ),
    security(("api_jwt" = []))
)]
pub async fn migrate_legacy(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireAdmin,
    Access(ctx): Access,
) -> Result<impl IntoResponse, ApiError> {
    let report = app_state
        .migration_service
        .migrate_legacy(&ctx, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(report)))
}
