// src/handlers/technicians.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{access::Access, i18n::Locale, rbac::RequireAdmin},
    models::technician::{
        CreateTechnicianPayload, LinkProfessionalPayload, ReplacePermissionsPayload, TechnicianSummary,
        TogglePermissionPayload,
    },
};

// POST /api/technicians
#[utoipa::path(
    post,
    path = "/api/technicians",
    tag = "Technicians",
    request_body = CreateTechnicianPayload,
    responses(
        (status = 201, description = "Técnico criado com senha provisória", body = TechnicianSummary),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Só o dono da oficina"),
        (status = 409, description = "E-mail já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_technician(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireAdmin,
    Access(ctx): Access,
    Json(payload): Json<CreateTechnicianPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let created = app_state
        .technician_service
        .create(&ctx, &payload, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(created)))
}

// GET /api/technicians
#[utoipa::path(
    get,
    path = "/api/technicians",
    tag = "Technicians",
    responses(
        (status = 200, description = "Equipe técnica da oficina", body = Vec<TechnicianSummary>),
        (status = 403, description = "Só o dono da oficina")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_technicians(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireAdmin,
    Access(ctx): Access,
) -> Result<impl IntoResponse, ApiError> {
    let technicians = app_state
        .technician_service
        .list(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(technicians)))
}

// PUT /api/technicians/{uid}/permissions
#[utoipa::path(
    put,
    path = "/api/technicians/{uid}/permissions",
    tag = "Technicians",
    params(("uid" = String, Path, description = "Uid do técnico")),
    request_body = ReplacePermissionsPayload,
    responses(
        (status = 200, description = "Permissões normalizadas e gravadas", body = TechnicianSummary),
        (status = 404, description = "Técnico não pertence à oficina")
    ),
    security(("api_jwt" = []))
)]
pub async fn replace_permissions(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireAdmin,
    Access(ctx): Access,
    Path(uid): Path<String>,
    Json(payload): Json<ReplacePermissionsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = app_state
        .technician_service
        .replace_permissions(&ctx, &uid, &payload.permissions)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    app_state.session_signals.notify(&uid);
    Ok((StatusCode::OK, Json(updated)))
}

// PATCH /api/technicians/{uid}/permissions
#[utoipa::path(
    patch,
    path = "/api/technicians/{uid}/permissions",
    tag = "Technicians",
    params(("uid" = String, Path, description = "Uid do técnico")),
    request_body = TogglePermissionPayload,
    responses(
        (status = 200, description = "Permissão alterada (com dependências)", body = TechnicianSummary),
        (status = 404, description = "Técnico não pertence à oficina")
    ),
    security(("api_jwt" = []))
)]
pub async fn toggle_permission(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireAdmin,
    Access(ctx): Access,
    Path(uid): Path<String>,
    Json(payload): Json<TogglePermissionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = app_state
        .technician_service
        .toggle_permission(&ctx, &uid, payload.key, payload.enabled)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    app_state.session_signals.notify(&uid);
    Ok((StatusCode::OK, Json(updated)))
}

// PUT /api/technicians/{uid}/professional
#[utoipa::path(
    put,
    path = "/api/technicians/{uid}/professional",
    tag = "Technicians",
    params(("uid" = String, Path, description = "Uid do técnico")),
    request_body = LinkProfessionalPayload,
    responses(
        (status = 200, description = "Vínculo com o profissional gravado", body = TechnicianSummary),
        (status = 404, description = "Técnico ou profissional não pertence à oficina")
    ),
    security(("api_jwt" = []))
)]
pub async fn link_professional(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireAdmin,
    Access(ctx): Access,
    Path(uid): Path<String>,
    Json(payload): Json<LinkProfessionalPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = app_state
        .technician_service
        .link_professional(&ctx, &uid, payload.professional_id.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(updated)))
}

// DELETE /api/technicians/{uid}
#[utoipa::path(
    delete,
    path = "/api/technicians/{uid}",
    tag = "Technicians",
    params(("uid" = String, Path, description = "Uid do técnico")),
    responses(
        (status = 204, description = "Técnico e credenciais removidos"),
        (status = 404, description = "Técnico não pertence à oficina")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_technician(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireAdmin,
    Access(ctx): Access,
    Path(uid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .technician_service
        .delete(&ctx, &uid)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    app_state.page_gate.forget(&uid);
    app_state.session_signals.notify(&uid);
    Ok(StatusCode::NO_CONTENT)
}
