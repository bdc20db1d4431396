// src/handlers/records.rs

// CRUD das coleções de negócio da oficina. A coleção vem do caminho e as
// regras de leitura/escrita do técnico ficam no RecordService.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::Value;

use crate::{
    common::{
        error::{ApiError, AppError},
        fields::Fields,
    },
    config::AppState,
    middleware::{
        access::Access,
        i18n::Locale,
        rbac::{PermPatioEdit, RequireActiveSubscription, RequirePermission},
    },
    models::records::TenantCollection,
};

fn collection(raw: &str, locale: &Locale) -> Result<TenantCollection, ApiError> {
    TenantCollection::parse(raw)
        .ok_or_else(|| AppError::NotFound(format!("coleção '{raw}'")).to_api_error(locale))
}

fn object(body: Value, locale: &Locale) -> Result<Fields, ApiError> {
    match body {
        Value::Object(fields) => Ok(fields),
        _ => Err(AppError::BadRequest("o corpo precisa ser um objeto JSON".into()).to_api_error(locale)),
    }
}

// GET /api/records/{collection}
#[utoipa::path(
    get,
    path = "/api/records/{collection}",
    tag = "Records",
    params(("collection" = String, Path, description = "clients, appointments, yard, transactions, ...")),
    responses(
        (status = 200, description = "Documentos da coleção com `id`"),
        (status = 402, description = "Assinatura inativa"),
        (status = 403, description = "Sem permissão para a coleção"),
        (status = 404, description = "Coleção desconhecida")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_records(
    State(app_state): State<AppState>,
    locale: Locale,
    _active: RequireActiveSubscription,
    Access(ctx): Access,
    Path(raw): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let collection = collection(&raw, &locale)?;
    let records = app_state
        .record_service
        .list(&ctx, collection)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(records)))
}

// GET /api/records/{collection}/{id}
#[utoipa::path(
    get,
    path = "/api/records/{collection}/{id}",
    tag = "Records",
    params(
        ("collection" = String, Path, description = "Coleção"),
        ("id" = String, Path, description = "Id do documento")
    ),
    responses(
        (status = 200, description = "Documento"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_record(
    State(app_state): State<AppState>,
    locale: Locale,
    _active: RequireActiveSubscription,
    Access(ctx): Access,
    Path((raw, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let collection = collection(&raw, &locale)?;
    let record = app_state
        .record_service
        .get(&ctx, collection, &id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(record)))
}

// POST /api/records/{collection}
#[utoipa::path(
    post,
    path = "/api/records/{collection}",
    tag = "Records",
    params(("collection" = String, Path, description = "Coleção")),
    responses(
        (status = 201, description = "Documento criado"),
        (status = 402, description = "Assinatura inativa"),
        (status = 403, description = "Sem permissão de escrita")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_record(
    State(app_state): State<AppState>,
    locale: Locale,
    _active: RequireActiveSubscription,
    Access(ctx): Access,
    Path(raw): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let collection = collection(&raw, &locale)?;
    let data = object(body, &locale)?;
    let created = app_state
        .record_service
        .create(&ctx, collection, data, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(created)))
}

// PATCH /api/records/{collection}/{id}
#[utoipa::path(
    patch,
    path = "/api/records/{collection}/{id}",
    tag = "Records",
    params(
        ("collection" = String, Path, description = "Coleção"),
        ("id" = String, Path, description = "Id do documento")
    ),
    responses(
        (status = 200, description = "Documento atualizado"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_record(
    State(app_state): State<AppState>,
    locale: Locale,
    _active: RequireActiveSubscription,
    Access(ctx): Access,
    Path((raw, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let collection = collection(&raw, &locale)?;
    let patch = object(body, &locale)?;
    let updated = app_state
        .record_service
        .update(&ctx, collection, &id, patch, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(updated)))
}

// DELETE /api/records/{collection}/{id}
#[utoipa::path(
    delete,
    path = "/api/records/{collection}/{id}",
    tag = "Records",
    params(
        ("collection" = String, Path, description = "Coleção"),
        ("id" = String, Path, description = "Id do documento")
    ),
    responses((status = 204, description = "Documento removido")),
    security(("api_jwt" = []))
)]
pub async fn delete_record(
    State(app_state): State<AppState>,
    locale: Locale,
    _active: RequireActiveSubscription,
    Access(ctx): Access,
    Path((raw, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let collection = collection(&raw, &locale)?;
    app_state
        .record_service
        .delete(&ctx, collection, &id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/yard/{id}/release
#[utoipa::path(
    post,
    path = "/api/yard/{id}/release",
    tag = "Records",
    params(("id" = String, Path, description = "Id do veículo no pátio")),
    responses(
        (status = 200, description = "Veículo liberado; agendamento vinculado finalizado"),
        (status = 403, description = "Requer 'Editar pátio'"),
        (status = 404, description = "Veículo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn release_vehicle(
    State(app_state): State<AppState>,
    locale: Locale,
    _active: RequireActiveSubscription,
    _perm: RequirePermission<PermPatioEdit>,
    Access(ctx): Access,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let released = app_state
        .record_service
        .release_vehicle(&ctx, &id, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(released)))
}
