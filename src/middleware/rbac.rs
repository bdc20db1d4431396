// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    middleware::i18n::Locale,
    models::{access::AccessContext, permissions::PermissionKey},
    services::record_service::{ensure_active, ensure_any},
};

fn context<'a>(parts: &'a Parts, locale: &Locale) -> Result<&'a AccessContext, ApiError> {
    parts
        .extensions
        .get::<AccessContext>()
        .ok_or_else(|| AppError::ProfileNotResolved.to_api_error(locale))
}

/// Uma permissão de técnico conhecida em tempo de compilação.
pub trait PermissionDef: Send + Sync + 'static {
    fn key() -> PermissionKey;
}

/// Dono passa sempre; técnico precisa da permissão `T`.
pub struct RequirePermission<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let locale = Locale::from_headers(&parts.headers);
        let ctx = context(parts, &locale)?;

        ensure_any(ctx, &[T::key()]).map_err(|e| {
            tracing::warn!("{} sem a permissão '{}'.", ctx.identity.uid, T::key());
            e.to_api_error(&locale)
        })?;

        Ok(RequirePermission(PhantomData))
    }
}

/// Só o dono da oficina.
pub struct RequireAdmin;

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let locale = Locale::from_headers(&parts.headers);
        if context(parts, &locale)?.is_admin() {
            Ok(RequireAdmin)
        } else {
            Err(AppError::AdminOnly.to_api_error(&locale))
        }
    }
}

/// Barra as operações de negócio quando a assinatura do dono não está ativa (402).
pub struct RequireActiveSubscription;

impl<S> FromRequestParts<S> for RequireActiveSubscription
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let locale = Locale::from_headers(&parts.headers);
        ensure_active(context(parts, &locale)?).map_err(|e| e.to_api_error(&locale))?;
        Ok(RequireActiveSubscription)
    }
}

// ---
// Permissões usadas em rotas fixas
// ---

pub struct PermPatioEdit;
impl PermissionDef for PermPatioEdit {
    fn key() -> PermissionKey { PermissionKey::PatioEdit }
}
