// src/middleware/access.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::{access::AccessContext, auth::Identity},
};

// Roda depois do `auth_guard`. Nenhuma rota escopada por dono passa daqui sem
// papel e tenant resolvidos.
pub async fn access_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .cloned()
        .ok_or_else(|| AppError::InvalidToken.to_api_error(&locale))?;

    let context = app_state
        .access_service
        .build_context(identity, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tracing::debug!(
        "Acesso de {} resolvido: papel {}, oficina {}.",
        context.identity.uid,
        context.role().as_str(),
        context.scope.owner_uid()
    );

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// Contexto de acesso já resolvido para o handler.
#[derive(Debug, Clone)]
pub struct Access(pub AccessContext);

impl<S> FromRequestParts<S> for Access
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessContext>()
            .cloned()
            .map(Access)
            .ok_or_else(|| AppError::ProfileNotResolved.to_api_error(&Locale::from_headers(&parts.headers)))
    }
}
