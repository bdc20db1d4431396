// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    common::i18n::{permission_denied_notice, Lang, Message},
    db::store::StoreError,
    middleware::i18n::Locale,
    models::permissions::PermissionKey,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // --- Autenticação ---
    #[error("E-mail já cadastrado")]
    EmailAlreadyInUse,

    #[error("E-mail inválido")]
    InvalidEmail,

    #[error("Senha fraca")]
    WeakPassword,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Senha incorreta")]
    WrongPassword,

    #[error("Senhas não coincidem")]
    PasswordMismatch,

    #[error("Token inválido")]
    InvalidToken,

    // --- Acesso ---
    #[error("Perfil de acesso não resolvido")]
    ProfileNotResolved,

    #[error("Sem escopo de oficina")]
    ScopeUnavailable,

    #[error("Permissão '{0}' necessária")]
    PermissionRequired(PermissionKey),

    #[error("Somente o administrador")]
    AdminOnly,

    #[error("Assinatura inativa")]
    SubscriptionInactive,

    #[error("Não encontrado: {0}")]
    NotFound(String),

    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    #[error("Erro no store: {0}")]
    Store(#[from] StoreError),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// Erro já traduzido, pronto para virar resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self { status, error: error.into(), details: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidEmail
            | AppError::WeakPassword
            | AppError::PasswordMismatch
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::EmailAlreadyInUse => StatusCode::CONFLICT,
            AppError::UserNotFound | AppError::WrongPassword | AppError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AppError::ProfileNotResolved
            | AppError::ScopeUnavailable
            | AppError::PermissionRequired(_)
            | AppError::AdminOnly => StatusCode::FORBIDDEN,
            AppError::SubscriptionInactive => StatusCode::PAYMENT_REQUIRED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Traduz o erro para o idioma do cliente. Erros internos são logados aqui
    /// e chegam ao cliente só como a mensagem genérica.
    pub fn to_api_error(self, locale: &Locale) -> ApiError {
        let lang = locale.lang();
        let status = self.status();

        let message = match self {
            AppError::ValidationError(errors) => {
                let mut details = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                return ApiError {
                    status,
                    error: Message::ValidationFailed.text(lang).to_string(),
                    details: Some(json!(details)),
                };
            }
            AppError::EmailAlreadyInUse => Message::EmailAlreadyInUse.text(lang).to_string(),
            AppError::InvalidEmail => Message::InvalidEmail.text(lang).to_string(),
            AppError::WeakPassword => Message::WeakPassword.text(lang).to_string(),
            AppError::UserNotFound => Message::UserNotFound.text(lang).to_string(),
            AppError::WrongPassword => Message::WrongPassword.text(lang).to_string(),
            AppError::PasswordMismatch => Message::PasswordMismatch.text(lang).to_string(),
            AppError::InvalidToken => Message::InvalidToken.text(lang).to_string(),
            AppError::ProfileNotResolved => Message::ProfileNotResolved.text(lang).to_string(),
            AppError::ScopeUnavailable => Message::ScopeUnavailable.text(lang).to_string(),
            AppError::PermissionRequired(key) => {
                permission_denied_label(lang, key)
            }
            AppError::AdminOnly => Message::AdminOnly.text(lang).to_string(),
            AppError::SubscriptionInactive => Message::SubscriptionInactive.text(lang).to_string(),
            AppError::NotFound(_) | AppError::Store(StoreError::NotFound(_)) => {
                Message::NotFound.text(lang).to_string()
            }
            AppError::Store(StoreError::PermissionDenied(ref path)) => {
                tracing::warn!("Store negou acesso a '{}'.", path);
                Message::PermissionRequired.text(lang).to_string()
            }
            AppError::BadRequest(reason) => {
                format!("{} {}", Message::BadRequest.text(lang), reason)
            }
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                Message::Unexpected.text(lang).to_string()
            }
        };

        ApiError { status, error: message, details: None }
    }
}

fn permission_denied_label(lang: Lang, key: PermissionKey) -> String {
    match lang {
        Lang::Pt => format!(
            "{} Permissão necessária: \"{}\".",
            Message::PermissionRequired.text(lang),
            key.catalog_entry().label
        ),
        Lang::En => format!(
            "{} Required permission: \"{}\".",
            Message::PermissionRequired.text(lang),
            key.catalog_entry().label
        ),
    }
}

// Usado pelas páginas: o mesmo aviso que o painel mostra ao redirecionar.
pub fn page_denied_notice(lang: Lang, key: PermissionKey) -> String {
    permission_denied_notice(lang, key.catalog_entry().label)
}
