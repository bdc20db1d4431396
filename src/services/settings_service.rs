// src/services/settings_service.rs

use std::sync::Arc;

use serde_json::Value;

use crate::{
    common::{error::AppError, fields::{string_or_empty, Fields}},
    db::store::{DocumentStore, SetMode},
    models::{access::AccessContext, settings::AppSettings},
};

/// Tamanho máximo do logo (a data URL inteira).
pub const MAX_LOGO_BYTES: usize = 2 * 1024 * 1024;

pub fn validate_logo(logo_url: &str) -> Result<(), AppError> {
    if !logo_url.starts_with("data:image/") {
        return Err(AppError::BadRequest("o logo precisa ser uma imagem (data:image/...)".into()));
    }
    if logo_url.len() > MAX_LOGO_BYTES {
        return Err(AppError::BadRequest("o logo precisa ter no máximo 2MB".into()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn DocumentStore>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    // Qualquer usuário da oficina lê as configurações (o logo aparece no menu).
    pub async fn get(&self, ctx: &AccessContext) -> Result<AppSettings, AppError> {
        let settings = self
            .store
            .get(&ctx.scope.settings())
            .await?
            .map(|doc| AppSettings { logo_url: string_or_empty(&doc.data, "logoUrl") })
            .unwrap_or_default();
        Ok(settings)
    }

    pub async fn set_logo(&self, ctx: &AccessContext, logo_url: &str) -> Result<AppSettings, AppError> {
        if !ctx.is_admin() {
            return Err(AppError::AdminOnly);
        }
        validate_logo(logo_url)?;
        self.write_logo(ctx, logo_url).await
    }

    pub async fn remove_logo(&self, ctx: &AccessContext) -> Result<AppSettings, AppError> {
        if !ctx.is_admin() {
            return Err(AppError::AdminOnly);
        }
        self.write_logo(ctx, "").await
    }

    async fn write_logo(&self, ctx: &AccessContext, logo_url: &str) -> Result<AppSettings, AppError> {
        let mut fields = Fields::new();
        fields.insert("logoUrl".into(), Value::String(logo_url.to_string()));
        self.store.set(&ctx.scope.settings(), fields, SetMode::Merge).await?;
        Ok(AppSettings { logo_url: logo_url.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logo_must_be_an_image_data_url() {
        assert!(validate_logo("data:image/png;base64,AAAA").is_ok());
        assert!(validate_logo("https://cdn/logo.png").is_err());
        let huge = format!("data:image/png;base64,{}", "A".repeat(MAX_LOGO_BYTES));
        assert!(validate_logo(&huge).is_err());
    }
}
