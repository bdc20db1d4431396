// src/services/account_service.rs

// Tela "Minha conta": dados pessoais e troca de senha do próprio usuário.

use serde_json::Value;

use crate::{
    common::{error::AppError, fields::Fields},
    db::{
        store::{DocPath, SetMode},
        ProfileRepository,
    },
    models::{
        access::{AccessContext, ResolutionSource, INITIAL_PASSWORD_FIELD},
        scope::legacy_employee_path,
        auth::{AuthResponse, ChangePasswordPayload},
        technician::UpdatePersonalDataPayload,
    },
    services::auth::AuthService,
};

#[derive(Clone)]
pub struct AccountService {
    profiles: ProfileRepository,
    auth: AuthService,
}

impl AccountService {
    pub fn new(profiles: ProfileRepository, auth: AuthService) -> Self {
        Self { profiles, auth }
    }

    /// Registro do técnico no caminho em que a resolução de papel o achou.
    /// Pelo perfil direto, o registro dentro do dono só conta se existir.
    async fn employee_record_path(&self, ctx: &AccessContext) -> Result<Option<DocPath>, AppError> {
        if ctx.resolved.employee_record().is_none() {
            return Ok(None);
        }
        let uid = &ctx.identity.uid;
        let path = match ctx.resolved.source {
            ResolutionSource::LegacyEmployee => return Ok(Some(legacy_employee_path(uid))),
            ResolutionSource::EmployeeSearch => return Ok(Some(ctx.scope.employee(uid))),
            ResolutionSource::DirectProfile => ctx.scope.employee(uid),
        };
        Ok(self.profiles.get_record(&path).await?.map(|_| path))
    }

    /// Grava no perfil plano e, para técnicos, também no registro de origem.
    pub async fn update_personal_data(
        &self,
        ctx: &AccessContext,
        payload: &UpdatePersonalDataPayload,
    ) -> Result<(), AppError> {
        let full_name = payload.full_name.trim().to_string();

        let mut patch = Fields::new();
        patch.insert("fullName".into(), Value::String(full_name.clone()));
        patch.insert("phone".into(), Value::String(payload.phone.trim().to_string()));
        patch.insert("birthDate".into(), Value::String(payload.birth_date.trim().to_string()));
        patch.insert("cpfCnpj".into(), Value::String(payload.cpf_cnpj.trim().to_string()));

        let uid = &ctx.identity.uid;
        if ctx.resolved.employee_record().is_some() {
            patch.insert("name".into(), Value::String(full_name.clone()));
        }
        if let Some(path) = self.employee_record_path(ctx).await? {
            self.profiles.write_record(&path, patch.clone(), SetMode::Merge).await?;
        }
        self.profiles.merge_profile(uid, patch).await?;
        self.auth.update_profile(uid, Some(&full_name), None).await?;
        Ok(())
    }

    /// Troca de senha com a senha atual. Para técnicos, encerra a obrigação do
    /// primeiro acesso e apaga a senha provisória do registro do dono.
    pub async fn change_password(
        &self,
        ctx: &AccessContext,
        payload: &ChangePasswordPayload,
    ) -> Result<AuthResponse, AppError> {
        let uid = &ctx.identity.uid;
        let session = self
            .auth
            .change_password(uid, &payload.current_password, &payload.new_password, &payload.confirm_password)
            .await?;

        if ctx.resolved.employee_record().is_some() {
            if let Some(path) = self.employee_record_path(ctx).await? {
                if let Some(doc) = self.profiles.get_record(&path).await? {
                    let mut record = doc.data;
                    record.remove(INITIAL_PASSWORD_FIELD);
                    record.insert("mustChangePassword".into(), Value::Bool(false));
                    self.profiles.write_record(&path, record, SetMode::Replace).await?;
                }
            }
            let mut flags = Fields::new();
            flags.insert("mustChangePassword".into(), Value::Bool(false));
            self.profiles.merge_profile(uid, flags).await?;
        }

        tracing::info!("🔑 Senha de {} atualizada.", uid);
        Ok(session)
    }
}
