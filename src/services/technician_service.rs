// src/services/technician_service.rs

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    common::{
        error::AppError,
        fields::{timestamp_value, Fields},
    },
    db::{store::SetMode, ProfileRepository},
    models::{
        access::{AccessContext, EmployeeRecord, Role, INITIAL_PASSWORD_FIELD},
        permissions::{PermissionKey, Permissions},
        technician::{CreateTechnicianPayload, TechnicianSummary},
    },
    services::{
        auth::{normalize_email, AuthService},
        record_service::ensure_id,
    },
};

impl From<&EmployeeRecord> for TechnicianSummary {
    fn from(record: &EmployeeRecord) -> Self {
        Self {
            uid: record.uid.clone(),
            name: record.name.clone(),
            email: record.email.clone(),
            permissions: record.permissions,
            must_change_password: record.must_change_password,
            professional_id: record.professional_id.clone(),
            active: record.permissions.any_granted(),
        }
    }
}

fn require_owner(ctx: &AccessContext) -> Result<(), AppError> {
    if ctx.is_admin() { Ok(()) } else { Err(AppError::AdminOnly) }
}

// Gestão da equipe técnica pelo dono da oficina.
#[derive(Clone)]
pub struct TechnicianService {
    profiles: ProfileRepository,
    auth: AuthService,
}

impl TechnicianService {
    pub fn new(profiles: ProfileRepository, auth: AuthService) -> Self {
        Self { profiles, auth }
    }

    /// Conta primeiro; se a conta falhar nada é gravado. Se gravar os
    /// registros falhar, a conta recém-criada é apagada.
    pub async fn create(
        &self,
        ctx: &AccessContext,
        payload: &CreateTechnicianPayload,
        now: DateTime<Utc>,
    ) -> Result<TechnicianSummary, AppError> {
        require_owner(ctx)?;
        let professional_id = self.checked_professional(ctx, payload.professional_id.as_deref()).await?;

        let name = payload.name.trim();
        let account = self
            .auth
            .create_account(&payload.email, &payload.password, Some(name), now)
            .await?;

        let permissions = Permissions::from_value(&payload.permissions).normalized();

        let mut fields = Fields::new();
        fields.insert("uid".into(), Value::String(account.uid.clone()));
        fields.insert("adminId".into(), Value::String(ctx.scope.owner_uid().to_string()));
        fields.insert("role".into(), Value::String(Role::Employee.as_str().into()));
        fields.insert("name".into(), Value::String(name.to_string()));
        fields.insert("email".into(), Value::String(normalize_email(&payload.email)));
        fields.insert("permissions".into(), Value::Object(permissions.to_fields()));
        fields.insert("mustChangePassword".into(), Value::Bool(true));
        fields.insert(INITIAL_PASSWORD_FIELD.into(), Value::String(payload.password.clone()));
        if let Some(professional_id) = professional_id {
            fields.insert("professionalId".into(), Value::String(professional_id));
        }
        fields.insert("createdAt".into(), timestamp_value(now));
        fields.extend(ctx.resolved.subscription_input().to_parent_snapshot());

        let record = EmployeeRecord::from_fields(&account.uid, &fields);

        if let Err(e) = self.persist_new(ctx, &record, fields).await {
            tracing::error!("🔥 Falha ao gravar o técnico {}; removendo a conta criada.", account.uid);
            // Sem registro pela metade: apaga o que tiver sido gravado.
            if let Err(cleanup) = self.profiles.delete_employee(&ctx.scope, &account.uid).await {
                tracing::warn!("Registro de {} não pôde ser removido: {}", account.uid, cleanup);
            }
            self.auth.delete_account(&account.uid).await?;
            return Err(e);
        }

        tracing::info!("✅ Técnico {} adicionado à oficina {}.", account.uid, ctx.scope.owner_uid());
        Ok(TechnicianSummary::from(&record))
    }

    async fn persist_new(
        &self,
        ctx: &AccessContext,
        record: &EmployeeRecord,
        fields: Fields,
    ) -> Result<(), AppError> {
        self.profiles
            .write_employee(&ctx.scope, &record.uid, fields, SetMode::Replace)
            .await?;
        self.profiles
            .replace_profile(&record.uid, record.to_profile_fields(ctx.scope.owner_uid()))
            .await?;
        Ok(())
    }

    pub async fn list(&self, ctx: &AccessContext) -> Result<Vec<TechnicianSummary>, AppError> {
        require_owner(ctx)?;
        let docs = self.profiles.list_employees(&ctx.scope).await?;
        Ok(docs
            .iter()
            .map(|doc| TechnicianSummary::from(&EmployeeRecord::from_fields(doc.id(), &doc.data)))
            .collect())
    }

    async fn load(&self, ctx: &AccessContext, uid: &str) -> Result<EmployeeRecord, AppError> {
        ensure_id(uid)?;
        let doc = self
            .profiles
            .get_employee(&ctx.scope, uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("employees/{uid}")))?;
        Ok(EmployeeRecord::from_fields(uid, &doc.data))
    }

    // Vínculo vazio conta como nenhum; id desconhecido na oficina é 404.
    async fn checked_professional(
        &self,
        ctx: &AccessContext,
        professional_id: Option<&str>,
    ) -> Result<Option<String>, AppError> {
        let Some(id) = professional_id.map(str::trim).filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        ensure_id(id)?;
        if !self.profiles.professional_exists(&ctx.scope, id).await? {
            return Err(AppError::NotFound(format!("professionals/{id}")));
        }
        Ok(Some(id.to_string()))
    }

    /// Liga o técnico a um profissional da oficina (ou desfaz com `None`).
    /// O painel do técnico mostra só o que é desse profissional.
    pub async fn link_professional(
        &self,
        ctx: &AccessContext,
        uid: &str,
        professional_id: Option<&str>,
    ) -> Result<TechnicianSummary, AppError> {
        require_owner(ctx)?;
        let mut record = self.load(ctx, uid).await?;
        let professional_id = self.checked_professional(ctx, professional_id).await?;

        let value = professional_id.clone().map(Value::String).unwrap_or(Value::Null);
        let mut patch = Fields::new();
        patch.insert("professionalId".into(), value.clone());
        self.profiles
            .write_employee(&ctx.scope, &record.uid, patch, SetMode::Merge)
            .await?;

        record.professional_id = professional_id;
        record.raw.insert("professionalId".into(), value);
        self.profiles
            .merge_profile(&record.uid, record.to_profile_fields(ctx.scope.owner_uid()))
            .await?;

        tracing::info!("Técnico {} vinculado ao profissional {:?}.", record.uid, record.professional_id);
        Ok(TechnicianSummary::from(&record))
    }

    /// Substitui o conjunto inteiro de permissões (formulário do dono).
    pub async fn replace_permissions(
        &self,
        ctx: &AccessContext,
        uid: &str,
        raw: &Value,
    ) -> Result<TechnicianSummary, AppError> {
        require_owner(ctx)?;
        let record = self.load(ctx, uid).await?;
        let permissions = Permissions::from_value(raw).normalized();
        self.write_permissions(ctx, record, permissions).await
    }

    /// Liga/desliga uma única permissão aplicando as dependências.
    pub async fn toggle_permission(
        &self,
        ctx: &AccessContext,
        uid: &str,
        key: PermissionKey,
        enabled: bool,
    ) -> Result<TechnicianSummary, AppError> {
        require_owner(ctx)?;
        let record = self.load(ctx, uid).await?;
        let permissions = record.permissions.toggle(key, enabled);
        self.write_permissions(ctx, record, permissions).await
    }

    // Toda escrita no registro atualiza também o snapshot da assinatura do dono
    // e o perfil plano do técnico.
    async fn write_permissions(
        &self,
        ctx: &AccessContext,
        mut record: EmployeeRecord,
        permissions: Permissions,
    ) -> Result<TechnicianSummary, AppError> {
        let mut patch = Fields::new();
        patch.insert("permissions".into(), Value::Object(permissions.to_fields()));
        patch.extend(ctx.resolved.subscription_input().to_parent_snapshot());

        self.profiles
            .write_employee(&ctx.scope, &record.uid, patch.clone(), SetMode::Merge)
            .await?;

        record.permissions = permissions;
        record.parent_subscription = ctx.resolved.subscription_input().clone();
        for (key, value) in patch {
            record.raw.insert(key, value);
        }
        self.profiles
            .merge_profile(&record.uid, record.to_profile_fields(ctx.scope.owner_uid()))
            .await?;

        tracing::info!("Permissões de {} atualizadas.", record.uid);
        Ok(TechnicianSummary::from(&record))
    }

    /// Remove registros e credenciais do técnico.
    pub async fn delete(&self, ctx: &AccessContext, uid: &str) -> Result<(), AppError> {
        require_owner(ctx)?;
        self.load(ctx, uid).await?;

        self.profiles.delete_employee(&ctx.scope, uid).await?;
        self.profiles.delete_profile(uid).await?;
        self.auth.delete_account(uid).await?;

        tracing::info!("Técnico {} removido da oficina {}.", uid, ctx.scope.owner_uid());
        Ok(())
    }
}
