// src/models/access.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::common::fields::{bool_field, str_field, Fields};
use crate::models::auth::Identity;
use crate::models::permissions::{NavItem, Permissions};
use crate::models::scope::TenantScope;
use crate::models::subscription::{SubscriptionInput, SubscriptionState};

/// Campo sensível que só existe no registro do técnico dentro do dono.
pub const INITIAL_PASSWORD_FIELD: &str = "initialPassword";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Employee,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
        }
    }

    /// Só "employee" é técnico; qualquer outro valor (ou ausência) é dono.
    pub fn from_stored(raw: Option<&str>) -> Self {
        match raw {
            Some("employee") => Role::Employee,
            _ => Role::Admin,
        }
    }
}

// ---
// Perfil do dono (users/{uid})
// ---
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub uid: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub subscription: SubscriptionInput,
    pub raw: Fields,
}

impl UserProfile {
    pub fn from_fields(uid: &str, fields: &Fields) -> Self {
        Self {
            uid: str_field(fields, "uid").unwrap_or_else(|| uid.to_string()),
            full_name: str_field(fields, "fullName"),
            email: str_field(fields, "email"),
            subscription: SubscriptionInput::from_owner_fields(fields),
            raw: fields.clone(),
        }
    }
}

// ---
// Registro do técnico (users/{adminId}/employees/{uid}, espelhado em users/{uid})
// ---
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeRecord {
    pub uid: String,
    pub admin_id: Option<String>,
    pub permissions: Permissions,
    pub must_change_password: bool,
    pub name: Option<String>,
    pub email: Option<String>,
    pub parent_subscription: SubscriptionInput,
    /// Profissional (coleção `professionals`) que representa o técnico nas
    /// ordens e lançamentos.
    pub professional_id: Option<String>,
    pub raw: Fields,
}

impl EmployeeRecord {
    pub fn from_fields(uid: &str, fields: &Fields) -> Self {
        let permissions = fields
            .get("permissions")
            .map(Permissions::from_value)
            .unwrap_or_default();
        Self {
            uid: str_field(fields, "uid").unwrap_or_else(|| uid.to_string()),
            admin_id: str_field(fields, "adminId"),
            permissions,
            must_change_password: bool_field(fields, "mustChangePassword"),
            name: str_field(fields, "name").or_else(|| str_field(fields, "fullName")),
            email: str_field(fields, "email"),
            parent_subscription: SubscriptionInput::from_parent_snapshot(fields),
            professional_id: str_field(fields, "professionalId"),
            raw: fields.clone(),
        }
    }

    /// Perfil plano normalizado para gravar em users/{uid}: mantém os dados do
    /// registro, remove a senha inicial e força papel, dono e permissões no
    /// formato canônico.
    pub fn to_profile_fields(&self, admin_id: &str) -> Fields {
        let mut fields = self.raw.clone();
        fields.remove(INITIAL_PASSWORD_FIELD);
        fields.insert("uid".into(), Value::String(self.uid.clone()));
        fields.insert("role".into(), Value::String(Role::Employee.as_str().into()));
        fields.insert("adminId".into(), Value::String(admin_id.to_string()));
        fields.insert("permissions".into(), Value::Object(self.permissions.to_fields()));
        fields.insert("mustChangePassword".into(), Value::Bool(self.must_change_password));
        fields
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActorRecord {
    Owner(UserProfile),
    Employee(EmployeeRecord),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionSource {
    DirectProfile,
    LegacyEmployee,
    EmployeeSearch,
}

/// Resultado da resolução de papel para uma identidade autenticada.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIdentity {
    pub uid: String,
    pub record: ActorRecord,
    pub source: ResolutionSource,
}

impl ResolvedIdentity {
    pub fn owner(uid: &str, profile: UserProfile, source: ResolutionSource) -> Self {
        Self { uid: uid.to_string(), record: ActorRecord::Owner(profile), source }
    }

    pub fn employee(uid: &str, record: EmployeeRecord, source: ResolutionSource) -> Self {
        Self { uid: uid.to_string(), record: ActorRecord::Employee(record), source }
    }

    pub fn role(&self) -> Role {
        match self.record {
            ActorRecord::Owner(_) => Role::Admin,
            ActorRecord::Employee(_) => Role::Employee,
        }
    }

    pub fn employee_record(&self) -> Option<&EmployeeRecord> {
        match &self.record {
            ActorRecord::Employee(record) => Some(record),
            ActorRecord::Owner(_) => None,
        }
    }

    pub fn scope(&self) -> Option<TenantScope> {
        TenantScope::for_identity(&self.uid, self.employee_record())
    }

    pub fn owner_uid(&self) -> Option<String> {
        self.scope().map(|scope| scope.owner_uid().to_string())
    }

    /// O dono tem tudo; o técnico tem o que está no registro.
    pub fn permissions(&self) -> Permissions {
        match &self.record {
            ActorRecord::Owner(_) => Permissions::all(),
            ActorRecord::Employee(record) => record.permissions,
        }
    }

    /// Técnicos herdam o snapshot da assinatura do dono gravado no próprio registro.
    pub fn subscription_input(&self) -> &SubscriptionInput {
        match &self.record {
            ActorRecord::Owner(profile) => &profile.subscription,
            ActorRecord::Employee(record) => &record.parent_subscription,
        }
    }

    pub fn professional_id(&self) -> Option<&str> {
        self.employee_record().and_then(|record| record.professional_id.as_deref())
    }

    pub fn must_change_password(&self) -> bool {
        self.employee_record()
            .map(|record| record.must_change_password)
            .unwrap_or(false)
    }
}

/// Tudo que as rotas escopadas precisam saber sobre quem está chamando.
/// Montado pelo `access_guard` depois que a resolução terminou.
#[derive(Debug, Clone)]
pub struct AccessContext {
    pub identity: Identity,
    pub resolved: ResolvedIdentity,
    pub scope: TenantScope,
    pub permissions: Permissions,
    pub subscription: SubscriptionState,
}

impl AccessContext {
    pub fn role(&self) -> Role {
        self.resolved.role()
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }
}

/// Visão da sessão devolvida ao frontend após o login.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub owner_uid: String,
    pub resolved_via: ResolutionSource,
    pub permissions: Permissions,
    pub navigation: Vec<NavItem>,
    pub subscription: SubscriptionState,
    pub must_change_password: bool,
    pub resolved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn unknown_roles_are_treated_as_owner() {
        assert_eq!(Role::from_stored(Some("employee")), Role::Employee);
        assert_eq!(Role::from_stored(Some("admin")), Role::Admin);
        assert_eq!(Role::from_stored(Some("gerente")), Role::Admin);
        assert_eq!(Role::from_stored(None), Role::Admin);
    }

    #[test]
    fn profile_backfill_drops_initial_password() {
        let record = EmployeeRecord::from_fields(
            "t1",
            &fields(json!({
                "uid": "t1",
                "name": "Carlos",
                "initialPassword": "123456",
                "permissions": { "agenda": 1, "patio_edit": true },
                "mustChangePassword": true
            })),
        );
        let profile = record.to_profile_fields("B");

        assert!(!profile.contains_key(INITIAL_PASSWORD_FIELD));
        assert_eq!(profile.get("adminId"), Some(&json!("B")));
        assert_eq!(profile.get("role"), Some(&json!("employee")));
        assert_eq!(profile.get("name"), Some(&json!("Carlos")));
        assert_eq!(
            profile.get("permissions"),
            Some(&json!({
                "agenda": true,
                "clientes": false,
                "patio": false,
                "patio_edit": true,
                "financeiro": false
            }))
        );
    }

    #[test]
    fn employee_scope_uses_admin_id() {
        let record = EmployeeRecord::from_fields("t1", &fields(json!({ "adminId": "A" })));
        let resolved = ResolvedIdentity::employee("t1", record, ResolutionSource::DirectProfile);
        assert_eq!(resolved.owner_uid().as_deref(), Some("A"));
    }

    #[test]
    fn employee_without_admin_id_has_no_scope() {
        let record = EmployeeRecord::from_fields("t1", &fields(json!({ "role": "employee" })));
        let resolved = ResolvedIdentity::employee("t1", record, ResolutionSource::DirectProfile);
        assert_eq!(resolved.owner_uid(), None);
    }
}
