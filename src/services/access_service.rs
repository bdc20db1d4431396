// src/services/access_service.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    common::error::AppError,
    db::{store::StoreError, ProfileRepository},
    models::{
        access::{
            AccessContext, EmployeeRecord, ResolutionSource, ResolvedIdentity, Role, SessionView,
            UserProfile,
        },
        auth::Identity,
        permissions::navigation_for,
        scope::owner_from_employee_path,
        subscription::SubscriptionState,
    },
};

// ---
// Estratégias de resolução de papel
// ---

/// Uma forma de descobrir quem é o usuário. `Ok(None)` = não encontrou aqui,
/// tenta a próxima.
#[async_trait]
pub trait ResolverStrategy: Send + Sync {
    fn source(&self) -> ResolutionSource;

    async fn resolve(&self, uid: &str) -> Result<Option<ResolvedIdentity>, StoreError>;
}

/// 1. Perfil plano em users/{uid}.
pub struct DirectProfile {
    profiles: ProfileRepository,
}

#[async_trait]
impl ResolverStrategy for DirectProfile {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::DirectProfile
    }

    async fn resolve(&self, uid: &str) -> Result<Option<ResolvedIdentity>, StoreError> {
        let Some(doc) = self.profiles.get_profile(uid).await? else {
            return Ok(None);
        };
        let role = Role::from_stored(doc.data.get("role").and_then(|v| v.as_str()));
        let resolved = match role {
            Role::Employee => ResolvedIdentity::employee(
                uid,
                EmployeeRecord::from_fields(uid, &doc.data),
                self.source(),
            ),
            Role::Admin => {
                ResolvedIdentity::owner(uid, UserProfile::from_fields(uid, &doc.data), self.source())
            }
        };
        Ok(Some(resolved))
    }
}

/// 2. Registro antigo em employees/{uid}.
pub struct LegacyEmployee {
    profiles: ProfileRepository,
}

#[async_trait]
impl ResolverStrategy for LegacyEmployee {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::LegacyEmployee
    }

    async fn resolve(&self, uid: &str) -> Result<Option<ResolvedIdentity>, StoreError> {
        Ok(self.profiles.get_legacy_employee(uid).await?.map(|doc| {
            ResolvedIdentity::employee(uid, EmployeeRecord::from_fields(uid, &doc.data), self.source())
        }))
    }
}

/// 3. Busca em todas as sub-coleções `employees`. Ao achar, grava o perfil
/// plano para que o próximo login resolva pela estratégia 1.
pub struct EmployeeSearch {
    profiles: ProfileRepository,
}

#[async_trait]
impl ResolverStrategy for EmployeeSearch {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::EmployeeSearch
    }

    async fn resolve(&self, uid: &str) -> Result<Option<ResolvedIdentity>, StoreError> {
        let matches = self.profiles.search_employee_records(uid).await?;

        let Some((owner, doc)) = matches
            .iter()
            .find_map(|doc| owner_from_employee_path(&doc.path).map(|owner| (owner, doc)))
        else {
            return Ok(None);
        };

        let mut record = EmployeeRecord::from_fields(uid, &doc.data);
        // O dono vem do caminho do registro.
        record.admin_id = Some(owner.clone());

        if let Err(e) = self
            .profiles
            .merge_profile(uid, record.to_profile_fields(&owner))
            .await
        {
            tracing::warn!("⚠️ Não foi possível gravar o perfil de {} encontrado em {}: {}", uid, doc.path, e);
        }

        Ok(Some(ResolvedIdentity::employee(uid, record, self.source())))
    }
}

// ---
// O resolvedor: primeira estratégia que encontrar vence
// ---

pub struct RoleResolver {
    strategies: Vec<Box<dyn ResolverStrategy>>,
}

impl RoleResolver {
    pub fn new(strategies: Vec<Box<dyn ResolverStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn standard(profiles: ProfileRepository) -> Self {
        Self::new(vec![
            Box::new(DirectProfile { profiles: profiles.clone() }),
            Box::new(LegacyEmployee { profiles: profiles.clone() }),
            Box::new(EmployeeSearch { profiles }),
        ])
    }

    /// Negação de permissão e "não encontrado" caem para a próxima estratégia;
    /// qualquer outra falha do store interrompe a resolução.
    pub async fn resolve(&self, uid: &str) -> Result<Option<ResolvedIdentity>, AppError> {
        for strategy in &self.strategies {
            match strategy.resolve(uid).await {
                Ok(Some(found)) => return Ok(Some(found)),
                Ok(None) => continue,
                Err(e) if e.is_recoverable_lookup() => {
                    tracing::warn!("Resolução de {} via {:?} ignorada: {}", uid, strategy.source(), e);
                    continue;
                }
                Err(e) => {
                    tracing::error!("🔥 Falha ao resolver o perfil de {}: {}", uid, e);
                    return Err(e.into());
                }
            }
        }
        Ok(None)
    }
}

// ---
// Serviço usado pelo middleware de acesso
// ---

#[derive(Clone)]
pub struct AccessService {
    resolver: std::sync::Arc<RoleResolver>,
}

impl AccessService {
    pub fn new(resolver: RoleResolver) -> Self {
        Self { resolver: std::sync::Arc::new(resolver) }
    }

    /// Resolve papel, escopo, permissões e assinatura da identidade. Nada
    /// escopado por dono pode rodar antes disto terminar.
    pub async fn build_context(
        &self,
        identity: Identity,
        now: DateTime<Utc>,
    ) -> Result<AccessContext, AppError> {
        let resolved = self
            .resolver
            .resolve(&identity.uid)
            .await?
            .ok_or(AppError::ProfileNotResolved)?;

        let scope = resolved.scope().ok_or(AppError::ScopeUnavailable)?;
        let permissions = resolved.permissions();
        let subscription = SubscriptionState::evaluate(resolved.subscription_input(), now);

        Ok(AccessContext { identity, resolved, scope, permissions, subscription })
    }

    pub fn session_view(ctx: &AccessContext, now: DateTime<Utc>) -> SessionView {
        SessionView {
            uid: ctx.identity.uid.clone(),
            email: ctx.identity.email.clone(),
            display_name: ctx.identity.display_name.clone(),
            role: ctx.role(),
            owner_uid: ctx.scope.owner_uid().to_string(),
            resolved_via: ctx.resolved.source,
            permissions: ctx.permissions,
            navigation: navigation_for(ctx.role(), &ctx.permissions),
            subscription: ctx.subscription.clone(),
            must_change_password: ctx.resolved.must_change_password(),
            resolved_at: now,
        }
    }
}
