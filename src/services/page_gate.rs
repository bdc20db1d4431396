// src/services/page_gate.rs

// Controle de acesso às páginas do painel. O aviso de "sem permissão" sai uma
// única vez por motivo enquanto o técnico continuar sem acesso.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    common::{
        error::page_denied_notice,
        i18n::{Lang, Message},
    },
    models::{
        access::AccessContext,
        permissions::{Page, PageRequirement, PermissionKey, Permissions},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenialKey {
    Permission(PermissionKey),
    AdminOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum DenialReason {
    MissingPermission,
    AdminOnly,
    SubscriptionInactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageDecision {
    pub requested: Page,
    /// Página que deve ser exibida (a pedida, ou o destino do redirecionamento).
    pub page: Page,
    pub allowed: bool,
    pub reason: Option<DenialReason>,
    pub notice: Option<String>,
}

impl PageDecision {
    fn allowed(page: Page) -> Self {
        Self { requested: page, page, allowed: true, reason: None, notice: None }
    }
}

/// Motivos de negação já avisados para um ator.
#[derive(Debug)]
pub struct DenialLedger {
    raised: HashSet<DenialKey>,
    touched: Instant,
}

impl Default for DenialLedger {
    fn default() -> Self {
        Self { raised: HashSet::new(), touched: Instant::now() }
    }
}

impl DenialLedger {
    /// `true` se este motivo ainda não tinha sido avisado.
    pub fn record(&mut self, key: DenialKey) -> bool {
        self.raised.insert(key)
    }

    /// Esquece as negações de permissões que voltaram a ser concedidas.
    pub fn clear_granted(&mut self, permissions: &Permissions) {
        self.raised.retain(|key| match key {
            DenialKey::Permission(permission) => !permissions.get(*permission),
            DenialKey::AdminOnly => true,
        });
    }
}

// Sem uso por mais tempo que isto, o ator já não tem sessão válida.
const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Clone)]
pub struct PageGate {
    ledgers: Arc<Mutex<HashMap<String, DenialLedger>>>,
    idle_ttl: Duration,
}

impl Default for PageGate {
    fn default() -> Self {
        Self::with_idle_ttl(DEFAULT_IDLE_TTL)
    }
}

impl PageGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledgers parados há mais de `idle_ttl` são descartados.
    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self { ledgers: Arc::new(Mutex::new(HashMap::new())), idle_ttl }
    }

    pub fn check(&self, ctx: &AccessContext, requested: Page, lang: Lang) -> PageDecision {
        if !ctx.subscription.allows(requested) {
            return PageDecision {
                requested,
                page: Page::Conta,
                allowed: false,
                reason: Some(DenialReason::SubscriptionInactive),
                notice: Some(Message::SubscriptionInactive.text(lang).to_string()),
            };
        }

        if ctx.is_admin() {
            return PageDecision::allowed(requested);
        }

        self.check_employee(&ctx.identity.uid, &ctx.permissions, requested, lang)
    }

    fn check_employee(
        &self,
        actor_uid: &str,
        permissions: &Permissions,
        requested: Page,
        lang: Lang,
    ) -> PageDecision {
        let (key, reason) = match requested.employee_requirement() {
            PageRequirement::Open => {
                self.with_ledger(actor_uid, |ledger| ledger.clear_granted(permissions));
                return PageDecision::allowed(requested);
            }
            PageRequirement::Permission(permission) if permissions.get(permission) => {
                self.with_ledger(actor_uid, |ledger| ledger.clear_granted(permissions));
                return PageDecision::allowed(requested);
            }
            PageRequirement::Permission(permission) => {
                (DenialKey::Permission(permission), DenialReason::MissingPermission)
            }
            PageRequirement::AdminOnly => (DenialKey::AdminOnly, DenialReason::AdminOnly),
        };

        let first_time = self.with_ledger(actor_uid, |ledger| {
            ledger.clear_granted(permissions);
            ledger.record(key)
        });

        let notice = first_time.then(|| match key {
            DenialKey::Permission(permission) => page_denied_notice(lang, permission),
            DenialKey::AdminOnly => Message::PageRestricted.text(lang).to_string(),
        });
        if first_time {
            tracing::warn!("Técnico {} sem acesso a '{}'; redirecionado ao painel.", actor_uid, requested.as_str());
        }

        PageDecision {
            requested,
            page: Page::DEFAULT,
            allowed: false,
            reason: Some(reason),
            notice,
        }
    }

    fn with_ledger<R>(&self, actor_uid: &str, f: impl FnOnce(&mut DenialLedger) -> R) -> R {
        // Lock envenenado: segue com o estado que ficou.
        let mut ledgers = match self.ledgers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let idle_ttl = self.idle_ttl;
        ledgers.retain(|_, ledger| ledger.touched.elapsed() < idle_ttl);

        let ledger = ledgers.entry(actor_uid.to_string()).or_default();
        ledger.touched = Instant::now();
        f(ledger)
    }

    /// Atores com avisos guardados.
    pub fn tracked(&self) -> usize {
        match self.ledgers.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Esquece tudo sobre um ator (logout).
    pub fn forget(&self, actor_uid: &str) {
        let mut ledgers = match self.ledgers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        ledgers.remove(actor_uid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fields::Fields;
    use crate::models::{
        access::{EmployeeRecord, ResolutionSource, ResolvedIdentity, UserProfile},
        auth::Identity,
        subscription::{SubscriptionInput, SubscriptionState},
    };
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn employee_ctx(permissions: serde_json::Value) -> AccessContext {
        let fields: Fields = json!({ "adminId": "A", "permissions": permissions })
            .as_object()
            .cloned()
            .unwrap();
        let record = EmployeeRecord::from_fields("t1", &fields);
        let resolved = ResolvedIdentity::employee("t1", record, ResolutionSource::DirectProfile);
        AccessContext {
            identity: Identity { uid: "t1".into(), email: "t1@x.com".into(), display_name: None, photo_url: None },
            scope: resolved.scope().unwrap(),
            permissions: resolved.permissions(),
            subscription: SubscriptionState::evaluate(&SubscriptionInput::default(), Utc::now()),
            resolved,
        }
    }

    fn owner_ctx(subscription: SubscriptionInput) -> AccessContext {
        let profile = UserProfile::from_fields("A", &Fields::new());
        let resolved = ResolvedIdentity::owner("A", profile, ResolutionSource::DirectProfile);
        AccessContext {
            identity: Identity { uid: "A".into(), email: "a@x.com".into(), display_name: None, photo_url: None },
            scope: resolved.scope().unwrap(),
            permissions: resolved.permissions(),
            subscription: SubscriptionState::evaluate(&subscription, Utc::now()),
            resolved,
        }
    }

    #[test]
    fn denied_page_redirects_and_warns_once() {
        let gate = PageGate::new();
        let ctx = employee_ctx(json!({ "agenda": true, "financeiro": false }));

        let first = gate.check(&ctx, Page::Financeiro, Lang::Pt);
        assert!(!first.allowed);
        assert_eq!(first.page, Page::Dashboard);
        assert!(first.notice.is_some());

        let second = gate.check(&ctx, Page::Financeiro, Lang::Pt);
        assert_eq!(second.page, Page::Dashboard);
        assert_eq!(second.notice, None);

        // Outro motivo avisa de novo.
        let admin_only = gate.check(&ctx, Page::Estoque, Lang::Pt);
        assert_eq!(admin_only.reason, Some(DenialReason::AdminOnly));
        assert!(admin_only.notice.is_some());
        assert_eq!(gate.check(&ctx, Page::Servicos, Lang::Pt).notice, None);

        assert!(gate.check(&ctx, Page::Agenda, Lang::Pt).allowed);
    }

    #[test]
    fn regranted_permission_warns_again_after_new_denial() {
        let gate = PageGate::new();
        let denied = employee_ctx(json!({ "financeiro": false }));
        let granted = employee_ctx(json!({ "financeiro": true }));

        assert!(gate.check(&denied, Page::Financeiro, Lang::Pt).notice.is_some());
        assert!(gate.check(&granted, Page::Financeiro, Lang::Pt).allowed);
        assert!(gate.check(&denied, Page::Financeiro, Lang::Pt).notice.is_some());
    }

    #[test]
    fn idle_ledgers_expire() {
        let gate = PageGate::with_idle_ttl(std::time::Duration::ZERO);
        let ctx = employee_ctx(json!({ "financeiro": false }));

        assert!(gate.check(&ctx, Page::Financeiro, Lang::Pt).notice.is_some());
        // Expirado: o aviso volta e o mapa não cresce.
        assert!(gate.check(&ctx, Page::Financeiro, Lang::Pt).notice.is_some());
        assert_eq!(gate.tracked(), 1);

        gate.forget("t1");
        assert_eq!(gate.tracked(), 0);
    }

    #[test]
    fn admin_sees_every_page() {
        let gate = PageGate::new();
        let ctx = owner_ctx(SubscriptionInput::default());
        for page in ["estoque", "financeiro", "configuracoes", "orcamentos"] {
            assert!(gate.check(&ctx, Page::parse(page).unwrap(), Lang::Pt).allowed);
        }
    }

    #[test]
    fn inactive_subscription_blocks_all_but_account_and_settings() {
        let gate = PageGate::new();
        let expired = SubscriptionInput {
            status: Some("trialing".into()),
            plan: Some("trial".into()),
            trial_ends_at: Some(Utc::now() - Duration::days(1)),
        };
        let ctx = owner_ctx(expired);

        let blocked = gate.check(&ctx, Page::Agenda, Lang::Pt);
        assert_eq!(blocked.reason, Some(DenialReason::SubscriptionInactive));
        assert!(gate.check(&ctx, Page::Conta, Lang::Pt).allowed);
        assert!(gate.check(&ctx, Page::Configuracoes, Lang::Pt).allowed);
    }
}
