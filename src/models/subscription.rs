// src/models/subscription.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::common::fields::{str_field, timestamp_field, Fields};
use crate::models::permissions::Page;

pub const DEFAULT_STATUS: &str = "active";
pub const DEFAULT_PLAN: &str = "starter";

const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Campos de cobrança como estão gravados (no perfil do dono, ou copiados
/// para o registro do técnico com prefixo `parent`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionInput {
    pub status: Option<String>,
    pub plan: Option<String>,
    pub trial_ends_at: Option<DateTime<Utc>>,
}

impl SubscriptionInput {
    pub fn from_owner_fields(fields: &Fields) -> Self {
        Self {
            status: str_field(fields, "subscriptionStatus"),
            plan: str_field(fields, "subscriptionPlan"),
            trial_ends_at: timestamp_field(fields, "trialEndsAt"),
        }
    }

    pub fn from_parent_snapshot(fields: &Fields) -> Self {
        Self {
            status: str_field(fields, "parentSubscriptionStatus"),
            plan: str_field(fields, "parentSubscriptionPlan"),
            trial_ends_at: timestamp_field(fields, "parentTrialEndsAt"),
        }
    }

    /// Cópia pontual para gravar no registro do técnico.
    pub fn to_parent_snapshot(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert(
            "parentSubscriptionStatus".into(),
            self.status.clone().unwrap_or_else(|| DEFAULT_STATUS.into()).into(),
        );
        fields.insert(
            "parentSubscriptionPlan".into(),
            self.plan.clone().unwrap_or_else(|| DEFAULT_PLAN.into()).into(),
        );
        fields.insert(
            "parentTrialEndsAt".into(),
            self.trial_ends_at
                .map(|at| at.to_rfc3339().into())
                .unwrap_or(serde_json::Value::Null),
        );
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionState {
    pub status: String,
    pub plan: String,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub is_trialing: bool,
    pub is_active: bool,
    pub trial_days_left: Option<i64>,
}

impl SubscriptionState {
    pub fn evaluate(input: &SubscriptionInput, now: DateTime<Utc>) -> Self {
        let status = input.status.clone().unwrap_or_else(|| DEFAULT_STATUS.to_string());
        let plan = input.plan.clone().unwrap_or_else(|| DEFAULT_PLAN.to_string());

        let is_trialing = status == "trialing"
            && input.trial_ends_at.map(|ends| ends > now).unwrap_or(true);
        let is_active = status == "active" || is_trialing;

        let trial_days_left = if is_trialing {
            input.trial_ends_at.map(|ends| {
                let remaining = (ends - now).num_milliseconds();
                // Teto da divisão; `remaining` é positivo aqui.
                ((remaining + DAY_MILLIS - 1) / DAY_MILLIS).max(0)
            })
        } else {
            None
        };

        Self {
            status,
            plan,
            trial_ends_at: input.trial_ends_at,
            is_trialing,
            is_active,
            trial_days_left,
        }
    }

    pub fn allows(&self, page: Page) -> bool {
        self.is_active || page.exempt_from_subscription()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn trialing(ends: Option<DateTime<Utc>>) -> SubscriptionInput {
        SubscriptionInput { status: Some("trialing".into()), plan: Some("trial".into()), trial_ends_at: ends }
    }

    #[test]
    fn missing_fields_default_to_active_starter() {
        let state = SubscriptionState::evaluate(&SubscriptionInput::default(), Utc::now());
        assert_eq!(state.status, "active");
        assert_eq!(state.plan, "starter");
        assert!(state.is_active);
        assert!(!state.is_trialing);
        assert_eq!(state.trial_days_left, None);
    }

    #[test]
    fn trial_with_days_remaining_is_active() {
        let now = Utc::now();
        let state = SubscriptionState::evaluate(&trialing(Some(now + Duration::days(3))), now);
        assert!(state.is_active);
        assert!(state.is_trialing);
        assert_eq!(state.trial_days_left, Some(3));
    }

    #[test]
    fn partial_days_round_up() {
        let now = Utc::now();
        let state = SubscriptionState::evaluate(&trialing(Some(now + Duration::hours(30))), now);
        assert_eq!(state.trial_days_left, Some(2));
    }

    #[test]
    fn expired_trial_is_inactive() {
        let now = Utc::now();
        let state = SubscriptionState::evaluate(&trialing(Some(now - Duration::days(1))), now);
        assert!(!state.is_active);
        assert!(!state.is_trialing);
        assert_eq!(state.trial_days_left, None);
    }

    #[test]
    fn open_ended_trial_stays_active() {
        let state = SubscriptionState::evaluate(&trialing(None), Utc::now());
        assert!(state.is_active);
        assert_eq!(state.trial_days_left, None);
    }

    #[test]
    fn inactive_subscription_still_opens_account_and_settings() {
        let input = SubscriptionInput { status: Some("canceled".into()), ..Default::default() };
        let state = SubscriptionState::evaluate(&input, Utc::now());
        assert!(!state.allows(Page::Agenda));
        assert!(state.allows(Page::Conta));
        assert!(state.allows(Page::Configuracoes));
    }

    #[test]
    fn parent_snapshot_round_trips() {
        let now = Utc::now();
        let owner = trialing(Some(now + Duration::days(5)));
        let snapshot = owner.to_parent_snapshot();
        let restored = SubscriptionInput::from_parent_snapshot(&snapshot);
        assert_eq!(restored.status, owner.status);
        assert_eq!(restored.plan, owner.plan);
        assert_eq!(
            restored.trial_ends_at.map(|t| t.timestamp()),
            owner.trial_ends_at.map(|t| t.timestamp())
        );
    }
}
