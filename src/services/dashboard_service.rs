// src/services/dashboard_service.rs

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    db::store::DocumentStore,
    models::{
        access::AccessContext,
        dashboard::{DailyRevenue, DashboardStats, TechnicianRank, UpcomingAppointment},
        permissions::PermissionKey,
        records::{Appointment, Client, TenantCollection, Transaction, YardVehicle},
    },
    services::record_service::ensure_any,
};

const UPCOMING_LIMIT: usize = 5;
const RANKING_LIMIT: usize = 5;
const TEAM_KEY: &str = "equipe";
const TEAM_NAME: &str = "Equipe da oficina";

/// Dados brutos já filtrados para o painel.
#[derive(Debug, Default)]
pub struct DashboardData {
    pub transactions: Vec<Transaction>,
    pub appointments: Vec<Appointment>,
    pub clients: Vec<Client>,
    pub yard: Vec<YardVehicle>,
}

impl DashboardData {
    /// Mantém só o que pertence ao técnico informado (clientes não têm dono).
    pub fn for_professional(mut self, professional_id: &str) -> Self {
        self.transactions.retain(|t| t.professional_id == professional_id);
        self.appointments.retain(|a| a.professional_id == professional_id);
        self.yard.retain(|v| v.professional_id == professional_id);
        self
    }
}

fn local_date(at: DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    at.with_timezone(offset).date_naive()
}

/// Agregados do painel no fuso da oficina.
pub fn compute_stats(data: &DashboardData, now: DateTime<Utc>, offset: FixedOffset) -> DashboardStats {
    let today = local_date(now, &offset);
    let revenue: Vec<&Transaction> = data.transactions.iter().filter(|t| t.is_revenue()).collect();

    let revenue_today: Decimal = revenue
        .iter()
        .filter(|t| t.date.map(|d| local_date(d, &offset)) == Some(today))
        .map(|t| t.total_amount)
        .sum();

    let appointments_today = data
        .appointments
        .iter()
        .filter(|a| a.date.map(|d| local_date(d, &offset)) == Some(today))
        .count();

    let new_clients_month = data
        .clients
        .iter()
        .filter_map(|c| c.created_at.map(|d| local_date(d, &offset)))
        .filter(|d| d.year() == today.year() && d.month() == today.month())
        .count();

    let pending_commissions: Decimal = revenue.iter().map(|t| t.commission).sum();

    let mut per_day: HashMap<NaiveDate, Decimal> = HashMap::new();
    for t in &revenue {
        if let Some(date) = t.date {
            *per_day.entry(local_date(date, &offset)).or_default() += t.total_amount;
        }
    }
    let weekly_revenue = (0..7)
        .rev()
        .map(|back| {
            let day = today - Duration::days(back);
            DailyRevenue {
                label: day.format("%d/%m").to_string(),
                date: day,
                revenue: per_day.get(&day).copied().unwrap_or_default(),
            }
        })
        .collect();

    // Desde a meia-noite local de hoje.
    let start_of_today = today
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| offset.from_local_datetime(&midnight).single())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or(now);
    let mut upcoming: Vec<(DateTime<Utc>, &Appointment)> = data
        .appointments
        .iter()
        .filter_map(|a| a.date.map(|d| (d, a)))
        .filter(|(d, _)| *d >= start_of_today)
        .collect();
    upcoming.sort_by_key(|(d, _)| *d);
    let upcoming_appointments = upcoming
        .into_iter()
        .take(UPCOMING_LIMIT)
        .map(|(date, a)| UpcomingAppointment {
            id: a.id.clone(),
            client_name: a.client_name.clone(),
            date,
            services: a.service_names.clone(),
            vehicle_plate: a.vehicle_plate.clone(),
        })
        .collect();

    let mut ranking: Vec<TechnicianRank> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for t in &revenue {
        let key = [&t.professional_id, &t.professional_name]
            .into_iter()
            .find(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(|| TEAM_KEY.to_string());
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            ranking.push(TechnicianRank {
                id: if t.professional_id.is_empty() { key.clone() } else { t.professional_id.clone() },
                name: if t.professional_name.is_empty() {
                    TEAM_NAME.to_string()
                } else {
                    t.professional_name.clone()
                },
                total: Decimal::ZERO,
                orders: 0,
            });
            ranking.len() - 1
        });
        ranking[slot].total += t.total_amount;
        ranking[slot].orders += 1;
    }
    // Estável: empates mantêm a ordem de chegada.
    ranking.sort_by(|a, b| b.total.cmp(&a.total));
    ranking.truncate(RANKING_LIMIT);

    DashboardStats {
        revenue_today: Some(revenue_today),
        appointments_today,
        new_clients_month,
        pending_commissions: Some(pending_commissions),
        weekly_revenue: Some(weekly_revenue),
        upcoming_appointments,
        technician_ranking: Some(ranking),
        vehicles_in_yard: data.yard.iter().filter(|v| v.in_yard()).count(),
    }
}

/// Esconde os números financeiros.
pub fn redact_financials(mut stats: DashboardStats) -> DashboardStats {
    stats.revenue_today = None;
    stats.pending_commissions = None;
    stats.weekly_revenue = None;
    stats.technician_ranking = None;
    stats
}

#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn DocumentStore>,
    offset: FixedOffset,
}

impl DashboardService {
    pub fn new(store: Arc<dyn DocumentStore>, utc_offset_hours: i32) -> Self {
        let offset = match FixedOffset::east_opt(utc_offset_hours * 3600) {
            Some(offset) => offset,
            None => {
                tracing::warn!("Fuso UTC{:+} inválido; usando UTC.", utc_offset_hours);
                Utc.fix()
            }
        };
        Self { store, offset }
    }

    async fn load_readable(
        &self,
        ctx: &AccessContext,
        collection: TenantCollection,
    ) -> Result<Vec<crate::db::store::Document>, AppError> {
        if ensure_any(ctx, collection.rule().read_any).is_err() {
            return Ok(Vec::new());
        }
        Ok(self.store.list(&ctx.scope.collection(collection)).await?)
    }

    pub async fn stats(
        &self,
        ctx: &AccessContext,
        professional_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<DashboardStats, AppError> {
        let data = DashboardData {
            transactions: self
                .load_readable(ctx, TenantCollection::Transactions)
                .await?
                .iter()
                .map(Transaction::from_document)
                .collect(),
            appointments: self
                .load_readable(ctx, TenantCollection::Appointments)
                .await?
                .iter()
                .map(Appointment::from_document)
                .collect(),
            clients: self
                .load_readable(ctx, TenantCollection::Clients)
                .await?
                .iter()
                .map(Client::from_document)
                .collect(),
            yard: self
                .load_readable(ctx, TenantCollection::Yard)
                .await?
                .iter()
                .map(YardVehicle::from_document)
                .collect(),
        };

        // Técnico sempre vê só os próprios números: os do profissional ligado a
        // ele ou, sem vínculo, os lançados com o próprio uid.
        let filter = if ctx.is_admin() {
            professional_id
        } else {
            Some(ctx.resolved.professional_id().unwrap_or(ctx.identity.uid.as_str()))
        };
        let data = match filter.filter(|id| !id.is_empty()) {
            Some(id) => data.for_professional(id),
            None => data,
        };

        let stats = compute_stats(&data, now, self.offset);
        if ctx.is_admin() || ctx.permissions.get(PermissionKey::Financeiro) {
            Ok(stats)
        } else {
            Ok(redact_financials(stats))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn offset() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).unwrap()
    }

    fn tx(id: &str, amount: i64, at: DateTime<Utc>, professional: &str) -> Transaction {
        Transaction {
            id: id.into(),
            kind: "receita".into(),
            total_amount: Decimal::from(amount),
            commission: Decimal::from(amount / 10),
            date: Some(at),
            professional_id: professional.into(),
            professional_name: String::new(),
        }
    }

    #[test]
    fn revenue_is_bucketed_in_business_time() {
        // 10/03 01:00 UTC ainda é 09/03 no fuso -3.
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap();
        let data = DashboardData {
            transactions: vec![
                tx("a", 100, Utc.with_ymd_and_hms(2025, 3, 10, 13, 0, 0).unwrap(), "p1"),
                tx("b", 50, Utc.with_ymd_and_hms(2025, 3, 10, 1, 0, 0).unwrap(), "p2"),
            ],
            ..Default::default()
        };

        let stats = compute_stats(&data, now, offset());
        assert_eq!(stats.revenue_today, Some(Decimal::from(100)));
        assert_eq!(stats.pending_commissions, Some(Decimal::from(15)));

        let week = stats.weekly_revenue.unwrap();
        assert_eq!(week.len(), 7);
        assert_eq!(week[6].label, "10/03");
        assert_eq!(week[5].label, "09/03");
        assert_eq!(week[5].revenue, Decimal::from(50));
    }

    #[test]
    fn ranking_groups_by_professional_and_falls_back_to_team() {
        let now = Utc::now();
        let data = DashboardData {
            transactions: vec![tx("a", 10, now, "p1"), tx("b", 30, now, ""), tx("c", 15, now, "p1")],
            ..Default::default()
        };
        let ranking = compute_stats(&data, now, offset()).technician_ranking.unwrap();
        assert_eq!(ranking[0].id, "equipe");
        assert_eq!(ranking[0].name, "Equipe da oficina");
        assert_eq!(ranking[1].id, "p1");
        assert_eq!(ranking[1].orders, 2);
        assert_eq!(ranking[1].total, Decimal::from(25));
    }

    #[test]
    fn redaction_hides_money_only() {
        let now = Utc::now();
        let data = DashboardData {
            yard: vec![
                YardVehicle { id: "v1".into(), exit_time: None, professional_id: String::new() },
                YardVehicle { id: "v2".into(), exit_time: Some("2025-01-01T10:00".into()), professional_id: String::new() },
            ],
            ..Default::default()
        };
        let stats = redact_financials(compute_stats(&data, now, offset()));
        assert_eq!(stats.revenue_today, None);
        assert_eq!(stats.technician_ranking, None);
        assert_eq!(stats.vehicles_in_yard, 1);
    }

    #[tokio::test]
    async fn linked_technician_sees_only_own_orders() {
        use crate::common::fields::{timestamp_value, Fields};
        use crate::db::{store::SetMode, MemoryDocumentStore};
        use crate::models::{
            access::{EmployeeRecord, ResolutionSource, ResolvedIdentity},
            auth::Identity,
            subscription::SubscriptionState,
        };
        use serde_json::json;

        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let record: Fields = json!({
            "adminId": "A",
            "professionalId": "p1",
            "permissions": { "agenda": true, "financeiro": true }
        })
        .as_object()
        .cloned()
        .unwrap();
        let resolved = ResolvedIdentity::employee(
            "t1",
            EmployeeRecord::from_fields("t1", &record),
            ResolutionSource::DirectProfile,
        );
        let ctx = AccessContext {
            identity: Identity { uid: "t1".into(), email: "t1@x.com".into(), display_name: None, photo_url: None },
            scope: resolved.scope().unwrap(),
            permissions: resolved.permissions(),
            subscription: SubscriptionState::evaluate(resolved.subscription_input(), Utc::now()),
            resolved,
        };

        let now = Utc::now();
        for (id, amount, professional) in [("a", 100, "p1"), ("b", 50, "p2"), ("c", 30, "p1")] {
            let mut doc: Fields = json!({ "type": "receita", "totalAmount": amount, "professionalId": professional })
                .as_object()
                .cloned()
                .unwrap();
            doc.insert("date".into(), timestamp_value(now));
            store
                .set(&ctx.scope.record(TenantCollection::Transactions, id), doc, SetMode::Replace)
                .await
                .unwrap();
        }

        let service = DashboardService::new(store, -3);
        // O filtro pedido é ignorado para técnicos.
        let stats = service.stats(&ctx, Some("p2"), now).await.unwrap();
        assert_eq!(stats.revenue_today, Some(Decimal::from(130)));
        let ranking = stats.technician_ranking.unwrap();
        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking[0].id, "p1");
        assert_eq!(ranking[0].orders, 2);
    }
}
