// src/models/dashboard.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    // Campos financeiros ficam `None` para técnico sem `financeiro`.
    #[schema(value_type = Option<f64>)]
    pub revenue_today: Option<Decimal>,
    pub appointments_today: usize,
    pub new_clients_month: usize,
    #[schema(value_type = Option<f64>)]
    pub pending_commissions: Option<Decimal>,
    pub weekly_revenue: Option<Vec<DailyRevenue>>,
    pub upcoming_appointments: Vec<UpcomingAppointment>,
    pub technician_ranking: Option<Vec<TechnicianRank>>,
    pub vehicles_in_yard: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyRevenue {
    #[schema(example = "07/03")]
    pub label: String,
    pub date: NaiveDate,
    #[schema(value_type = f64)]
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingAppointment {
    pub id: String,
    pub client_name: String,
    pub date: DateTime<Utc>,
    pub services: Vec<String>,
    pub vehicle_plate: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TechnicianRank {
    pub id: String,
    pub name: String,
    #[schema(value_type = f64)]
    pub total: Decimal,
    pub orders: usize,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DashboardQuery {
    /// Filtra os indicadores por técnico (ignorado para técnicos, que só veem a si mesmos).
    pub professional_id: Option<String>,
}
