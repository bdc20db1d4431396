// src/models/records.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::common::fields::{decimal_field, str_field, string_or_empty, timestamp_field};
use crate::db::store::Document;
use crate::models::permissions::PermissionKey;

// ---
// Coleções de negócio de uma oficina
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TenantCollection {
    Clients,
    Professionals,
    Services,
    Appointments,
    Transactions,
    Budgets,
    Yard,
    Stock,
}

/// Quem pode ler/escrever uma coleção sendo técnico. Lista vazia = só o dono.
/// Para leitura basta uma das permissões listadas.
#[derive(Debug, Clone, Copy)]
pub struct CollectionRule {
    pub read_any: &'static [PermissionKey],
    pub write_any: &'static [PermissionKey],
}

impl TenantCollection {
    pub const ALL: [TenantCollection; 8] = [
        TenantCollection::Clients,
        TenantCollection::Professionals,
        TenantCollection::Services,
        TenantCollection::Appointments,
        TenantCollection::Transactions,
        TenantCollection::Budgets,
        TenantCollection::Yard,
        TenantCollection::Stock,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            TenantCollection::Clients => "clients",
            TenantCollection::Professionals => "professionals",
            TenantCollection::Services => "services",
            TenantCollection::Appointments => "appointments",
            TenantCollection::Transactions => "transactions",
            TenantCollection::Budgets => "budgets",
            TenantCollection::Yard => "yard",
            TenantCollection::Stock => "stock",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == raw)
    }

    pub const fn rule(self) -> CollectionRule {
        use PermissionKey::*;
        match self {
            TenantCollection::Clients => CollectionRule { read_any: &[Clientes, Agenda, Patio], write_any: &[Clientes] },
            TenantCollection::Professionals => CollectionRule { read_any: &[Agenda, Patio], write_any: &[] },
            TenantCollection::Services => CollectionRule { read_any: &[Agenda], write_any: &[] },
            TenantCollection::Appointments => CollectionRule { read_any: &[Agenda], write_any: &[Agenda] },
            TenantCollection::Transactions => CollectionRule { read_any: &[Financeiro], write_any: &[Financeiro] },
            TenantCollection::Yard => CollectionRule { read_any: &[Patio], write_any: &[PatioEdit] },
            TenantCollection::Budgets | TenantCollection::Stock => CollectionRule { read_any: &[], write_any: &[] },
        }
    }

    /// Coleção antiga (global, pré multi-tenant) que alimenta esta, se houver.
    pub const fn legacy_source(self) -> Option<&'static str> {
        match self {
            TenantCollection::Clients => Some("demo_clients"),
            TenantCollection::Professionals => Some("demo_professionals"),
            TenantCollection::Services => Some("demo_services"),
            TenantCollection::Appointments => Some("demo_appointments"),
            TenantCollection::Transactions => Some("demo_transactions"),
            TenantCollection::Yard => Some("demo_yard"),
            TenantCollection::Budgets | TenantCollection::Stock => None,
        }
    }
}

// ---
// Visões tipadas usadas pelos agregados do painel
// ---

pub const REVENUE: &str = "receita";

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub kind: String,
    pub total_amount: Decimal,
    pub commission: Decimal,
    pub date: Option<DateTime<Utc>>,
    pub professional_id: String,
    pub professional_name: String,
}

impl Transaction {
    pub fn from_document(doc: &Document) -> Self {
        let data = &doc.data;
        // Registros antigos só tinham `amount`.
        let total_amount = decimal_field(data, "totalAmount")
            .or_else(|| decimal_field(data, "amount"))
            .unwrap_or_default();
        Self {
            id: doc.id().to_string(),
            kind: str_field(data, "type").unwrap_or_else(|| REVENUE.to_string()),
            total_amount,
            commission: decimal_field(data, "commission").unwrap_or_default(),
            date: timestamp_field(data, "date"),
            professional_id: string_or_empty(data, "professionalId"),
            professional_name: string_or_empty(data, "professionalName"),
        }
    }

    pub fn is_revenue(&self) -> bool {
        self.kind == REVENUE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub client_name: String,
    pub date: Option<DateTime<Utc>>,
    pub service_names: Vec<String>,
    pub vehicle_plate: String,
    pub professional_id: String,
}

impl Appointment {
    pub fn from_document(doc: &Document) -> Self {
        let data = &doc.data;
        let service_names = data
            .get("services")
            .and_then(|v| v.as_array())
            .map(|services| {
                services
                    .iter()
                    .filter_map(|s| s.get("name").and_then(|n| n.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            id: doc.id().to_string(),
            client_name: string_or_empty(data, "clientName"),
            date: timestamp_field(data, "date"),
            service_names,
            vehicle_plate: string_or_empty(data, "vehiclePlate"),
            professional_id: string_or_empty(data, "professionalId"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Client {
    pub fn from_document(doc: &Document) -> Self {
        Self { id: doc.id().to_string(), created_at: timestamp_field(&doc.data, "createdAt") }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct YardVehicle {
    pub id: String,
    pub exit_time: Option<String>,
    pub professional_id: String,
}

impl YardVehicle {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id().to_string(),
            exit_time: str_field(&doc.data, "exitTime"),
            professional_id: string_or_empty(&doc.data, "professionalId"),
        }
    }

    pub fn in_yard(&self) -> bool {
        self.exit_time.is_none()
    }
}

pub const YARD_RELEASED: &str = "liberado";
pub const APPOINTMENT_FINISHED: &str = "finalizado";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::CollectionPath;
    use serde_json::json;

    fn doc(id: &str, value: serde_json::Value) -> Document {
        Document {
            path: CollectionPath::root("transactions").doc(id),
            data: value.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn legacy_amount_feeds_total() {
        let tx = Transaction::from_document(&doc("t", json!({ "amount": 150.5 })));
        assert_eq!(tx.total_amount, Decimal::new(1505, 1));
        assert!(tx.is_revenue());
    }

    #[test]
    fn employees_cannot_write_admin_only_collections() {
        for collection in [TenantCollection::Budgets, TenantCollection::Stock] {
            assert!(collection.rule().read_any.is_empty());
            assert!(collection.rule().write_any.is_empty());
        }
        assert_eq!(TenantCollection::Yard.rule().write_any, &[PermissionKey::PatioEdit]);
    }

    #[test]
    fn collection_names_parse() {
        for collection in TenantCollection::ALL {
            assert_eq!(TenantCollection::parse(collection.as_str()), Some(collection));
        }
        assert_eq!(TenantCollection::parse("employees"), None);
    }
}
