// src/services/migration_service.rs

// Copia as coleções globais antigas (demo_*) para dentro do dono. Roda uma vez
// por oficina; o marcador em users/{owner}/meta/legacyMigration impede repetir.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    common::{
        error::AppError,
        fields::{timestamp_field, timestamp_value, Fields},
    },
    db::store::{CollectionPath, DocumentStore, SetMode},
    models::{access::AccessContext, records::TenantCollection},
};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub already_done: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub migrated: BTreeMap<String, usize>,
}

fn text_or_empty(data: &mut Fields, key: &str) {
    let keep = matches!(data.get(key), Some(Value::String(s)) if !s.is_empty());
    if !keep {
        data.insert(key.to_string(), Value::String(String::new()));
    }
}

fn text_or(data: &mut Fields, key: &str, default: &str) {
    let keep = matches!(data.get(key), Some(Value::String(s)) if !s.is_empty());
    if !keep {
        data.insert(key.to_string(), Value::String(default.to_string()));
    }
}

fn number_or(data: &mut Fields, key: &str, default: Value) {
    if !matches!(data.get(key), Some(Value::Number(_))) {
        data.insert(key.to_string(), default);
    }
}

fn number_of(data: &Fields, key: &str) -> Option<Value> {
    match data.get(key) {
        Some(n @ Value::Number(_)) => Some(n.clone()),
        _ => None,
    }
}

/// Normaliza um documento antigo com os padrões de cada coleção.
pub fn legacy_transform(collection: TenantCollection, source: &Fields, now: DateTime<Utc>) -> Fields {
    match collection {
        TenantCollection::Clients => {
            let mut data = Fields::new();
            for key in ["name", "cpf", "phone", "email", "vehicleBrand", "vehicleModel", "vehicleYear", "vehiclePlate"] {
                data.insert(key.into(), source.get(key).cloned().unwrap_or(Value::Null));
                text_or_empty(&mut data, key);
            }
            // `vehicleYear` pode ter sido gravado como número.
            if let Some(year @ Value::Number(_)) = source.get("vehicleYear") {
                data.insert("vehicleYear".into(), year.clone());
            }
            let created = timestamp_field(source, "createdAt")
                .map(timestamp_value)
                .unwrap_or_else(|| timestamp_value(now));
            data.insert("createdAt".into(), created);
            data
        }
        TenantCollection::Professionals => {
            let mut data = Fields::new();
            for key in ["name", "email", "specialty"] {
                data.insert(key.into(), source.get(key).cloned().unwrap_or(Value::Null));
                text_or_empty(&mut data, key);
            }
            data
        }
        TenantCollection::Services => {
            let mut data = Fields::new();
            data.insert("name".into(), source.get("name").cloned().unwrap_or(Value::Null));
            text_or_empty(&mut data, "name");
            data.insert("price".into(), number_of(source, "price").unwrap_or(Value::from(0)));
            data.insert("duration".into(), number_of(source, "duration").unwrap_or(Value::from(60)));
            data.insert(
                "commissionType".into(),
                source.get("commissionType").cloned().unwrap_or(Value::Null),
            );
            text_or(&mut data, "commissionType", "percentage");
            data.insert(
                "commissionValue".into(),
                number_of(source, "commissionValue").unwrap_or(Value::from(0)),
            );
            data
        }
        TenantCollection::Appointments => {
            let mut data = source.clone();
            text_or(&mut data, "status", "agendado");
            for key in ["vehicleBrand", "vehicleModel", "vehiclePlate"] {
                text_or_empty(&mut data, key);
            }
            number_or(&mut data, "partsCost", Value::from(0));
            text_or(&mut data, "paymentMethod", "pix");
            data
        }
        TenantCollection::Transactions => {
            let mut data = source.clone();
            let total = number_of(source, "totalAmount")
                .or_else(|| number_of(source, "amount"))
                .unwrap_or(Value::from(0));
            let service_amount = number_of(source, "serviceAmount").unwrap_or_else(|| total.clone());
            data.insert("totalAmount".into(), total);
            data.insert("serviceAmount".into(), service_amount);
            number_or(&mut data, "partsCost", Value::from(0));
            number_or(&mut data, "commission", Value::from(0));
            data
        }
        TenantCollection::Yard => {
            let mut data = source.clone();
            text_or(&mut data, "status", "recebido");
            text_or(&mut data, "priority", "normal");
            data
        }
        TenantCollection::Budgets | TenantCollection::Stock => source.clone(),
    }
}

#[derive(Clone)]
pub struct MigrationService {
    store: Arc<dyn DocumentStore>,
}

impl MigrationService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn migrate_legacy(
        &self,
        ctx: &AccessContext,
        now: DateTime<Utc>,
    ) -> Result<MigrationReport, AppError> {
        if !ctx.is_admin() {
            return Err(AppError::AdminOnly);
        }

        let marker = ctx.scope.migration_marker();
        if let Some(done) = self.store.get(&marker).await? {
            let migrated = done
                .data
                .get("migrated")
                .and_then(|m| serde_json::from_value(m.clone()).ok())
                .unwrap_or_default();
            return Ok(MigrationReport {
                already_done: true,
                completed_at: timestamp_field(&done.data, "completedAt"),
                migrated,
            });
        }

        let mut migrated = BTreeMap::new();
        for collection in TenantCollection::ALL {
            let Some(source) = collection.legacy_source() else {
                continue;
            };
            let docs = self.store.list(&CollectionPath::root(source)).await?;
            if docs.is_empty() {
                tracing::info!("[migração] coleção {} vazia, nada a migrar.", source);
                continue;
            }
            for doc in &docs {
                let data = legacy_transform(collection, &doc.data, now);
                self.store
                    .set(&ctx.scope.record(collection, doc.id()), data, SetMode::Merge)
                    .await?;
            }
            tracing::info!("[migração] {} -> {} ({} documentos).", source, collection.as_str(), docs.len());
            migrated.insert(collection.as_str().to_string(), docs.len());
        }

        let mut marker_fields = Fields::new();
        marker_fields.insert("completedAt".into(), timestamp_value(now));
        marker_fields.insert("migrated".into(), serde_json::to_value(&migrated).map_err(anyhow::Error::from)?);
        self.store.set(&marker, marker_fields, SetMode::Replace).await?;

        Ok(MigrationReport { already_done: false, completed_at: Some(now), migrated })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::DocPath;
    use crate::db::MemoryDocumentStore;
    use crate::models::{
        access::{ResolutionSource, ResolvedIdentity, UserProfile},
        auth::Identity,
        subscription::SubscriptionState,
    };
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn owner() -> AccessContext {
        let resolved = ResolvedIdentity::owner("A", UserProfile::from_fields("A", &Fields::new()), ResolutionSource::DirectProfile);
        AccessContext {
            identity: Identity { uid: "A".into(), email: "a@x.com".into(), display_name: None, photo_url: None },
            scope: resolved.scope().unwrap(),
            permissions: resolved.permissions(),
            subscription: SubscriptionState::evaluate(resolved.subscription_input(), Utc::now()),
            resolved,
        }
    }

    #[test]
    fn legacy_defaults_per_collection() {
        let now = Utc::now();
        let service = legacy_transform(TenantCollection::Services, &fields(json!({ "name": "Troca de óleo", "price": "80" })), now);
        assert_eq!(service.get("duration"), Some(&json!(60)));
        assert_eq!(service.get("commissionType"), Some(&json!("percentage")));
        assert_eq!(service.get("price"), Some(&json!(0)));

        let tx = legacy_transform(TenantCollection::Transactions, &fields(json!({ "amount": 120 })), now);
        assert_eq!(tx.get("totalAmount"), Some(&json!(120)));
        assert_eq!(tx.get("serviceAmount"), Some(&json!(120)));

        let yard = legacy_transform(TenantCollection::Yard, &fields(json!({ "status": "" })), now);
        assert_eq!(yard.get("status"), Some(&json!("recebido")));
        assert_eq!(yard.get("priority"), Some(&json!("normal")));

        let appt = legacy_transform(TenantCollection::Appointments, &fields(json!({ "clientName": "Ana" })), now);
        assert_eq!(appt.get("status"), Some(&json!("agendado")));
        assert_eq!(appt.get("paymentMethod"), Some(&json!("pix")));
        assert_eq!(appt.get("clientName"), Some(&json!("Ana")));
    }

    #[tokio::test]
    async fn migration_runs_once_per_owner() {
        let store = Arc::new(MemoryDocumentStore::new());
        store
            .set(&DocPath::parse("demo_clients/c1").unwrap(), fields(json!({ "name": "João" })), SetMode::Replace)
            .await
            .unwrap();
        let service = MigrationService::new(store.clone());
        let ctx = owner();

        let first = service.migrate_legacy(&ctx, Utc::now()).await.unwrap();
        assert!(!first.already_done);
        assert_eq!(first.migrated.get("clients"), Some(&1));
        assert!(store.get(&DocPath::parse("users/A/clients/c1").unwrap()).await.unwrap().is_some());

        let second = service.migrate_legacy(&ctx, Utc::now()).await.unwrap();
        assert!(second.already_done);
        assert_eq!(second.migrated, first.migrated);
    }
}
