// src/services/record_service.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    common::{
        error::AppError,
        fields::{str_field, timestamp_value, Fields},
    },
    db::store::{is_valid_id, DocumentStore, StoreError},
    models::{
        access::AccessContext,
        permissions::PermissionKey,
        records::{TenantCollection, APPOINTMENT_FINISHED, YARD_RELEASED},
    },
};

/// Dono pode tudo; técnico precisa de uma das permissões listadas. Lista
/// vazia = coleção só do dono.
pub fn ensure_any(ctx: &AccessContext, required: &[PermissionKey]) -> Result<(), AppError> {
    if ctx.is_admin() {
        return Ok(());
    }
    match required.first() {
        None => Err(AppError::AdminOnly),
        Some(first) if !required.iter().any(|key| ctx.permissions.get(*key)) => {
            Err(AppError::PermissionRequired(*first))
        }
        Some(_) => Ok(()),
    }
}

pub fn ensure_active(ctx: &AccessContext) -> Result<(), AppError> {
    if ctx.subscription.is_active {
        Ok(())
    } else {
        Err(AppError::SubscriptionInactive)
    }
}

pub fn ensure_id(id: &str) -> Result<(), AppError> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("id '{id}' inválido")))
    }
}

// CRUD genérico das coleções de negócio, sempre sob users/{ownerUid}.
#[derive(Clone)]
pub struct RecordService {
    store: Arc<dyn DocumentStore>,
}

impl RecordService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        ctx: &AccessContext,
        collection: TenantCollection,
    ) -> Result<Vec<Value>, AppError> {
        ensure_any(ctx, collection.rule().read_any)?;
        let docs = self.store.list(&ctx.scope.collection(collection)).await?;
        Ok(docs.iter().map(|doc| doc.to_json_with_id()).collect())
    }

    pub async fn get(
        &self,
        ctx: &AccessContext,
        collection: TenantCollection,
        id: &str,
    ) -> Result<Value, AppError> {
        ensure_any(ctx, collection.rule().read_any)?;
        ensure_id(id)?;
        self.store
            .get(&ctx.scope.record(collection, id))
            .await?
            .map(|doc| doc.to_json_with_id())
            .ok_or_else(|| AppError::NotFound(format!("{}/{}", collection.as_str(), id)))
    }

    pub async fn create(
        &self,
        ctx: &AccessContext,
        collection: TenantCollection,
        mut data: Fields,
        now: DateTime<Utc>,
    ) -> Result<Value, AppError> {
        ensure_any(ctx, collection.rule().write_any)?;
        data.remove("id");
        data.entry("createdAt").or_insert_with(|| timestamp_value(now));

        let path = self.store.add(&ctx.scope.collection(collection), data.clone()).await?;
        tracing::info!("Registro criado em {}.", path);

        data.insert("id".into(), Value::String(path.id().to_string()));
        Ok(Value::Object(data))
    }

    /// Atualiza campos de primeiro nível de um registro existente.
    pub async fn update(
        &self,
        ctx: &AccessContext,
        collection: TenantCollection,
        id: &str,
        mut patch: Fields,
        now: DateTime<Utc>,
    ) -> Result<Value, AppError> {
        ensure_any(ctx, collection.rule().write_any)?;
        ensure_id(id)?;
        patch.remove("id");
        patch.insert("updatedAt".into(), timestamp_value(now));

        let path = ctx.scope.record(collection, id);
        match self.store.update(&path, patch).await {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) => {
                return Err(AppError::NotFound(format!("{}/{}", collection.as_str(), id)));
            }
            Err(e) => return Err(e.into()),
        }
        self.get(ctx, collection, id).await
    }

    pub async fn delete(
        &self,
        ctx: &AccessContext,
        collection: TenantCollection,
        id: &str,
    ) -> Result<(), AppError> {
        ensure_any(ctx, collection.rule().write_any)?;
        ensure_id(id)?;
        self.store.delete(&ctx.scope.record(collection, id)).await?;
        Ok(())
    }

    /// Libera um veículo do pátio. Se ele veio de um agendamento, o
    /// agendamento é finalizado junto.
    pub async fn release_vehicle(
        &self,
        ctx: &AccessContext,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Value, AppError> {
        ensure_any(ctx, TenantCollection::Yard.rule().write_any)?;
        ensure_id(id)?;

        let path = ctx.scope.record(TenantCollection::Yard, id);
        let vehicle = self
            .store
            .get(&path)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("yard/{id}")))?;

        let mut patch = Fields::new();
        patch.insert("status".into(), Value::String(YARD_RELEASED.into()));
        patch.insert("exitTime".into(), timestamp_value(now));
        self.store.update(&path, patch).await?;

        if let Some(appointment_id) = str_field(&vehicle.data, "appointmentId").filter(|a| is_valid_id(a)) {
            let mut finished = Fields::new();
            finished.insert("status".into(), Value::String(APPOINTMENT_FINISHED.into()));
            let appointment = ctx.scope.record(TenantCollection::Appointments, &appointment_id);
            match self.store.update(&appointment, finished).await {
                Ok(()) => {}
                Err(StoreError::NotFound(_)) => {
                    tracing::warn!("Agendamento {} do veículo {} não existe mais.", appointment_id, id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.get(ctx, TenantCollection::Yard, id).await
    }
}
