// src/db/profile_repo.rs

use std::sync::Arc;

use crate::{
    common::fields::Fields,
    db::store::{DocPath, Document, DocumentStore, FieldFilter, SetMode, StoreError},
    models::{
        records::TenantCollection,
        scope::{legacy_employee_path, profile_path, TenantScope, EMPLOYEES},
    },
};

// Perfis (users/{uid}) e registros de técnicos, nas três formas em que existem.
#[derive(Clone)]
pub struct ProfileRepository {
    store: Arc<dyn DocumentStore>,
}

impl ProfileRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get_profile(&self, uid: &str) -> Result<Option<Document>, StoreError> {
        self.store.get(&profile_path(uid)).await
    }

    pub async fn get_legacy_employee(&self, uid: &str) -> Result<Option<Document>, StoreError> {
        self.store.get(&legacy_employee_path(uid)).await
    }

    /// Busca em todas as sub-coleções `employees` por um registro com este uid.
    pub async fn search_employee_records(&self, uid: &str) -> Result<Vec<Document>, StoreError> {
        self.store
            .collection_group(EMPLOYEES, &FieldFilter::eq("uid", uid))
            .await
    }

    pub async fn merge_profile(&self, uid: &str, fields: Fields) -> Result<(), StoreError> {
        self.store.set(&profile_path(uid), fields, SetMode::Merge).await
    }

    pub async fn replace_profile(&self, uid: &str, fields: Fields) -> Result<(), StoreError> {
        self.store.set(&profile_path(uid), fields, SetMode::Replace).await
    }

    pub async fn delete_profile(&self, uid: &str) -> Result<(), StoreError> {
        self.store.delete(&profile_path(uid)).await
    }

    // ---
    // Registros dentro do dono
    // ---

    pub async fn get_employee(
        &self,
        scope: &TenantScope,
        uid: &str,
    ) -> Result<Option<Document>, StoreError> {
        self.store.get(&scope.employee(uid)).await
    }

    pub async fn list_employees(&self, scope: &TenantScope) -> Result<Vec<Document>, StoreError> {
        self.store.list(&scope.employees()).await
    }

    pub async fn write_employee(
        &self,
        scope: &TenantScope,
        uid: &str,
        fields: Fields,
        mode: SetMode,
    ) -> Result<(), StoreError> {
        self.store.set(&scope.employee(uid), fields, mode).await
    }

    pub async fn delete_employee(&self, scope: &TenantScope, uid: &str) -> Result<(), StoreError> {
        self.store.delete(&scope.employee(uid)).await
    }

    pub async fn professional_exists(&self, scope: &TenantScope, id: &str) -> Result<bool, StoreError> {
        Ok(self
            .store
            .get(&scope.record(TenantCollection::Professionals, id))
            .await?
            .is_some())
    }

    // ---
    // Registro por caminho (o que a resolução de papel usou)
    // ---

    pub async fn get_record(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        self.store.get(path).await
    }

    pub async fn write_record(&self, path: &DocPath, fields: Fields, mode: SetMode) -> Result<(), StoreError> {
        self.store.set(path, fields, mode).await
    }
}
