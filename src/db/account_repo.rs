// src/db/account_repo.rs

use std::sync::Arc;

use serde_json::Value;

use crate::{
    common::fields::Fields,
    db::store::{encode, CollectionPath, DocPath, DocumentStore, FieldFilter, SetMode, StoreError},
    models::auth::Account,
};

const ACCOUNTS: &str = "accounts";

// O repositório de contas, responsável pelas credenciais em accounts/{uid}
#[derive(Clone)]
pub struct AccountRepository {
    store: Arc<dyn DocumentStore>,
}

impl AccountRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn path(uid: &str) -> DocPath {
        CollectionPath::root(ACCOUNTS).doc(uid)
    }

    pub async fn find_by_uid(&self, uid: &str) -> Result<Option<Account>, StoreError> {
        match self.store.get(&Self::path(uid)).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    // O e-mail já chega normalizado (minúsculo, sem espaços).
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let docs = self
            .store
            .query(&CollectionPath::root(ACCOUNTS), &FieldFilter::eq("email", email))
            .await?;
        match docs.first() {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    pub async fn insert(&self, account: &Account) -> Result<(), StoreError> {
        self.store
            .set(&Self::path(&account.uid), encode(account)?, SetMode::Replace)
            .await
    }

    pub async fn update_fields(&self, uid: &str, patch: Fields) -> Result<(), StoreError> {
        self.store.update(&Self::path(uid), patch).await
    }

    pub async fn set_password_hash(
        &self,
        uid: &str,
        password_hash: &str,
        session_version: u64,
    ) -> Result<(), StoreError> {
        let mut patch = Fields::new();
        patch.insert("passwordHash".into(), Value::String(password_hash.to_string()));
        patch.insert("sessionVersion".into(), Value::from(session_version));
        self.update_fields(uid, patch).await
    }

    pub async fn delete(&self, uid: &str) -> Result<(), StoreError> {
        self.store.delete(&Self::path(uid)).await
    }
}
