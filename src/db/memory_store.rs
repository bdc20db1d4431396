// src/db/memory_store.rs

// Store em memória: usado em desenvolvimento (STORE_BACKEND=memory) e nos testes.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::common::fields::Fields;
use crate::db::change_feed::{ChangeFeed, ChangeKind};
use crate::db::store::{
    merge_fields, CollectionPath, DocPath, Document, DocumentStore, FieldFilter, SetMode,
    StoreError,
};

#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<BTreeMap<DocPath, Fields>>,
    // Prefixos cuja leitura é negada, simulando regras de segurança do backend.
    denied_reads: RwLock<Vec<String>>,
    feed: ChangeFeed,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nega leituras em tudo que estiver sob `prefix` (ex.: "users/B/employees").
    pub fn deny_reads_under(&self, prefix: &str) {
        if let Ok(mut denied) = self.denied_reads.write() {
            denied.push(prefix.to_string());
        }
    }

    fn check_read(&self, path: &DocPath) -> Result<(), StoreError> {
        let denied = self
            .denied_reads
            .read()
            .map_err(|_| StoreError::Backend("lock de regras envenenado".into()))?;
        if denied.iter().any(|prefix| path.starts_with(prefix)) {
            return Err(StoreError::PermissionDenied(path.to_string()));
        }
        Ok(())
    }

    fn read_docs(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<DocPath, Fields>>, StoreError> {
        self.docs
            .read()
            .map_err(|_| StoreError::Backend("lock de documentos envenenado".into()))
    }

    fn write_docs(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<DocPath, Fields>>, StoreError> {
        self.docs
            .write()
            .map_err(|_| StoreError::Backend("lock de documentos envenenado".into()))
    }

    fn collect<F>(&self, keep: F) -> Result<Vec<Document>, StoreError>
    where
        F: Fn(&DocPath, &Fields) -> bool,
    {
        let docs = self.read_docs()?;
        let mut found = Vec::new();
        for (path, data) in docs.iter().filter(|(path, data)| keep(path, data)) {
            self.check_read(path)?;
            found.push(Document { path: path.clone(), data: data.clone() });
        }
        Ok(found)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        self.check_read(path)?;
        let docs = self.read_docs()?;
        Ok(docs
            .get(path)
            .map(|data| Document { path: path.clone(), data: data.clone() }))
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        self.collect(|path, _| &path.parent() == collection)
    }

    async fn query(
        &self,
        collection: &CollectionPath,
        filter: &FieldFilter,
    ) -> Result<Vec<Document>, StoreError> {
        self.collect(|path, data| &path.parent() == collection && filter.matches(data))
    }

    async fn collection_group(
        &self,
        collection_id: &str,
        filter: &FieldFilter,
    ) -> Result<Vec<Document>, StoreError> {
        self.collect(|path, data| path.parent().id() == collection_id && filter.matches(data))
    }

    async fn add(&self, collection: &CollectionPath, data: Fields) -> Result<DocPath, StoreError> {
        let path = collection.doc(&Uuid::new_v4().simple().to_string());
        self.write_docs()?.insert(path.clone(), data);
        self.feed.publish(path.clone(), ChangeKind::Upserted);
        Ok(path)
    }

    async fn set(&self, path: &DocPath, data: Fields, mode: SetMode) -> Result<(), StoreError> {
        {
            let mut docs = self.write_docs()?;
            match (mode, docs.get_mut(path)) {
                (SetMode::Merge, Some(existing)) => merge_fields(existing, data),
                _ => {
                    docs.insert(path.clone(), data);
                }
            }
        }
        self.feed.publish(path.clone(), ChangeKind::Upserted);
        Ok(())
    }

    async fn update(&self, path: &DocPath, patch: Fields) -> Result<(), StoreError> {
        {
            let mut docs = self.write_docs()?;
            let existing = docs
                .get_mut(path)
                .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
            for (key, value) in patch {
                existing.insert(key, value);
            }
        }
        self.feed.publish(path.clone(), ChangeKind::Upserted);
        Ok(())
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        let removed = self.write_docs()?.remove(path).is_some();
        if removed {
            self.feed.publish(path.clone(), ChangeKind::Deleted);
        }
        Ok(())
    }

    fn change_feed(&self) -> &ChangeFeed {
        &self.feed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn collection_group_spans_every_owner() {
        let store = MemoryDocumentStore::new();
        let users = CollectionPath::root("users");
        store
            .set(&users.doc("A").collection("employees").doc("t1"), fields(json!({ "uid": "t1" })), SetMode::Replace)
            .await
            .unwrap();
        store
            .set(&users.doc("B").collection("employees").doc("t2"), fields(json!({ "uid": "t2" })), SetMode::Replace)
            .await
            .unwrap();
        store
            .set(&users.doc("B").collection("clients").doc("t2"), fields(json!({ "uid": "t2" })), SetMode::Replace)
            .await
            .unwrap();

        let found = store
            .collection_group("employees", &FieldFilter::eq("uid", "t2"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path.as_str(), "users/B/employees/t2");
    }

    #[tokio::test]
    async fn denied_prefix_surfaces_permission_denied() {
        let store = MemoryDocumentStore::new();
        store.deny_reads_under("employees");
        let err = store
            .get(&CollectionPath::root("employees").doc("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn update_requires_existing_document() {
        let store = MemoryDocumentStore::new();
        let path = CollectionPath::root("users").doc("ghost");
        let err = store.update(&path, Fields::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
