// src/db/store.rs

use std::fmt;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::common::fields::Fields;
use crate::db::change_feed::{ChangeFeed, Subscription, WatchTarget};

#[derive(Debug, Error)]
pub enum StoreError {
    /// As regras de segurança do store negaram a leitura/escrita.
    #[error("permissão negada em '{0}'")]
    PermissionDenied(String),

    #[error("documento '{0}' não encontrado")]
    NotFound(String),

    #[error("falha de serialização: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("falha no backend do store: {0}")]
    Backend(String),
}

impl StoreError {
    /// Erros que a resolução de papel trata como "não encontrado".
    pub fn is_recoverable_lookup(&self) -> bool {
        matches!(self, StoreError::PermissionDenied(_) | StoreError::NotFound(_))
    }
}

/// Um id de documento não pode conter '/' nem ser vazio.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && !id.contains('/') && id != "." && id != ".."
}

// ---
// Caminhos: coleções têm número ímpar de segmentos, documentos número par.
// ---

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DocPath(String);

impl CollectionPath {
    pub fn root(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn doc(&self, id: &str) -> DocPath {
        DocPath(format!("{}/{}", self.0, id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// O último segmento (usado pelas buscas em grupo de coleções).
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    pub fn parent(&self) -> Option<DocPath> {
        self.0.rsplit_once('/').map(|(parent, _)| DocPath(parent.to_string()))
    }
}

impl DocPath {
    /// Reconstrói um caminho vindo do backend; rejeita caminhos de coleção.
    pub fn parse(raw: &str) -> Option<Self> {
        let segments: Vec<&str> = raw.split('/').collect();
        if segments.len() % 2 != 0 || segments.iter().any(|s| !is_valid_id(s)) {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn collection(&self, name: &str) -> CollectionPath {
        CollectionPath(format!("{}/{}", self.0, name))
    }

    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    pub fn parent(&self) -> CollectionPath {
        match self.0.rsplit_once('/') {
            Some((parent, _)) => CollectionPath(parent.to_string()),
            None => CollectionPath(String::new()),
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0 == prefix || self.0.starts_with(&format!("{prefix}/"))
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocPath,
    pub data: Fields,
}

impl Document {
    pub fn id(&self) -> &str {
        self.path.id()
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(Value::Object(self.data.clone()))?)
    }

    /// O documento como objeto JSON com o `id` embutido, do jeito que a API devolve.
    pub fn to_json_with_id(&self) -> Value {
        let mut data = self.data.clone();
        data.insert("id".to_string(), Value::String(self.id().to_string()));
        Value::Object(data)
    }
}

pub fn encode<T: Serialize>(value: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Backend(format!(
            "esperado um objeto JSON, recebido {other}"
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    Replace,
    Merge,
}

/// Filtro de igualdade em um campo de primeiro nível.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self { field: field.to_string(), value: value.into() }
    }

    pub fn matches(&self, data: &Fields) -> bool {
        data.get(&self.field) == Some(&self.value)
    }
}

/// Merge profundo: objetos são combinados recursivamente, o resto é sobrescrito.
pub fn merge_fields(target: &mut Fields, patch: Fields) {
    for (key, value) in patch {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_fields(existing, incoming);
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError>;

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError>;

    async fn query(
        &self,
        collection: &CollectionPath,
        filter: &FieldFilter,
    ) -> Result<Vec<Document>, StoreError>;

    /// Busca em todas as coleções cujo último segmento é `collection_id`,
    /// em qualquer profundidade.
    async fn collection_group(
        &self,
        collection_id: &str,
        filter: &FieldFilter,
    ) -> Result<Vec<Document>, StoreError>;

    async fn add(&self, collection: &CollectionPath, data: Fields) -> Result<DocPath, StoreError>;

    async fn set(&self, path: &DocPath, data: Fields, mode: SetMode) -> Result<(), StoreError>;

    /// Atualiza campos de primeiro nível; falha com `NotFound` se o documento não existe.
    async fn update(&self, path: &DocPath, patch: Fields) -> Result<(), StoreError>;

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError>;

    fn change_feed(&self) -> &ChangeFeed;

    fn subscribe_collection(&self, collection: &CollectionPath) -> Subscription {
        self.change_feed().watch(WatchTarget::Collection(collection.clone()))
    }

    fn subscribe_document(&self, path: &DocPath) -> Subscription {
        self.change_feed().watch(WatchTarget::Document(path.clone()))
    }
}
