// src/db/pg_store.rs

// Document store sobre Postgres: cada documento é uma linha com o corpo em JSONB.
// As regras de segurança ficam a cargo do banco (RLS/GRANTs); um
// `insufficient_privilege` vira `StoreError::PermissionDenied`.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::common::fields::Fields;
use crate::db::change_feed::{ChangeFeed, ChangeKind};
use crate::db::store::{
    merge_fields, CollectionPath, DocPath, Document, DocumentStore, FieldFilter, SetMode,
    StoreError,
};

const INSUFFICIENT_PRIVILEGE: &str = "42501";

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    feed: ChangeFeed,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, feed: ChangeFeed::default() }
    }
}

fn map_db_error(path: &str, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some(INSUFFICIENT_PRIVILEGE) {
            return StoreError::PermissionDenied(path.to_string());
        }
    }
    match e {
        sqlx::Error::RowNotFound => StoreError::NotFound(path.to_string()),
        other => StoreError::Backend(other.to_string()),
    }
}

fn into_document(path: String, data: Json<Value>) -> Option<Document> {
    let path = DocPath::parse(&path)?;
    let data = match data.0 {
        Value::Object(map) => map,
        _ => Fields::new(),
    };
    Some(Document { path, data })
}

fn into_documents(rows: Vec<(String, Json<Value>)>) -> Vec<Document> {
    rows.into_iter()
        .filter_map(|(path, data)| into_document(path, data))
        .collect()
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, (String, Json<Value>)>(
            "SELECT path, data FROM documents WHERE path = $1",
        )
        .bind(path.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error(path.as_str(), e))?;

        Ok(row.and_then(|(path, data)| into_document(path, data)))
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query_as::<_, (String, Json<Value>)>(
            "SELECT path, data FROM documents WHERE collection_path = $1 ORDER BY doc_id",
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error(collection.as_str(), e))?;

        Ok(into_documents(rows))
    }

    async fn query(
        &self,
        collection: &CollectionPath,
        filter: &FieldFilter,
    ) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query_as::<_, (String, Json<Value>)>(
            r#"
            SELECT path, data FROM documents
            WHERE collection_path = $1 AND data -> $2 = $3
            ORDER BY doc_id
            "#,
        )
        .bind(collection.as_str())
        .bind(&filter.field)
        .bind(Json(&filter.value))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error(collection.as_str(), e))?;

        Ok(into_documents(rows))
    }

    async fn collection_group(
        &self,
        collection_id: &str,
        filter: &FieldFilter,
    ) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query_as::<_, (String, Json<Value>)>(
            r#"
            SELECT path, data FROM documents
            WHERE collection_id = $1 AND data -> $2 = $3
            ORDER BY path
            "#,
        )
        .bind(collection_id)
        .bind(&filter.field)
        .bind(Json(&filter.value))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error(collection_id, e))?;

        Ok(into_documents(rows))
    }

    async fn add(&self, collection: &CollectionPath, data: Fields) -> Result<DocPath, StoreError> {
        let path = collection.doc(&Uuid::new_v4().simple().to_string());
        self.set(&path, data, SetMode::Replace).await?;
        Ok(path)
    }

    async fn set(&self, path: &DocPath, data: Fields, mode: SetMode) -> Result<(), StoreError> {
        let map_err = |e| map_db_error(path.as_str(), e);
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        let body = match mode {
            SetMode::Replace => data,
            SetMode::Merge => {
                // Lê com lock de linha para o merge não perder escritas concorrentes.
                let current = sqlx::query_scalar::<_, Json<Value>>(
                    "SELECT data FROM documents WHERE path = $1 FOR UPDATE",
                )
                .bind(path.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_err)?;

                let mut merged = match current.map(|json| json.0) {
                    Some(Value::Object(map)) => map,
                    _ => Fields::new(),
                };
                merge_fields(&mut merged, data);
                merged
            }
        };

        let collection = path.parent();
        sqlx::query(
            r#"
            INSERT INTO documents (path, collection_path, collection_id, doc_id, data)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (path)
            DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            "#,
        )
        .bind(path.as_str())
        .bind(collection.as_str())
        .bind(collection.id())
        .bind(path.id())
        .bind(Json(Value::Object(body)))
        .execute(&mut *tx)
        .await
        .map_err(map_err)?;

        tx.commit().await.map_err(map_err)?;
        self.feed.publish(path.clone(), ChangeKind::Upserted);
        Ok(())
    }

    async fn update(&self, path: &DocPath, patch: Fields) -> Result<(), StoreError> {
        // `||` em JSONB substitui só as chaves de primeiro nível, como o update do store.
        let result = sqlx::query(
            "UPDATE documents SET data = data || $2, updated_at = NOW() WHERE path = $1",
        )
        .bind(path.as_str())
        .bind(Json(Value::Object(patch)))
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(path.as_str(), e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(path.to_string()));
        }
        self.feed.publish(path.clone(), ChangeKind::Upserted);
        Ok(())
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE path = $1")
            .bind(path.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error(path.as_str(), e))?;

        if result.rows_affected() > 0 {
            self.feed.publish(path.clone(), ChangeKind::Deleted);
        }
        Ok(())
    }

    fn change_feed(&self) -> &ChangeFeed {
        &self.feed
    }
}
