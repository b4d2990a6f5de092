// SQLite DocumentStore Implementation

use crate::connection::{map_sqlx_error, open_document_pool};
use crate::filter::{matches_all, sort_documents};
use async_trait::async_trait;
use consultorio_core::error::{AppError, Result};
use consultorio_core::port::{Document, DocumentData, DocumentStore, Filter, IdProvider, OrderBy};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

const UPSERT: &str = "INSERT INTO documents (collection, id, data) VALUES (?1, ?2, ?3) \
                      ON CONFLICT (collection, id) DO UPDATE SET data = excluded.data";

/// JSON documents grouped by collection, one row per document
///
/// Filters are evaluated in process after loading the collection, which
/// keeps operator semantics identical for nested paths and every value type.
pub struct SqliteDocumentStore {
    location: String,
    id_provider: Arc<dyn IdProvider>,
    pool: RwLock<Option<SqlitePool>>,
}

impl SqliteDocumentStore {
    pub fn new(location: impl Into<String>, id_provider: Arc<dyn IdProvider>) -> Self {
        Self {
            location: location.into(),
            id_provider,
            pool: RwLock::new(None),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    async fn pool(&self) -> Result<SqlitePool> {
        self.pool.read().await.clone().ok_or_else(|| {
            AppError::Connectivity("Document store is not connected".to_string())
        })
    }

    async fn load_collection(&self, collection: &str) -> Result<Vec<Document>> {
        let pool = self.pool().await?;
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, data FROM documents WHERE collection = ?1 ORDER BY id")
                .bind(collection)
                .fetch_all(&pool)
                .await
                .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|(id, data)| decode(id, &data))
            .collect()
    }
}

fn decode(id: String, data: &str) -> Result<Document> {
    let data: DocumentData = serde_json::from_str(data)?;
    Ok(Document::new(id, data))
}

fn encode(data: &DocumentData) -> Result<String> {
    Ok(serde_json::to_string(data)?)
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn connect(&self) -> Result<()> {
        let mut guard = self.pool.write().await;
        if guard.is_some() {
            return Ok(());
        }
        let pool = open_document_pool(&self.location).await?;
        info!(location = %self.location, "Document store connected");
        *guard = Some(pool);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.pool.read().await.is_some()
    }

    async fn close(&self) {
        if let Some(pool) = self.pool.write().await.take() {
            pool.close().await;
            info!(location = %self.location, "Document store closed");
        }
    }

    async fn create(&self, collection: &str, id: &str, data: DocumentData) -> Result<()> {
        let pool = self.pool().await?;
        sqlx::query(UPSERT)
            .bind(collection)
            .bind(id)
            .bind(encode(&data)?)
            .execute(&pool)
            .await
            .map_err(map_sqlx_error)?;
        debug!(collection, id, "Document written");
        Ok(())
    }

    async fn create_auto_id(&self, collection: &str, data: DocumentData) -> Result<String> {
        let id = self.id_provider.generate_id();
        self.create(collection, &id, data).await?;
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let pool = self.pool().await?;
        let data: Option<String> =
            sqlx::query_scalar("SELECT data FROM documents WHERE collection = ?1 AND id = ?2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&pool)
                .await
                .map_err(map_sqlx_error)?;

        data.map(|data| decode(id.to_string(), &data)).transpose()
    }

    async fn list(&self, collection: &str, limit: Option<usize>) -> Result<Vec<Document>> {
        let pool = self.pool().await?;
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit
            .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
            .unwrap_or(-1);
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT id, data FROM documents WHERE collection = ?1 ORDER BY id LIMIT ?2",
        )
        .bind(collection)
        .bind(limit)
        .fetch_all(&pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|(id, data)| decode(id, &data))
            .collect()
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        order_by: Option<&OrderBy>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        let mut docs = self.load_collection(collection).await?;
        docs.retain(|doc| matches_all(doc, filters));
        if let Some(order) = order_by {
            sort_documents(&mut docs, order);
        }
        if let Some(limit) = limit {
            docs.truncate(limit);
        }
        debug!(collection, filters = filters.len(), found = docs.len(), "Query evaluated");
        Ok(docs)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        data: DocumentData,
        merge: bool,
    ) -> Result<()> {
        if !merge {
            return self.create(collection, id, data).await;
        }

        let pool = self.pool().await?;
        let mut tx = pool.begin().await.map_err(map_sqlx_error)?;
        let existing: Option<String> =
            sqlx::query_scalar("SELECT data FROM documents WHERE collection = ?1 AND id = ?2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

        let Some(existing) = existing else {
            return Err(AppError::NotFound(format!(
                "Document {}/{} not found",
                collection, id
            )));
        };

        let mut merged: DocumentData = serde_json::from_str(&existing)?;
        merged.extend(data);

        sqlx::query(UPSERT)
            .bind(collection)
            .bind(id)
            .bind(encode(&merged)?)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        debug!(collection, id, "Document merged");
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let pool = self.pool().await?;
        sqlx::query("DELETE FROM documents WHERE collection = ?1 AND id = ?2")
            .bind(collection)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(map_sqlx_error)?;
        debug!(collection, id, "Document deleted");
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let pool = self.pool().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ?1")
            .bind(collection)
            .fetch_one(&pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        let pool = self.pool().await?;
        let exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM documents WHERE collection = ?1)",
        )
        .bind(collection)
        .fetch_one(&pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(exists != 0)
    }
}
