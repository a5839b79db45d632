use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};

use crate::error::StoreError;
use crate::model::{RouteDocument, WriteAck};
use crate::store::revision::next_revision;
use crate::store::traits::{RouteDocStore, StoreResult};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS route_documents (
        id TEXT PRIMARY KEY,
        namespace TEXT NOT NULL,
        rev TEXT NOT NULL,
        body JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const CREATE_NAMESPACE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS route_documents_namespace_idx ON route_documents (namespace)";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Create the route document table if it does not exist yet
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .context("Failed to create route_documents table")?;
        sqlx::query(CREATE_NAMESPACE_INDEX)
            .execute(&self.pool)
            .await
            .context("Failed to create route_documents namespace index")?;
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn exists(&self, id: &str) -> StoreResult<bool> {
        let row = sqlx::query("SELECT 1 FROM route_documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Turn a zero-row conditional write into the matching error.
    async fn missed_write(&self, id: &str) -> StoreError {
        match self.exists(id).await {
            Ok(true) => StoreError::Conflict { id: id.to_string() },
            Ok(false) => StoreError::NotFound { id: id.to_string() },
            Err(e) => e,
        }
    }
}

fn doc_from_row(row: &PgRow) -> StoreResult<RouteDocument> {
    let rev: String = row.try_get("rev")?;
    let body: serde_json::Value = row.try_get("body")?;
    let mut doc: RouteDocument = serde_json::from_value(body)?;
    doc.revision = Some(rev);
    Ok(doc)
}

#[async_trait::async_trait]
impl RouteDocStore for PostgresStore {
    async fn get_doc(&self, id: &str) -> StoreResult<Option<RouteDocument>> {
        let row = sqlx::query("SELECT rev, body FROM route_documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(doc_from_row(&row)?))
    }

    async fn put_doc(
        &self,
        doc: &RouteDocument,
        previous_rev: Option<&str>,
    ) -> StoreResult<WriteAck> {
        let body = serde_json::to_value(doc.body())?;
        let rev = next_revision(previous_rev, body.to_string().as_bytes());

        let result = match previous_rev {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO route_documents (id, namespace, rev, body, updated_at)
                    VALUES ($1, $2, $3, $4, NOW())
                    ON CONFLICT (id) DO NOTHING
                    "#,
                )
                .bind(&doc.id)
                .bind(&doc.namespace)
                .bind(&rev)
                .bind(&body)
                .execute(&self.pool)
                .await?
            }
            Some(prev) => {
                sqlx::query(
                    r#"
                    UPDATE route_documents
                    SET rev = $1, body = $2, namespace = $3, updated_at = NOW()
                    WHERE id = $4 AND rev = $5
                    "#,
                )
                .bind(&rev)
                .bind(&body)
                .bind(&doc.namespace)
                .bind(&doc.id)
                .bind(prev)
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(match previous_rev {
                None => StoreError::Conflict { id: doc.id.clone() },
                Some(_) => self.missed_write(&doc.id).await,
            });
        }

        Ok(WriteAck::new(doc.id.clone(), rev))
    }

    async fn delete_doc(&self, id: &str, rev: &str) -> StoreResult<WriteAck> {
        let result = sqlx::query("DELETE FROM route_documents WHERE id = $1 AND rev = $2")
            .bind(id)
            .bind(rev)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(self.missed_write(id).await);
        }

        Ok(WriteAck::new(id, next_revision(Some(rev), b"")))
    }

    async fn list_docs(&self, namespace: &str) -> StoreResult<Vec<RouteDocument>> {
        let rows = sqlx::query("SELECT rev, body FROM route_documents WHERE namespace = $1 ORDER BY id")
            .bind(namespace)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(doc_from_row).collect()
    }
}
