//! SQLite repository implementations
//!
//! Durable backends for the selection store (one JSON payload row per
//! session) and the catalog source (a read-mostly `catalog_products`
//! table, written only by the lineage/DOH editor).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::debug;

use crate::domain::catalog::{CatalogRecord, DohStatus, Lineage};
use crate::domain::repositories::{
    CatalogSource, CatalogWriter, SelectionStore, SessionSnapshot,
};
use crate::domain::value_objects::SessionId;

/// Opens a connection pool for the given SQLite database URL.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .with_context(|| format!("failed to open sqlite database: {database_url}"))?;
    Ok(pool)
}

/// Session-keyed selection persistence.
#[derive(Clone)]
pub struct SqliteSelectionStore {
    pool: SqlitePool,
}

impl SqliteSelectionStore {
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS selection_sessions (
                session_id TEXT PRIMARY KEY,
                payload    TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl SelectionStore for SqliteSelectionStore {
    async fn load(&self, session: &SessionId) -> Result<Option<SessionSnapshot>> {
        let row = sqlx::query("SELECT payload FROM selection_sessions WHERE session_id = ?")
            .bind(session.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let payload: String = row.try_get("payload")?;
                let snapshot = serde_json::from_str(&payload)
                    .context("failed to decode persisted selection payload")?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, session: &SessionId, snapshot: &SessionSnapshot) -> Result<()> {
        let payload = serde_json::to_string(snapshot)?;
        sqlx::query(
            r"
            INSERT OR REPLACE INTO selection_sessions (session_id, payload, updated_at)
            VALUES (?, ?, ?)
            ",
        )
        .bind(session.to_string())
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, session: &SessionId) -> Result<()> {
        sqlx::query("DELETE FROM selection_sessions WHERE session_id = ?")
            .bind(session.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Catalog access over a `catalog_products` table.
#[derive(Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS catalog_products (
                name         TEXT PRIMARY KEY,
                vendor       TEXT NOT NULL DEFAULT '',
                brand        TEXT NOT NULL DEFAULT '',
                product_type TEXT NOT NULL DEFAULT '',
                lineage      TEXT,
                weight       REAL,
                units        TEXT NOT NULL DEFAULT '',
                doh          TEXT NOT NULL DEFAULT 'NONE'
            )
            ",
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }

    /// Inserts or replaces one catalog record.
    pub async fn upsert(&self, record: &CatalogRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT OR REPLACE INTO catalog_products
            (name, vendor, brand, product_type, lineage, weight, units, doh)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&record.name)
        .bind(&record.vendor)
        .bind(&record.brand)
        .bind(&record.product_type)
        .bind(record.lineage.map(|lineage| lineage.as_str().to_string()))
        .bind(record.weight)
        .bind(&record.units)
        .bind(record.doh.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_record(row: &SqliteRow) -> Result<CatalogRecord> {
    let lineage: Option<String> = row.try_get("lineage")?;
    let doh: String = row.try_get("doh")?;
    Ok(CatalogRecord {
        name: row.try_get("name")?,
        vendor: row.try_get("vendor")?,
        brand: row.try_get("brand")?,
        product_type: row.try_get("product_type")?,
        lineage: lineage.as_deref().and_then(Lineage::parse),
        weight: row.try_get("weight")?,
        units: row.try_get("units")?,
        doh: DohStatus::parse(&doh).unwrap_or_default(),
    })
}

#[async_trait]
impl CatalogSource for SqliteCatalog {
    async fn find_by_name(&self, name: &str) -> Result<Option<CatalogRecord>> {
        let row = sqlx::query(
            "SELECT name, vendor, brand, product_type, lineage, weight, units, doh \
             FROM catalog_products WHERE name = ? COLLATE NOCASE",
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn enumerate_candidates(&self, tokens: &[String]) -> Result<Vec<CatalogRecord>> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        // One instr() predicate per token, ORed; candidates over-return and
        // the matcher ranks them.
        let predicates = vec!["instr(lower(name), ?) > 0"; tokens.len()].join(" OR ");
        let sql = format!(
            "SELECT name, vendor, brand, product_type, lineage, weight, units, doh \
             FROM catalog_products WHERE {predicates} ORDER BY name",
        );

        let mut query = sqlx::query(&sql);
        for token in tokens {
            query = query.bind(token.to_lowercase());
        }
        let rows = query.fetch_all(&self.pool).await?;
        debug!(tokens = ?tokens, candidates = rows.len(), "enumerated catalog candidates");
        rows.iter().map(row_to_record).collect()
    }
}

#[async_trait]
impl CatalogWriter for SqliteCatalog {
    async fn update_lineage(&self, name: &str, lineage: Option<Lineage>) -> Result<()> {
        let result = sqlx::query("UPDATE catalog_products SET lineage = ? WHERE name = ?")
            .bind(lineage.map(|value| value.as_str().to_string()))
            .bind(name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("no catalog record named '{name}'");
        }
        Ok(())
    }

    async fn update_doh(&self, name: &str, doh: DohStatus) -> Result<()> {
        let result = sqlx::query("UPDATE catalog_products SET doh = ? WHERE name = ?")
            .bind(doh.as_str())
            .bind(name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("no catalog record named '{name}'");
        }
        Ok(())
    }
}
