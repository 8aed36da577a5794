//! Expense persistence layer
//!
//! Records are keyed and range-scanned by their ISO-8601 timestamp string.
//! Two backends: an in-memory store for development and tests, and a
//! Postgres store selected by DATABASE_URL with a lazily created schema.

use crate::config::Config;
use crate::models::{Category, ExpenseRecord};
use crate::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{info, warn};

/// Trait for expense persistence. Create and range-read only — records are
/// never updated or deleted.
#[async_trait::async_trait]
pub trait ExpenseStore: Send + Sync {
    async fn save(&self, record: &ExpenseRecord) -> Result<()>;

    /// All records whose timestamp falls within `[start, end]`, ascending,
    /// optionally restricted to one user.
    async fn search(&self, start: &str, end: &str, user: Option<&str>)
        -> Result<Vec<ExpenseRecord>>;
}

//
// ================= In-memory =================
//

/// In-memory expense store for development and tests.
pub struct InMemoryExpenseStore {
    records: Arc<RwLock<Vec<ExpenseRecord>>>,
}

impl InMemoryExpenseStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for InMemoryExpenseStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ExpenseStore for InMemoryExpenseStore {
    async fn save(&self, record: &ExpenseRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.push(record.clone());
        Ok(())
    }

    async fn search(
        &self,
        start: &str,
        end: &str,
        user: Option<&str>,
    ) -> Result<Vec<ExpenseRecord>> {
        let records = self.records.read().await;

        let mut matches: Vec<ExpenseRecord> = records
            .iter()
            .filter(|record| record.timestamp.as_str() >= start && record.timestamp.as_str() <= end)
            .filter(|record| user.map_or(true, |u| record.user_id == u))
            .cloned()
            .collect();

        matches.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(matches)
    }
}

//
// ================= Postgres =================
//

pub struct PostgresExpenseStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PostgresExpenseStore {
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)?;

        Ok(Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        })
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS expenses (
                      "timestamp" TEXT PRIMARY KEY,
                      value NUMERIC NOT NULL,
                      category TEXT NOT NULL,
                      description TEXT NOT NULL,
                      user_id TEXT NOT NULL,
                      whatsapp_from TEXT NOT NULL
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_expenses_user_time
                    ON expenses (user_id, "timestamp");
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl ExpenseStore for PostgresExpenseStore {
    async fn save(&self, record: &ExpenseRecord) -> Result<()> {
        self.ensure_schema().await?;

        info!("Saving expense at {}", record.timestamp);

        sqlx::query(
            r#"
            INSERT INTO expenses ("timestamp", value, category, description, user_id, whatsapp_from)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&record.timestamp)
        .bind(record.value)
        .bind(record.category.as_str())
        .bind(&record.description)
        .bind(&record.user_id)
        .bind(&record.whatsapp_from)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn search(
        &self,
        start: &str,
        end: &str,
        user: Option<&str>,
    ) -> Result<Vec<ExpenseRecord>> {
        self.ensure_schema().await?;

        let rows = match user {
            Some(user) => {
                sqlx::query(
                    r#"
                    SELECT "timestamp", value, category, description, user_id, whatsapp_from
                    FROM expenses
                    WHERE "timestamp" BETWEEN $1 AND $2 AND user_id = $3
                    ORDER BY "timestamp" ASC
                    "#,
                )
                .bind(start)
                .bind(end)
                .bind(user)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT "timestamp", value, category, description, user_id, whatsapp_from
                    FROM expenses
                    WHERE "timestamp" BETWEEN $1 AND $2
                    ORDER BY "timestamp" ASC
                    "#,
                )
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let category: String = row.try_get("category")?;
            records.push(ExpenseRecord {
                timestamp: row.try_get("timestamp")?,
                value: row.try_get("value")?,
                category: Category::parse(&category),
                description: row.try_get("description")?,
                user_id: row.try_get("user_id")?,
                whatsapp_from: row.try_get("whatsapp_from")?,
            });
        }

        Ok(records)
    }
}

/// Pick the store backend from configuration: Postgres when DATABASE_URL is
/// set and reachable, in-memory otherwise.
pub fn build_store(config: &Config) -> Arc<dyn ExpenseStore> {
    if let Some(url) = config.database_url.as_deref() {
        match PostgresExpenseStore::connect_lazy(url) {
            Ok(store) => {
                info!("Expense store backend: postgres");
                return Arc::new(store);
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres expense store, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("Expense store backend: in-memory");
    Arc::new(InMemoryExpenseStore::new())
}
