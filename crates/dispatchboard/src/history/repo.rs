use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::history::model::{ChangedBy, HistoryRecord, UserProfile};

pub const MAX_PAGE_LIMIT: i64 = 500;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("query failed: {0}")]
    QueryFailed(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::ConnectionFailed(e.to_string())
            }
            other => Self::QueryFailed(other.to_string()),
        }
    }
}

/// Filters for a history page. Cursor is (change_time, id), ordered DESC.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryFilter {
    pub job_id: Option<Uuid>,
    pub changed_by: Option<Uuid>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub cursor_change_time: Option<DateTime<Utc>>,
    pub cursor_id: Option<Uuid>,
}

impl HistoryFilter {
    pub fn for_job(job_id: Uuid) -> Self {
        Self {
            job_id: Some(job_id),
            ..Self::default()
        }
    }

    /// Requested limit clamped to [1, 500], or `default_limit` when unset.
    pub fn effective_limit(&self, default_limit: i64) -> i64 {
        self.limit
            .unwrap_or(default_limit)
            .clamp(1, MAX_PAGE_LIMIT)
    }
}

/// Read side of the append-only job history table.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Newest first. `default_limit` applies when the filter has none.
    async fn fetch_history(
        &self,
        filter: &HistoryFilter,
        default_limit: i64,
    ) -> Result<Vec<HistoryRecord>, StoreError>;
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct HistoryRow {
    id: Uuid,
    job_id: Uuid,
    changed_by_user_id: Option<Uuid>,
    changed_by_username: Option<String>,
    change_time: DateTime<Utc>,
    previous_state: Option<Value>,
    new_state: Option<Value>,
}

impl From<HistoryRow> for HistoryRecord {
    fn from(row: HistoryRow) -> Self {
        let changed_by_user_id = row.changed_by_user_id.map(|id| {
            ChangedBy::Profile(UserProfile {
                id: Some(Value::String(id.to_string())),
                username: row.changed_by_username,
            })
        });

        HistoryRecord {
            id: row.id,
            job_id: row.job_id,
            changed_by_user_id,
            change_time: row.change_time,
            previous_state: row.previous_state.unwrap_or(Value::Null),
            new_state: row.new_state.unwrap_or(Value::Null),
        }
    }
}

#[derive(Clone)]
pub struct PgHistoryRepo {
    pool: PgPool,
}

impl PgHistoryRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for PgHistoryRepo {
    #[instrument(skip(self), fields(job_id = ?filter.job_id))]
    async fn fetch_history(
        &self,
        filter: &HistoryFilter,
        default_limit: i64,
    ) -> Result<Vec<HistoryRecord>, StoreError> {
        let limit = filter.effective_limit(default_limit);

        // Cursor without id: use the max uuid so rows at exactly that time
        // are still excluded.
        let cursor_id = filter
            .cursor_change_time
            .map(|_| filter.cursor_id.unwrap_or(Uuid::max()));

        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT
              h.id,
              h.job_id,
              h.changed_by_user_id,
              u.username AS changed_by_username,
              h.change_time,
              h.previous_state,
              h.new_state
            FROM job_history h
            LEFT JOIN users u ON u.id = h.changed_by_user_id
            WHERE ($1::uuid IS NULL OR h.job_id = $1)
              AND ($2::uuid IS NULL OR h.changed_by_user_id = $2)
              AND ($3::timestamptz IS NULL OR h.change_time >= $3)
              AND ($4::timestamptz IS NULL OR h.change_time < $4)
              AND (
                $5::timestamptz IS NULL
                OR (h.change_time, h.id) < ($5::timestamptz, $6::uuid)
              )
            ORDER BY h.change_time DESC, h.id DESC
            LIMIT $7
            "#,
        )
        .bind(filter.job_id)
        .bind(filter.changed_by)
        .bind(filter.since)
        .bind(filter.until)
        .bind(filter.cursor_change_time)
        .bind(cursor_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(rows = rows.len(), limit, "fetched job history");

        Ok(rows.into_iter().map(HistoryRecord::from).collect())
    }
}
