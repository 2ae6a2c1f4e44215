#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use dispatchboard::api::ApiState;
use dispatchboard::history::{
    ChangedBy, HistoryFilter, HistoryFormatter, HistoryRecord, HistoryStore, JobState, StoreError,
};
use dispatchboard::permissions::PermissionTable;
use dispatchboard::users::{LookupError, UserDirectory};

/// Builds a `JobState` from a `json!({...})` object literal.
pub fn state(v: Value) -> JobState {
    match v {
        Value::Object(map) => JobState::from(map),
        other => panic!("state() needs an object, got {other}"),
    }
}

pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, h, m, 0).unwrap()
}

pub fn record(job_id: Uuid, change_time: DateTime<Utc>, previous: Value, new: Value) -> HistoryRecord {
    HistoryRecord {
        id: Uuid::new_v4(),
        job_id,
        changed_by_user_id: None,
        change_time,
        previous_state: previous,
        new_state: new,
    }
}

/// In-memory user directory. Ids in `failing` return an error; every call
/// sleeps `delay` and is counted.
#[derive(Default)]
pub struct StaticDirectory {
    names: HashMap<String, String>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl StaticDirectory {
    pub fn new(names: &[(&str, &str)]) -> Self {
        Self {
            names: names
                .iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserDirectory for StaticDirectory {
    async fn lookup_username(&self, id: &str) -> Result<Option<String>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(id) {
            return Err(LookupError::QueryFailed(format!("boom for {id}")));
        }
        Ok(self.names.get(id).cloned())
    }
}

/// History store over a fixed set of rows, honoring filters and cursors.
#[derive(Default)]
pub struct MemoryHistoryStore {
    records: Vec<HistoryRecord>,
}

impl MemoryHistoryStore {
    pub fn new(records: Vec<HistoryRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn fetch_history(
        &self,
        filter: &HistoryFilter,
        default_limit: i64,
    ) -> Result<Vec<HistoryRecord>, StoreError> {
        let mut rows: Vec<HistoryRecord> = self
            .records
            .iter()
            .filter(|r| matches(filter, r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.change_time, b.id).cmp(&(a.change_time, a.id)));
        rows.truncate(filter.effective_limit(default_limit) as usize);
        Ok(rows)
    }
}

/// Mirrors the WHERE clause and keyset cursor of `PgHistoryRepo`.
fn matches(filter: &HistoryFilter, record: &HistoryRecord) -> bool {
    if filter.job_id.is_some_and(|id| id != record.job_id) {
        return false;
    }
    if let Some(actor) = filter.changed_by {
        if actor_id(record.changed_by_user_id.as_ref()) != Some(actor) {
            return false;
        }
    }
    if filter.since.is_some_and(|t| record.change_time < t) {
        return false;
    }
    if filter.until.is_some_and(|t| record.change_time >= t) {
        return false;
    }
    if let Some(cursor_time) = filter.cursor_change_time {
        let cursor_id = filter.cursor_id.unwrap_or(Uuid::max());
        if (record.change_time, record.id) >= (cursor_time, cursor_id) {
            return false;
        }
    }
    true
}

fn actor_id(changed_by: Option<&ChangedBy>) -> Option<Uuid> {
    let raw = match changed_by? {
        ChangedBy::Profile(profile) => profile.id.as_ref()?,
        ChangedBy::Id(id) => id,
    };
    raw.as_str().and_then(|s| Uuid::parse_str(s).ok())
}

pub struct FailingStore;

#[async_trait]
impl HistoryStore for FailingStore {
    async fn fetch_history(
        &self,
        _filter: &HistoryFilter,
        _default_limit: i64,
    ) -> Result<Vec<HistoryRecord>, StoreError> {
        Err(StoreError::ConnectionFailed("database is down".into()))
    }
}

pub fn api_state(store: impl HistoryStore + 'static, users: StaticDirectory) -> ApiState {
    ApiState {
        history: Arc::new(store),
        users: Arc::new(users),
        permissions: Arc::new(PermissionTable::default()),
        formatter: HistoryFormatter::default(),
        page_limit: 50,
    }
}

/// Connects to `TEST_DATABASE_URL` and resets the history tables. Returns
/// `None` when no test database is configured.
pub async fn setup_db() -> Option<PgPool> {
    let _ = dotenvy::dotenv();

    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping postgres test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("failed to connect to TEST_DATABASE_URL");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id uuid PRIMARY KEY,
            username text
        )
        "#,
    )
    .execute(&pool)
    .await
    .expect("create users failed");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS job_history (
            id uuid PRIMARY KEY,
            job_id uuid NOT NULL,
            changed_by_user_id uuid,
            change_time timestamptz NOT NULL DEFAULT now(),
            previous_state jsonb,
            new_state jsonb
        )
        "#,
    )
    .execute(&pool)
    .await
    .expect("create job_history failed");

    sqlx::query("TRUNCATE TABLE job_history, users")
        .execute(&pool)
        .await
        .expect("truncate failed");

    Some(pool)
}

pub async fn insert_user(pool: &PgPool, username: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, username) VALUES ($1, $2)")
        .bind(id)
        .bind(username)
        .execute(pool)
        .await
        .expect("failed to insert user");
    id
}

pub async fn insert_history(
    pool: &PgPool,
    job_id: Uuid,
    actor: Option<Uuid>,
    change_time: DateTime<Utc>,
    previous: Option<Value>,
    new: Value,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO job_history (id, job_id, changed_by_user_id, change_time, previous_state, new_state)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(id)
    .bind(job_id)
    .bind(actor)
    .bind(change_time)
    .bind(previous)
    .bind(new)
    .execute(pool)
    .await
    .expect("failed to insert history row");
    id
}
