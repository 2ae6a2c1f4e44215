use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

pub mod repo;

pub use repo::PgUserDirectory;

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("lookup query failed: {0}")]
    QueryFailed(String),
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Read-only user id -> username lookup.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn lookup_username(&self, id: &str) -> Result<Option<String>, LookupError>;
}

/// Resolves an id for display. Unknown ids, blank names and failed lookups
/// all fall back to the id itself.
pub async fn resolve_user_id_to_username(directory: &dyn UserDirectory, id: &str) -> String {
    match directory.lookup_username(id).await {
        Ok(Some(name)) if !name.trim().is_empty() => name,
        Ok(_) => {
            tracing::debug!(user_id = id, "no username for id");
            id.to_string()
        }
        Err(e) => {
            tracing::warn!(user_id = id, error = %e, "username lookup failed");
            id.to_string()
        }
    }
}

/// Memoizes lookups for the life of one caller (e.g. a single timeline
/// build). Failures are not cached.
pub struct UsernameCache<'a> {
    inner: &'a dyn UserDirectory,
    names: Mutex<HashMap<String, Option<String>>>,
}

impl<'a> UsernameCache<'a> {
    pub fn new(inner: &'a dyn UserDirectory) -> Self {
        Self {
            inner,
            names: Mutex::new(HashMap::new()),
        }
    }

    pub async fn cached_len(&self) -> usize {
        self.names.lock().await.len()
    }
}

#[async_trait]
impl UserDirectory for UsernameCache<'_> {
    async fn lookup_username(&self, id: &str) -> Result<Option<String>, LookupError> {
        if let Some(hit) = self.names.lock().await.get(id) {
            return Ok(hit.clone());
        }

        let found = self.inner.lookup_username(id).await?;
        self.names
            .lock()
            .await
            .insert(id.to_string(), found.clone());
        Ok(found)
    }
}

/// Bounds every lookup of the wrapped directory.
pub struct TimeoutDirectory<D> {
    inner: D,
    timeout: Duration,
}

impl<D: UserDirectory> TimeoutDirectory<D> {
    pub fn new(inner: D, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<D: UserDirectory> UserDirectory for TimeoutDirectory<D> {
    async fn lookup_username(&self, id: &str) -> Result<Option<String>, LookupError> {
        tokio::time::timeout(self.timeout, self.inner.lookup_username(id))
            .await
            .map_err(|_| LookupError::Timeout(self.timeout))?
    }
}
