use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use super::{LookupError, UserDirectory};

#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    #[instrument(skip(self))]
    async fn lookup_username(&self, id: &str) -> Result<Option<String>, LookupError> {
        // ids are compared as text so non-uuid ids miss instead of erroring
        let username: Option<Option<String>> = sqlx::query_scalar(
            r#"
            SELECT username
            FROM users
            WHERE id::text = $1
            LIMIT 1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LookupError::QueryFailed(e.to_string()))?;

        Ok(username.flatten())
    }
}
