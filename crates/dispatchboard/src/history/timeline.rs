use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::history::compare::get_job_state_comparison;
use crate::history::format::HistoryFormatter;
use crate::history::model::{ActionType, FieldChange, FormattedRecord, JobState};
use crate::history::repo::{HistoryFilter, HistoryStore, StoreError};
use crate::users::{UserDirectory, UsernameCache};

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: FormattedRecord,
    pub changes: Vec<FieldChange>,
}

#[derive(Debug, Serialize)]
pub struct JobHistory {
    pub items: Vec<HistoryEntry>,
    pub next_cursor_change_time: Option<DateTime<Utc>>,
    pub next_cursor_id: Option<Uuid>,
}

/// One page of formatted history with per-row field changes, newest first.
///
/// The cursor comes from the last fetched row, before `action` filtering,
/// so the next page starts where this fetch stopped. Username lookups are
/// memoized for the duration of the call.
pub async fn build_job_history(
    store: &dyn HistoryStore,
    directory: &dyn UserDirectory,
    formatter: &HistoryFormatter,
    filter: &HistoryFilter,
    default_limit: i64,
    action: Option<ActionType>,
) -> Result<JobHistory, StoreError> {
    let raw = store.fetch_history(filter, default_limit).await?;

    let (next_cursor_change_time, next_cursor_id) = raw
        .last()
        .map(|r| (Some(r.change_time), Some(r.id)))
        .unwrap_or((None, None));

    let cache = UsernameCache::new(directory);
    let empty = JobState::new();

    let mut items = Vec::with_capacity(raw.len());
    for record in &raw {
        let formatted = formatter.format(record);
        if action.is_some_and(|a| a != formatted.action_type) {
            continue;
        }

        let changes = get_job_state_comparison(
            formatted.previous_state.as_ref(),
            formatted.new_state.as_ref().unwrap_or(&empty),
            &cache,
        )
        .await;

        items.push(HistoryEntry {
            record: formatted,
            changes,
        });
    }

    let cached_users = cache.cached_len().await;
    tracing::debug!(
        fetched = raw.len(),
        returned = items.len(),
        cached_users,
        "built job history page"
    );

    Ok(JobHistory {
        items,
        next_cursor_change_time,
        next_cursor_id,
    })
}
