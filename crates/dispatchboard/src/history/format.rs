use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::Value;

use crate::history::model::{
    values_equal, ActionType, ChangedBy, FormattedRecord, HistoryRecord, JobState, NOT_AVAILABLE,
    OPEN_FIELD, UNKNOWN_USER,
};

const FILLED_STATUSES: [&str; 2] = ["Filled", "Filled by Company"];
// "Archived" and "Removed" never appear in `open` today; kept for older rows.
const REOPENABLE_STATUSES: [&str; 3] = ["Filled", "Archived", "Removed"];

/// Parses a raw snapshot leniently. Anything that is not a JSON object
/// (or a string holding one) degrades to `None`.
pub fn format_state(raw: &Value) -> Option<JobState> {
    match raw {
        Value::Object(map) => Some(JobState::from(map.clone())),
        Value::String(s) => parse_state_str(s),
        Value::Null => None,
        other => {
            tracing::debug!(kind = value_kind(other), "ignoring non-object job state");
            None
        }
    }
}

fn parse_state_str(s: &str) -> Option<JobState> {
    let trimmed = s.trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => Some(JobState::from(map)),
        Ok(other) => {
            tracing::warn!(
                kind = value_kind(&other),
                "job state parsed but is not an object"
            );
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse job state");
            None
        }
    }
}

fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedDate {
    pub date: String,
    pub time: String,
}

/// `M/D/YYYY` and `h:mm:ss AM` in the given zone.
pub fn format_date(ts: DateTime<Utc>, tz: &Tz) -> FormattedDate {
    let local = ts.with_timezone(tz);
    FormattedDate {
        date: local.format("%-m/%-d/%Y").to_string(),
        time: local.format("%-I:%M:%S %p").to_string(),
    }
}

/// Derives the high-level action. Order matters: archive beats fill,
/// fill beats reopen.
pub fn classify_action(previous: Option<&JobState>, new: &JobState) -> ActionType {
    let Some(previous) = previous else {
        return ActionType::Created;
    };

    let was_archived = previous.is_archived();
    let is_archived = new.is_archived();
    if !was_archived && is_archived {
        return ActionType::Archived;
    }

    let old_status = previous.status();
    let new_status = new.status();
    let status_changed = previous.get(OPEN_FIELD) != new.get(OPEN_FIELD);
    if status_changed && new_status.is_some_and(|s| FILLED_STATUSES.contains(&s)) {
        return ActionType::Filled;
    }

    let unarchived = was_archived && !is_archived;
    let reopened = new_status == Some("Open")
        && old_status.is_some_and(|s| REOPENABLE_STATUSES.contains(&s));
    if unarchived || reopened {
        return ActionType::Reopened;
    }

    ActionType::Updated
}

/// One-line summary. Null or missing values render as `N/A` here, unlike
/// the field change list which keeps null.
pub fn changes_summary(action: ActionType, previous: Option<&JobState>, new: &JobState) -> String {
    match action {
        ActionType::Created => return "Job was created".to_string(),
        ActionType::Filled => return "Job was filled".to_string(),
        ActionType::Archived => return "Job was archived".to_string(),
        ActionType::Updated | ActionType::Reopened => {}
    }

    let parts: Vec<String> = new
        .iter()
        .filter_map(|(key, new_value)| {
            let old_value = previous.and_then(|p| p.get(key));
            let unchanged = old_value.is_some_and(|old| values_equal(old, new_value));
            if unchanged {
                return None;
            }
            Some(format!(
                "{key}: \"{}\" → \"{}\"",
                summary_value(old_value),
                summary_value(Some(new_value))
            ))
        })
        .collect();

    if parts.is_empty() {
        "No changes detected".to_string()
    } else {
        parts.join(", ")
    }
}

fn summary_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => NOT_AVAILABLE.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Display name of the actor. Bare ids are shown as-is; no lookup here.
pub fn resolve_username(changed_by: Option<&ChangedBy>) -> String {
    match changed_by {
        Some(ChangedBy::Profile(profile)) => profile
            .username
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| UNKNOWN_USER.to_string()),
        Some(ChangedBy::Id(Value::Object(profile))) => profile
            .get("username")
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| UNKNOWN_USER.to_string()),
        Some(ChangedBy::Id(Value::String(id))) if !id.is_empty() => id.clone(),
        Some(ChangedBy::Id(Value::Null)) | Some(ChangedBy::Id(Value::String(_))) | None => {
            UNKNOWN_USER.to_string()
        }
        Some(ChangedBy::Id(other)) => other.to_string(),
    }
}

/// Formats history rows for display in one time zone.
#[derive(Debug, Clone, Copy)]
pub struct HistoryFormatter {
    tz: Tz,
}

impl Default for HistoryFormatter {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

impl HistoryFormatter {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn format(&self, raw: &HistoryRecord) -> FormattedRecord {
        let previous_state = format_state(&raw.previous_state);
        let new_state = format_state(&raw.new_state);

        let empty = JobState::new();
        let new_ref = new_state.as_ref().unwrap_or(&empty);

        let action_type = classify_action(previous_state.as_ref(), new_ref);
        let changes_summary = changes_summary(action_type, previous_state.as_ref(), new_ref);
        let FormattedDate { date, time } = format_date(raw.change_time, &self.tz);

        FormattedRecord {
            id: raw.id,
            job_id: raw.job_id,
            changed_by_user_id: raw.changed_by_user_id.clone(),
            change_time: raw.change_time,
            date,
            time,
            username: resolve_username(raw.changed_by_user_id.as_ref()),
            previous_state,
            new_state,
            changes_summary,
            action_type,
        }
    }
}

/// [`HistoryFormatter::format`] with UTC display.
pub fn format_job_history_record(raw: &HistoryRecord) -> FormattedRecord {
    HistoryFormatter::default().format(raw)
}
