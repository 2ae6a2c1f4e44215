use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::history::{ActionType, FieldChange, HistoryFilter};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub job_id: Option<Uuid>,
    pub changed_by: Option<Uuid>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub cursor_change_time: Option<DateTime<Utc>>,
    pub cursor_id: Option<Uuid>,
    pub action: Option<String>,
}

impl HistoryQuery {
    pub fn filter(&self) -> HistoryFilter {
        HistoryFilter {
            job_id: self.job_id,
            changed_by: self.changed_by,
            since: self.since,
            until: self.until,
            limit: self.limit,
            cursor_change_time: self.cursor_change_time,
            cursor_id: self.cursor_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    #[serde(default)]
    pub previous_state: Value,
    pub new_state: Value,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub action_type: ActionType,
    pub changes_summary: String,
    pub changes: Vec<FieldChange>,
}

#[derive(Debug, Deserialize)]
pub struct PermissionQuery {
    pub role: Option<String>,
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct PermissionResponse {
    pub roles: Vec<String>,
    pub path: String,
    pub allowed: bool,
}

#[derive(Debug, Deserialize)]
pub struct MatrixQuery {
    pub routes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TilesQuery {
    pub role: Option<String>,
}
