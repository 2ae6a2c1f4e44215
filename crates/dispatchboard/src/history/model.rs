use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Job status field (`"Open" | "Filled" | "Filled by Company"`).
pub const OPEN_FIELD: &str = "open";
pub const ARCHIVED_FIELD: &str = "archivedJob";

// Fields holding a user id that must be shown as a username.
pub const IDENTIFIER_FIELDS: [&str; 2] = ["claimedBy", "FillUser"];

// Fields describing who made the change, not the job itself.
pub const AUTHOR_FIELDS: [&str; 2] = ["changed_by_user_id", "updated_by"];

pub const NOT_AVAILABLE: &str = "N/A";
pub const UNKNOWN_USER: &str = "Unknown User";

pub fn is_identifier_field(key: &str) -> bool {
    IDENTIFIER_FIELDS.contains(&key)
}

pub fn is_author_field(key: &str) -> bool {
    AUTHOR_FIELDS.contains(&key)
}

/// Point-in-time field map of a job. Keys keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobState(Map<String, Value>);

impl JobState {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// The `open` status string, if present and a string.
    pub fn status(&self) -> Option<&str> {
        self.get(OPEN_FIELD).and_then(Value::as_str)
    }

    /// `archivedJob`, with missing or falsy values read as `false`.
    pub fn is_archived(&self) -> bool {
        self.get(ARCHIVED_FIELD).is_some_and(is_truthy)
    }
}

impl From<Map<String, Value>> for JobState {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for JobState {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Truthiness as the dispatch board stores it: empty strings, zero and
/// null are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Value equality used for diffing. Numbers compare by numeric value so
/// `1` and `1.0` are equal.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Actor of a history row: a pre-joined profile or a bare id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangedBy {
    Profile(UserProfile),
    Id(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    // kept raw: joined profiles are not guaranteed to carry uuid ids
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub username: Option<String>,
}

/// One audit-log row as persisted. States are raw: a JSON-encoded string,
/// an object, or null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub job_id: Uuid,
    #[serde(default)]
    pub changed_by_user_id: Option<ChangedBy>,
    pub change_time: DateTime<Utc>,
    #[serde(default)]
    pub previous_state: Value,
    #[serde(default)]
    pub new_state: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
}

impl ChangeType {
    pub fn classify(old_value: &Value, new_value: &Value) -> Self {
        if is_absent(old_value) {
            Self::Added
        } else if is_absent(new_value) {
            Self::Removed
        } else {
            Self::Modified
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Modified => "modified",
        }
    }
}

// null, missing, or the "N/A" placeholder
fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s == NOT_AVAILABLE,
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old_value: Value,
    pub new_value: Value,
    pub change_type: ChangeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    Created,
    Updated,
    Filled,
    Archived,
    Reopened,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Updated => "Updated",
            Self::Filled => "Filled",
            Self::Archived => "Archived",
            Self::Reopened => "Reopened",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "filled" => Some(Self::Filled),
            "archived" => Some(Self::Archived),
            "reopened" => Some(Self::Reopened),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display-ready history row.
#[derive(Debug, Clone, Serialize)]
pub struct FormattedRecord {
    pub id: Uuid,
    pub job_id: Uuid,
    pub changed_by_user_id: Option<ChangedBy>,
    pub change_time: DateTime<Utc>,
    pub date: String,
    pub time: String,
    pub previous_state: Option<JobState>,
    pub new_state: Option<JobState>,
    pub changes_summary: String,
    pub username: String,
    pub action_type: ActionType,
}
