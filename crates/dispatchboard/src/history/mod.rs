pub mod compare;
pub mod format;
pub mod model;
pub mod repo;
pub mod timeline;

pub use compare::get_job_state_comparison;
pub use format::{
    changes_summary, classify_action, format_date, format_job_history_record, format_state,
    resolve_username, FormattedDate, HistoryFormatter,
};
pub use model::{
    ActionType, ChangeType, ChangedBy, FieldChange, FormattedRecord, HistoryRecord, JobState,
    UserProfile,
};
pub use repo::{HistoryFilter, HistoryStore, PgHistoryRepo, StoreError};
pub use timeline::{build_job_history, HistoryEntry, JobHistory};
