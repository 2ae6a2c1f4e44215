// crates/dispatchboard/tests/formatter.rs
mod common;

use chrono::TimeZone;
use chrono_tz::Tz;
use serde_json::{json, Value};
use uuid::Uuid;

use common::{at, record, state};
use dispatchboard::history::{
    changes_summary, classify_action, format_date, format_job_history_record, format_state,
    resolve_username, ActionType, ChangedBy, HistoryFormatter, UserProfile,
};

#[test]
fn format_state_is_lenient() {
    assert_eq!(format_state(&Value::Null), None);
    assert_eq!(format_state(&json!("")), None);
    assert_eq!(format_state(&json!("Filled")), None);
    assert_eq!(format_state(&json!(42)), None);
    assert_eq!(format_state(&json!("{not valid json")), None);
    // valid JSON, but not a field map
    assert_eq!(format_state(&json!("[1, 2, 3]")), None);

    let parsed = format_state(&json!(r#" {"open": "Open", "shift": 2} "#)).unwrap();
    assert_eq!(parsed, state(json!({"open": "Open", "shift": 2})));

    let object = json!({"vessel": "MV Columbia", "open": "Open"});
    assert_eq!(format_state(&object).unwrap(), state(object.clone()));
}

#[test]
fn parsed_state_keeps_key_order() {
    let parsed = format_state(&json!(r#"{"zeta": 1, "alpha": 2, "mid": 3}"#)).unwrap();
    let keys: Vec<&str> = parsed.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn filled_from_open() {
    let prev = state(json!({"open": "Open", "archivedJob": false}));
    let new = state(json!({"open": "Filled", "archivedJob": false}));
    assert_eq!(classify_action(Some(&prev), &new), ActionType::Filled);

    let by_company = state(json!({"open": "Filled by Company", "archivedJob": false}));
    assert_eq!(classify_action(Some(&prev), &by_company), ActionType::Filled);
}

#[test]
fn archive_wins_over_fill() {
    let prev = state(json!({"open": "Open", "archivedJob": false}));
    let new = state(json!({"open": "Filled", "archivedJob": true}));
    assert_eq!(classify_action(Some(&prev), &new), ActionType::Archived);

    let prev = state(json!({"archivedJob": false}));
    let new = state(json!({"archivedJob": true}));
    assert_eq!(classify_action(Some(&prev), &new), ActionType::Archived);

    // missing archivedJob reads as false
    let prev = state(json!({"open": "Open"}));
    assert_eq!(classify_action(Some(&prev), &new), ActionType::Archived);
}

#[test]
fn reopened_transitions() {
    let prev = state(json!({"open": "Filled", "archivedJob": true}));
    let new = state(json!({"open": "Open", "archivedJob": false}));
    assert_eq!(classify_action(Some(&prev), &new), ActionType::Reopened);

    // unarchive alone
    let prev = state(json!({"open": "Open", "archivedJob": true}));
    let new = state(json!({"open": "Open", "archivedJob": false}));
    assert_eq!(classify_action(Some(&prev), &new), ActionType::Reopened);

    // Filled -> Open while never archived
    let prev = state(json!({"open": "Filled"}));
    let new = state(json!({"open": "Open"}));
    assert_eq!(classify_action(Some(&prev), &new), ActionType::Reopened);

    let prev = state(json!({"open": "Removed"}));
    assert_eq!(classify_action(Some(&prev), &new), ActionType::Reopened);
}

#[test]
fn everything_else_is_updated() {
    let prev = state(json!({"open": "Open", "rate": 41.5}));
    let new = state(json!({"open": "Open", "rate": 43.0}));
    assert_eq!(classify_action(Some(&prev), &new), ActionType::Updated);

    // "Filled by Company" -> "Open" is not in the reopen list
    let prev = state(json!({"open": "Filled by Company"}));
    let new = state(json!({"open": "Open"}));
    assert_eq!(classify_action(Some(&prev), &new), ActionType::Updated);

    // filled status that did not change
    let prev = state(json!({"open": "Filled", "notes": "a"}));
    let new = state(json!({"open": "Filled", "notes": "b"}));
    assert_eq!(classify_action(Some(&prev), &new), ActionType::Updated);

    assert_eq!(classify_action(None, &new), ActionType::Created);
}

#[test]
fn summary_lists_changed_keys_of_new_state() {
    let prev = state(json!({"open": "Open", "hall": "Seattle", "rate": 40, "crew": 3}));
    let new = state(json!({"open": "Open", "hall": "Tacoma", "rate": 40, "notes": null}));

    let summary = changes_summary(ActionType::Updated, Some(&prev), &new);
    assert_eq!(
        summary,
        r#"hall: "Seattle" → "Tacoma", notes: "N/A" → "N/A""#
    );
}

#[test]
fn summary_fixed_sentences_and_no_changes() {
    let s = state(json!({"open": "Open"}));
    assert_eq!(changes_summary(ActionType::Created, None, &s), "Job was created");
    assert_eq!(changes_summary(ActionType::Filled, Some(&s), &s), "Job was filled");
    assert_eq!(changes_summary(ActionType::Archived, Some(&s), &s), "Job was archived");
    assert_eq!(
        changes_summary(ActionType::Updated, Some(&s), &s),
        "No changes detected"
    );
}

#[test]
fn username_from_profile_or_raw_id() {
    let profile = ChangedBy::Profile(UserProfile {
        id: Some(json!(Uuid::nil())),
        username: Some("bosun_kim".into()),
    });
    assert_eq!(resolve_username(Some(&profile)), "bosun_kim");

    let nameless = ChangedBy::Profile(UserProfile {
        id: Some(json!(Uuid::nil())),
        username: None,
    });
    assert_eq!(resolve_username(Some(&nameless)), "Unknown User");

    assert_eq!(
        resolve_username(Some(&ChangedBy::Id(json!("user-77")))),
        "user-77"
    );
    assert_eq!(resolve_username(Some(&ChangedBy::Id(json!(77)))), "77");
    assert_eq!(resolve_username(None), "Unknown User");
}

#[test]
fn changed_by_deserializes_both_shapes() {
    let joined: ChangedBy = serde_json::from_value(json!({"username": "deckhand"})).unwrap();
    assert_eq!(resolve_username(Some(&joined)), "deckhand");

    let raw: ChangedBy = serde_json::from_value(json!("5c4f")).unwrap();
    assert_eq!(raw, ChangedBy::Id(json!("5c4f")));
}

#[test]
fn profile_with_non_uuid_id_still_yields_username() {
    let joined: ChangedBy =
        serde_json::from_value(json!({"id": 17, "username": "bosun"})).unwrap();
    assert_eq!(resolve_username(Some(&joined)), "bosun");

    let nameless: ChangedBy = serde_json::from_value(json!({"id": 17})).unwrap();
    assert_eq!(resolve_username(Some(&nameless)), "Unknown User");

    // username of the wrong type is not shown as raw JSON
    let odd = ChangedBy::Id(json!({"id": 17, "username": 5}));
    assert_eq!(resolve_username(Some(&odd)), "Unknown User");
}

#[test]
fn array_snapshot_reads_as_creation() {
    assert_eq!(format_state(&json!("[]")), None);

    let raw = record(
        Uuid::new_v4(),
        at(7, 15),
        json!(r#"[{"open": "Open"}]"#),
        json!({"open": "Filled"}),
    );
    let f = format_job_history_record(&raw);
    assert!(f.previous_state.is_none());
    assert_eq!(f.action_type, ActionType::Created);
}

#[test]
fn date_and_time_parts() {
    let ts = chrono::Utc.with_ymd_and_hms(2025, 1, 5, 17, 4, 9).unwrap();

    let utc = format_date(ts, &Tz::UTC);
    assert_eq!(utc.date, "1/5/2025");
    assert_eq!(utc.time, "5:04:09 PM");

    let seattle = format_date(ts, &Tz::America__Los_Angeles);
    assert_eq!(seattle.date, "1/5/2025");
    assert_eq!(seattle.time, "9:04:09 AM");
}

#[test]
fn formats_a_full_record() {
    let job_id = Uuid::new_v4();
    let mut raw = record(
        job_id,
        at(8, 30),
        json!(r#"{"open": "Open", "archivedJob": false, "hall": "Seattle"}"#),
        json!({"open": "Filled", "archivedJob": false, "hall": "Seattle"}),
    );
    raw.changed_by_user_id = Some(ChangedBy::Profile(UserProfile {
        id: None,
        username: Some("dispatcher1".into()),
    }));

    let f = format_job_history_record(&raw);
    assert_eq!(f.id, raw.id);
    assert_eq!(f.job_id, job_id);
    assert_eq!(f.action_type, ActionType::Filled);
    assert_eq!(f.changes_summary, "Job was filled");
    assert_eq!(f.username, "dispatcher1");
    assert_eq!(f.date, "3/14/2025");
    assert_eq!(f.time, "8:30:00 AM");
    assert_eq!(f.previous_state.unwrap().status(), Some("Open"));
}

#[test]
fn malformed_previous_state_reads_as_creation() {
    let raw = record(
        Uuid::new_v4(),
        at(12, 0),
        json!("{oops"),
        json!({"open": "Open"}),
    );

    let f = HistoryFormatter::new(Tz::UTC).format(&raw);
    assert!(f.previous_state.is_none());
    assert_eq!(f.action_type, ActionType::Created);
    assert_eq!(f.changes_summary, "Job was created");
    assert_eq!(f.time, "12:00:00 PM");
}
