use std::collections::HashMap;

use futures::future::join_all;
use serde_json::Value;

use crate::history::model::{
    is_author_field, is_identifier_field, values_equal, ChangeType, FieldChange, JobState,
};
use crate::users::{resolve_user_id_to_username, UserDirectory};

/// Field-level changes between two snapshots, in key order (previous
/// state's keys first, then keys only in the new state).
///
/// A missing previous state means the job was created: every field of
/// `new` is reported as added. Identifier fields (`claimedBy`,
/// `FillUser`) are resolved to usernames before comparing; all lookups
/// for one call are issued together.
pub async fn get_job_state_comparison(
    previous: Option<&JobState>,
    new: &JobState,
    directory: &dyn UserDirectory,
) -> Vec<FieldChange> {
    let Some(previous) = previous else {
        return new
            .iter()
            .map(|(key, value)| FieldChange {
                field: key.clone(),
                old_value: Value::Null,
                new_value: value.clone(),
                change_type: ChangeType::Added,
            })
            .collect();
    };

    let keys = union_keys(previous, new);

    let lookups = keys
        .iter()
        .copied()
        .filter(|key| is_identifier_field(key))
        .filter(|key| has_identifier(previous.get(key)) || has_identifier(new.get(key)))
        .map(|key| async move {
            let sides = futures::join!(
                resolve_side(previous.get(key), directory),
                resolve_side(new.get(key), directory),
            );
            (key, sides)
        });
    let mut resolved: HashMap<&str, (Option<Value>, Option<Value>)> =
        join_all(lookups).await.into_iter().collect();

    let mut changes = Vec::new();
    for key in keys {
        let (old_side, new_side) = resolved
            .remove(key)
            .unwrap_or_else(|| (previous.get(key).cloned(), new.get(key).cloned()));

        // a missing key never equals an explicit null
        let unchanged = match (&old_side, &new_side) {
            (Some(old), Some(new)) => values_equal(old, new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            continue;
        }

        let old_value = old_side.unwrap_or(Value::Null);
        let new_value = new_side.unwrap_or(Value::Null);

        let change_type = ChangeType::classify(&old_value, &new_value);
        changes.push(FieldChange {
            field: key.to_string(),
            old_value,
            new_value,
            change_type,
        });
    }

    changes
}

fn union_keys<'a>(previous: &'a JobState, new: &'a JobState) -> Vec<&'a str> {
    previous
        .keys()
        .chain(new.keys().filter(|k| !previous.contains_key(k)))
        .map(String::as_str)
        .filter(|k| !is_author_field(k))
        .collect()
}

fn has_identifier(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

async fn resolve_side(value: Option<&Value>, directory: &dyn UserDirectory) -> Option<Value> {
    let value = value?;
    if !has_identifier(Some(value)) {
        return Some(value.clone());
    }

    let id = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Some(Value::String(
        resolve_user_id_to_username(directory, &id).await,
    ))
}
