use std::sync::Arc;

use super::table::{normalize_roles, PermissionTable, RoleInput};

/// Memoized permission check for a view that re-renders often.
///
/// The answer is a pure function of the normalized roles and the path; the
/// last pair and its answer are kept so unchanged inputs skip matching.
#[derive(Debug, Clone)]
pub struct PermissionSelector {
    table: Arc<PermissionTable>,
    last: Option<(Vec<String>, String, bool)>,
}

impl PermissionSelector {
    pub fn new(table: Arc<PermissionTable>) -> Self {
        Self { table, last: None }
    }

    /// `path` defaults to `location` (the current navigation path).
    pub fn use_permission(
        &mut self,
        role: Option<&RoleInput>,
        path: Option<&str>,
        location: &str,
    ) -> bool {
        let roles = normalize_roles(role);
        let path = path.unwrap_or(location);

        if let Some((last_roles, last_path, allowed)) = &self.last {
            if *last_roles == roles && last_path == path {
                return *allowed;
            }
        }

        let allowed = self.table.roles_allow(&roles, path);
        self.last = Some((roles, path.to_string(), allowed));
        allowed
    }

    /// Whether the next call with these inputs would be answered from memo.
    pub fn is_memoized(&self, role: Option<&RoleInput>, path: &str) -> bool {
        let roles = normalize_roles(role);
        matches!(&self.last, Some((r, p, _)) if *r == roles && p == path)
    }
}
