use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use super::matcher::pattern_matches;

pub const GUEST_ROLE: &str = "guest";

const BUILTIN: &[(&str, &[&str])] = &[
    ("admin", &["*"]),
    (
        "dispatch",
        &[
            "/",
            "/dashboard",
            "/board",
            "/jobs",
            "/jobs/*",
            "/history",
            "/history/*",
            "/profile",
            "/login",
        ],
    ),
    (
        "minor",
        &[
            "/",
            "/dashboard",
            "/board",
            "/jobs",
            "/jobs/*",
            "/history",
            "/history/*",
            "/profile",
            "/login",
        ],
    ),
    (
        "display",
        &["/", "/board", "/display", "/display/*", "/kiosk-*", "/login"],
    ),
    (
        GUEST_ROLE,
        &["/login", "/signup", "/forgot-password", "/reset-password"],
    ),
];

static BUILTIN_TABLE: LazyLock<PermissionTable> = LazyLock::new(|| PermissionTable {
    roles: BUILTIN
        .iter()
        .map(|(role, patterns)| {
            (
                role.to_string(),
                patterns.iter().map(|p| p.to_string()).collect(),
            )
        })
        .collect(),
});

/// A role name, or several. Deserializes from a string or an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleInput {
    One(String),
    Many(Vec<String>),
}

impl RoleInput {
    /// Comma-separated list, as used in query strings.
    pub fn from_csv(s: &str) -> Self {
        if s.contains(',') {
            Self::Many(s.split(',').map(str::to_string).collect())
        } else {
            Self::One(s.to_string())
        }
    }
}

impl From<&str> for RoleInput {
    fn from(s: &str) -> Self {
        Self::One(s.to_string())
    }
}

impl From<Vec<String>> for RoleInput {
    fn from(v: Vec<String>) -> Self {
        Self::Many(v)
    }
}

/// Lowercased, trimmed role names. A missing or empty role is `guest`.
pub fn normalize_roles(role: Option<&RoleInput>) -> Vec<String> {
    match role {
        None => vec![GUEST_ROLE.to_string()],
        Some(RoleInput::One(r)) if r.is_empty() => vec![GUEST_ROLE.to_string()],
        Some(RoleInput::One(r)) => vec![r.trim().to_lowercase()],
        Some(RoleInput::Many(rs)) => rs.iter().map(|r| r.trim().to_lowercase()).collect(),
    }
}

/// Role -> allowed route patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionTable {
    roles: BTreeMap<String, Vec<String>>,
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

impl PermissionTable {
    pub fn builtin() -> &'static PermissionTable {
        &BUILTIN_TABLE
    }

    /// Builds a table, lowercasing role names. A `guest` entry is required
    /// since unknown roles fall back to it.
    pub fn from_roles(roles: BTreeMap<String, Vec<String>>) -> anyhow::Result<Self> {
        let roles: BTreeMap<String, Vec<String>> = roles
            .into_iter()
            .map(|(role, patterns)| (role.trim().to_lowercase(), patterns))
            .collect();

        if !roles.contains_key(GUEST_ROLE) {
            anyhow::bail!("permission table has no `{GUEST_ROLE}` role");
        }
        Ok(Self { roles })
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let roles: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;
        Self::from_roles(roles)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading permissions file {}: {e}", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    /// Patterns for a role; unknown roles get `guest`'s.
    pub fn patterns_for(&self, role: &str) -> &[String] {
        self.roles
            .get(role)
            .or_else(|| self.roles.get(GUEST_ROLE))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_route_allowed(&self, role: Option<&RoleInput>, path: &str) -> bool {
        self.roles_allow(&normalize_roles(role), path)
    }

    /// Like [`Self::is_route_allowed`] for already-normalized roles.
    pub fn roles_allow(&self, roles: &[String], path: &str) -> bool {
        roles.iter().any(|role| {
            self.patterns_for(role)
                .iter()
                .any(|pattern| pattern_matches(pattern, path))
        })
    }

    /// Allowed flag for every (role, route) pair.
    pub fn matrix(&self, routes: &[String]) -> Vec<MatrixRow> {
        self.roles
            .keys()
            .map(|role| MatrixRow {
                role: role.clone(),
                routes: routes
                    .iter()
                    .map(|route| RouteAccess {
                        route: route.clone(),
                        allowed: self.roles_allow(std::slice::from_ref(role), route),
                    })
                    .collect(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixRow {
    pub role: String,
    pub routes: Vec<RouteAccess>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteAccess {
    pub route: String,
    pub allowed: bool,
}

/// Checks against the built-in table.
pub fn is_route_allowed(role: Option<&RoleInput>, path: &str) -> bool {
    PermissionTable::builtin().is_route_allowed(role, path)
}
