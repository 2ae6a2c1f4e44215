use serde::Serialize;

use super::table::{PermissionTable, RoleInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tile {
    pub id: &'static str,
    pub title: &'static str,
    pub route: &'static str,
}

pub const DASHBOARD_TILES: &[Tile] = &[
    Tile {
        id: "job-board",
        title: "Job Board",
        route: "/board",
    },
    Tile {
        id: "post-job",
        title: "Post a Job",
        route: "/jobs/new",
    },
    Tile {
        id: "job-history",
        title: "Job History",
        route: "/history",
    },
    Tile {
        id: "display",
        title: "Hall Display",
        route: "/display/hall",
    },
    Tile {
        id: "users",
        title: "Manage Users",
        route: "/admin/users",
    },
    Tile {
        id: "permissions",
        title: "Role Permissions",
        route: "/admin/permissions",
    },
];

/// Dashboard tiles whose route the role may open, in dashboard order.
pub fn visible_tiles(table: &PermissionTable, role: Option<&RoleInput>) -> Vec<Tile> {
    DASHBOARD_TILES
        .iter()
        .filter(|tile| table.is_route_allowed(role, tile.route))
        .copied()
        .collect()
}

pub fn tile_routes() -> Vec<String> {
    DASHBOARD_TILES.iter().map(|t| t.route.to_string()).collect()
}
