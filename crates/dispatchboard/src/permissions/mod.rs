pub mod matcher;
pub mod selector;
pub mod table;
pub mod tiles;

pub use matcher::pattern_matches;
pub use selector::PermissionSelector;
pub use table::{
    is_route_allowed, normalize_roles, MatrixRow, PermissionTable, RoleInput, RouteAccess,
    GUEST_ROLE,
};
pub use tiles::{tile_routes, visible_tiles, Tile, DASHBOARD_TILES};
