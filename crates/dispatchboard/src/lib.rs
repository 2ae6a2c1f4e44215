pub mod api;
pub mod config;
pub mod db;
pub mod history;
pub mod observability;
pub mod permissions;
pub mod users;
