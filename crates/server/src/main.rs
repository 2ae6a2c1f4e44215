use std::sync::Arc;
use std::time::Duration;

use dispatchboard::api;
use dispatchboard::config;
use dispatchboard::db;
use dispatchboard::history::{HistoryFormatter, PgHistoryRepo};
use dispatchboard::observability;
use dispatchboard::permissions::PermissionTable;
use dispatchboard::users::{PgUserDirectory, TimeoutDirectory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::Config::from_env()?;
    observability::init_tracing(&cfg);

    tracing::info!(
        admin_addr = %cfg.admin_addr,
        display_tz = cfg.display_tz.name(),
        history_page_limit = cfg.history_page_limit,
        lookup_timeout_ms = cfg.lookup_timeout_ms,
        permissions_file = cfg.permissions_file.as_deref().unwrap_or("builtin"),
        "dispatchboard starting"
    );

    let permissions = match &cfg.permissions_file {
        Some(path) => PermissionTable::from_json_file(path)?,
        None => PermissionTable::default(),
    };
    tracing::info!(roles = ?permissions.roles().collect::<Vec<_>>(), "permission table loaded");

    let pool = db::make_pool(&cfg.database_url).await?;

    let users = TimeoutDirectory::new(
        PgUserDirectory::new(pool.clone()),
        Duration::from_millis(cfg.lookup_timeout_ms),
    );

    let state = api::ApiState {
        history: Arc::new(PgHistoryRepo::new(pool.clone())),
        users: Arc::new(users),
        permissions: Arc::new(permissions),
        formatter: HistoryFormatter::new(cfg.display_tz),
        page_limit: cfg.history_page_limit,
    };
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.admin_addr).await?;
    tracing::info!("admin api listening on http://{}", cfg.admin_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("dispatchboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
