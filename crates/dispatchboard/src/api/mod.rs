use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::history::{
    build_job_history, changes_summary, classify_action, format_state, get_job_state_comparison,
    ActionType, FormattedRecord, HistoryFilter, HistoryFormatter, HistoryRecord, HistoryStore,
    JobHistory, StoreError,
};
use crate::permissions::{
    normalize_roles, tile_routes, visible_tiles, MatrixRow, PermissionTable, RoleInput, Tile,
};
use crate::users::UserDirectory;

use self::models::{
    CompareRequest, CompareResponse, HistoryQuery, MatrixQuery, PermissionQuery,
    PermissionResponse, TilesQuery,
};

pub mod models;

#[derive(Clone)]
pub struct ApiState {
    pub history: Arc<dyn HistoryStore>,
    pub users: Arc<dyn UserDirectory>,
    pub permissions: Arc<PermissionTable>,
    pub formatter: HistoryFormatter,
    pub page_limit: i64,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        // History
        .route("/history", get(list_history))
        .route("/history/format", post(format_record))
        .route("/history/compare", post(compare_states))
        .route("/jobs/:id/history", get(job_history))
        // Permissions
        .route("/permissions/check", get(check_permission))
        .route("/permissions/matrix", get(permission_matrix))
        .route("/permissions/tiles", get(dashboard_tiles))
        // Health
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn bad_request(msg: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody { error: msg.into() }),
    )
}

fn store_err(e: StoreError) -> ApiError {
    tracing::error!(error = %e, "history store failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: format!("internal error: {e}"),
        }),
    )
}

fn parse_action(action: Option<&str>) -> Result<Option<ActionType>, ApiError> {
    match action.map(str::trim).filter(|a| !a.is_empty()) {
        None => Ok(None),
        Some(a) => ActionType::parse(a)
            .map(Some)
            .ok_or_else(|| bad_request(format!("unknown action type: {a}"))),
    }
}

async fn load_history(
    state: &ApiState,
    filter: &HistoryFilter,
    action: Option<ActionType>,
) -> Result<Json<JobHistory>, ApiError> {
    let page = build_job_history(
        state.history.as_ref(),
        state.users.as_ref(),
        &state.formatter,
        filter,
        state.page_limit,
        action,
    )
    .await
    .map_err(store_err)?;

    Ok(Json(page))
}

pub async fn list_history(
    State(state): State<ApiState>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<JobHistory>, ApiError> {
    let action = parse_action(q.action.as_deref())?;
    load_history(&state, &q.filter(), action).await
}

pub async fn job_history(
    Path(id): Path<Uuid>,
    State(state): State<ApiState>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<JobHistory>, ApiError> {
    let action = parse_action(q.action.as_deref())?;
    let filter = HistoryFilter {
        job_id: Some(id),
        ..q.filter()
    };
    load_history(&state, &filter, action).await
}

pub async fn format_record(
    State(state): State<ApiState>,
    Json(record): Json<HistoryRecord>,
) -> Json<FormattedRecord> {
    Json(state.formatter.format(&record))
}

pub async fn compare_states(
    State(state): State<ApiState>,
    Json(body): Json<CompareRequest>,
) -> Json<CompareResponse> {
    let previous = format_state(&body.previous_state);
    let new = format_state(&body.new_state).unwrap_or_default();

    let action_type = classify_action(previous.as_ref(), &new);
    let summary = changes_summary(action_type, previous.as_ref(), &new);
    let changes = get_job_state_comparison(previous.as_ref(), &new, state.users.as_ref()).await;

    Json(CompareResponse {
        action_type,
        changes_summary: summary,
        changes,
    })
}

pub async fn check_permission(
    State(state): State<ApiState>,
    Query(q): Query<PermissionQuery>,
) -> Json<PermissionResponse> {
    let role = q.role.as_deref().map(RoleInput::from_csv);
    let roles = normalize_roles(role.as_ref());
    let allowed = state.permissions.roles_allow(&roles, &q.path);

    Json(PermissionResponse {
        roles,
        path: q.path,
        allowed,
    })
}

pub async fn permission_matrix(
    State(state): State<ApiState>,
    Query(q): Query<MatrixQuery>,
) -> Json<Vec<MatrixRow>> {
    let routes: Vec<String> = match q.routes.as_deref() {
        Some(csv) if !csv.trim().is_empty() => csv
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect(),
        _ => tile_routes(),
    };

    Json(state.permissions.matrix(&routes))
}

pub async fn dashboard_tiles(
    State(state): State<ApiState>,
    Query(q): Query<TilesQuery>,
) -> Json<Vec<Tile>> {
    let role = q.role.as_deref().map(RoleInput::from_csv);
    Json(visible_tiles(&state.permissions, role.as_ref()))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
