use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::{
    Clock, InvalidTaskError, Market, MarketFilter, MarketSortKey, MarketStatus, MarketTaskCounts,
    MarketType, RefreshSummary, Register, RegisterError, Severity, SortDirection, Task,
    TaskStatistics, TaskStatus, VarianceResult, compute_variance, derive_market_status,
    effective_status,
};

#[derive(Clone)]
pub struct AppState {
    register: Arc<RwLock<Register>>,
    clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(register: Register, clock: Arc<dyn Clock>) -> Self {
        Self {
            register: Arc::new(RwLock::new(register)),
            clock,
        }
    }

    fn register(&self) -> Arc<RwLock<Register>> {
        self.register.clone()
    }

    fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    InvalidTask(InvalidTaskError),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<RegisterError> for ApiError {
    fn from(value: RegisterError) -> Self {
        match value {
            RegisterError::MarketNotFound(_) | RegisterError::TaskNotFound(_) => {
                ApiError::NotFound(value.to_string())
            }
            RegisterError::UnknownMarket { .. }
            | RegisterError::Validation(_)
            | RegisterError::InvalidMarket(_) => ApiError::Invalid(value.to_string()),
        }
    }
}

impl From<InvalidTaskError> for ApiError {
    fn from(value: InvalidTaskError) -> Self {
        ApiError::InvalidTask(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::InvalidTask(err) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_task", err.to_string())
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarketStatusView {
    pub market_ref: String,
    pub status: MarketStatus,
    pub counts: MarketTaskCounts,
    pub last_task_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VarianceView {
    pub task_id: String,
    pub today: NaiveDate,
    #[serde(flatten)]
    pub variance: VarianceResult,
    pub severity: Severity,
    pub progress_indicator: u8,
    pub effective_status: TaskStatus,
}

#[derive(Debug, Deserialize)]
struct TodayQuery {
    today: Option<String>,
}

impl TodayQuery {
    fn resolve(&self, state: &AppState) -> Result<NaiveDate, ApiError> {
        match self.today.as_deref() {
            Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map_err(|_| ApiError::invalid(format!("invalid date '{raw}' (expected YYYY-MM-DD)"))),
            None => Ok(state.today()),
        }
    }
}

/// `GET /markets?coordination=UCP&status=IN_PROGRESS&market_type=works&sort=title&order=desc`
#[derive(Debug, Default, Deserialize)]
struct MarketQuery {
    coordination: Option<String>,
    status: Option<String>,
    market_type: Option<String>,
    sort: Option<String>,
    order: Option<String>,
}

impl MarketQuery {
    fn into_filter(self) -> Result<MarketFilter, ApiError> {
        let mut filter = MarketFilter::new();
        if let Some(coordination) = self.coordination.filter(|c| !c.trim().is_empty()) {
            filter = filter.coordination(coordination);
        }
        if let Some(status) = self.status.as_deref() {
            filter = filter.status(MarketStatus::parse_lenient(status));
        }
        if let Some(raw) = self.market_type.as_deref() {
            let kind = MarketType::parse_lenient(raw)
                .ok_or_else(|| ApiError::invalid(format!("unknown market type '{raw}'")))?;
            filter = filter.market_type(kind);
        }
        let direction = match self.order.as_deref() {
            Some(raw) => SortDirection::parse_lenient(raw)
                .ok_or_else(|| ApiError::invalid(format!("invalid order '{raw}' (asc|desc)")))?,
            None => SortDirection::Asc,
        };
        if let Some(raw) = self.sort.as_deref() {
            let key = MarketSortKey::parse_lenient(raw)
                .ok_or_else(|| ApiError::invalid(format!("unknown sort column '{raw}'")))?;
            filter = filter.sort(key, direction);
        }
        Ok(filter)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/markets", get(list_markets).post(create_market))
        .route("/markets/:market_ref", get(get_market))
        .route("/markets/:market_ref/status", get(market_status))
        .route("/markets/:market_ref/tasks", get(market_tasks))
        .route("/tasks", post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/:id/start", post(start_task))
        .route("/tasks/:id/complete", post(complete_task))
        .route("/tasks/:id/variance", get(task_variance))
        .route("/stats", get(stats))
        .route("/refresh", post(refresh_statuses))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http api listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_markets(
    State(state): State<AppState>,
    Query(query): Query<MarketQuery>,
) -> Result<Json<Vec<Market>>, ApiError> {
    let filter = query.into_filter()?;
    let register = state.register();
    let guard = register.read();
    let markets = filter
        .apply(guard.markets(), guard.tasks())
        .into_iter()
        .map(|market| market.with_derived_status(guard.tasks()))
        .collect();
    Ok(Json(markets))
}

async fn create_market(
    State(state): State<AppState>,
    Json(market): Json<Market>,
) -> Result<(StatusCode, Json<Market>), ApiError> {
    if market.market_ref.trim().is_empty() {
        return Err(ApiError::invalid("market_ref must not be empty"));
    }
    let register = state.register();
    let mut guard = register.write();
    if guard.find_market(&market.market_ref).is_some() {
        return Err(ApiError::Conflict(format!(
            "market {} already exists",
            market.market_ref
        )));
    }
    let created = market.with_derived_status(guard.tasks());
    guard.upsert_market(created.clone())?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_market(
    State(state): State<AppState>,
    Path(market_ref): Path<String>,
) -> Result<Json<Market>, ApiError> {
    let register = state.register();
    let guard = register.read();
    guard
        .find_market(&market_ref)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("market {market_ref} not found")))
}

async fn market_status(
    State(state): State<AppState>,
    Path(market_ref): Path<String>,
) -> Result<Json<MarketStatusView>, ApiError> {
    let register = state.register();
    let guard = register.read();
    if guard.find_market(&market_ref).is_none() {
        return Err(ApiError::not_found(format!("market {market_ref} not found")));
    }
    Ok(Json(MarketStatusView {
        status: derive_market_status(&market_ref, guard.tasks()),
        counts: guard.market_counts(&market_ref),
        last_task_id: guard.last_task_added(&market_ref).map(|t| t.id.clone()),
        market_ref,
    }))
}

async fn market_tasks(
    State(state): State<AppState>,
    Path(market_ref): Path<String>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let register = state.register();
    let guard = register.read();
    if guard.find_market(&market_ref).is_none() {
        return Err(ApiError::not_found(format!("market {market_ref} not found")));
    }
    let tasks = guard.tasks_for_market(&market_ref).into_iter().cloned().collect();
    Ok(Json(tasks))
}

async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let register = state.register();
    let guard = register.read();
    guard
        .find_task(&task_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("task {task_id} not found")))
}

async fn create_task(
    State(state): State<AppState>,
    Json(task): Json<Task>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let register = state.register();
    let mut guard = register.write();
    if guard.find_task(&task.id).is_some() {
        return Err(ApiError::Conflict(format!("task {} already exists", task.id)));
    }
    let task_id = task.id.clone();
    guard.upsert_task(task)?;
    let created = guard
        .find_task(&task_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found(format!("task {task_id} not found after creation")))?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Json(task): Json<Task>,
) -> Result<Json<Task>, ApiError> {
    if task.id != task_id {
        return Err(ApiError::invalid(
            "task id in payload does not match path parameter",
        ));
    }
    let register = state.register();
    let mut guard = register.write();
    if guard.find_task(&task_id).is_none() {
        return Err(ApiError::not_found(format!("task {task_id} not found")));
    }
    let updated = guard.update_task(&task_id, |existing| *existing = task)?;
    Ok(Json(updated.clone()))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let register = state.register();
    let removed = register.write().delete_task(&task_id);
    if !removed {
        return Err(ApiError::not_found(format!("task {task_id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn start_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let today = state.today();
    let register = state.register();
    let mut guard = register.write();
    let task = guard.start_task(&task_id, today)?;
    Ok(Json(task.clone()))
}

async fn complete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let today = state.today();
    let register = state.register();
    let mut guard = register.write();
    let task = guard.complete_task(&task_id, today)?;
    Ok(Json(task.clone()))
}

async fn task_variance(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Query(query): Query<TodayQuery>,
) -> Result<Json<VarianceView>, ApiError> {
    let today = query.resolve(&state)?;
    let task = {
        let register = state.register();
        let guard = register.read();
        guard
            .find_task(&task_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("task {task_id} not found")))?
    };
    let variance = compute_variance(&task, today)?;
    Ok(Json(VarianceView {
        task_id,
        today,
        severity: variance.severity(),
        progress_indicator: variance.progress_indicator(),
        effective_status: effective_status(&task, today),
        variance,
    }))
}

async fn stats(
    State(state): State<AppState>,
    Query(query): Query<TodayQuery>,
) -> Result<Json<TaskStatistics>, ApiError> {
    let today = query.resolve(&state)?;
    let register = state.register();
    let guard = register.read();
    Ok(Json(TaskStatistics::from_tasks(guard.tasks(), today)))
}

async fn refresh_statuses(State(state): State<AppState>) -> Json<RefreshSummary> {
    let register = state.register();
    let summary = register.write().refresh_market_statuses();
    Json(summary)
}
