//! REST API handlers for the operations dashboard
//!
//! These handlers use the shared DashboardService.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::service::DashboardService;
use crate::dashboard::{DashboardView, ScopeOption};
use crate::display::{format_budget_ratio, format_optional, format_value};
use crate::drilldown::{DrillDownView, DrilldownData, ResultTab, Stage};
use crate::error::DashboardError;
use crate::models::{
    ComparisonPolicy, MetricRecord, MetricUnit, OperationalGroup, PerformanceTag, Role, Scope,
    UnitMetric,
};
use crate::search::RecentSearch;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiCardResponse {
    pub id: String,
    pub name: String,
    pub value: f64,
    pub display_value: String,
    pub target: String,
    pub budget: String,
    pub unit: MetricUnit,
    pub performance_tag: PerformanceTag,
    /// Kept the aggregate because the scoped region has no figure
    pub no_regional_data: bool,
}

impl KpiCardResponse {
    fn from_record(k: MetricRecord, fallbacks: &[String]) -> Self {
        Self {
            no_regional_data: fallbacks.contains(&k.id),
            display_value: format_value(k.value, k.unit),
            target: format_optional(k.target, k.unit),
            budget: format_optional(k.budget, k.unit),
            id: k.id,
            name: k.name,
            value: (k.value * 100.0).round() / 100.0,
            unit: k.unit,
            performance_tag: k.performance_tag,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiGroupResponse {
    pub id: String,
    pub title: String,
    pub comparison_policy: ComparisonPolicy,
    pub kpis: Vec<KpiCardResponse>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub role: Role,
    pub scope: Scope,
    pub show_scope_selector: bool,
    pub scope_options: Vec<ScopeOption>,
    pub search_term: String,
    pub groups: Vec<KpiGroupResponse>,
    pub generated_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl From<DashboardView> for DashboardResponse {
    fn from(v: DashboardView) -> Self {
        let fallbacks = v.fallbacks;
        Self {
            show_scope_selector: v.role.shows_scope_selector(),
            role: v.role,
            scope: v.scope,
            scope_options: v.scope_options,
            search_term: v.search_term,
            groups: v
                .groups
                .into_iter()
                .map(|g| KpiGroupResponse {
                    id: g.id,
                    title: g.title,
                    comparison_policy: g.comparison_policy,
                    kpis: g
                        .kpis
                        .into_iter()
                        .map(|k| KpiCardResponse::from_record(k, &fallbacks))
                        .collect(),
                })
                .collect(),
            generated_at: v.generated_at,
            last_error: v.last_error,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRowResponse {
    pub id: String,
    pub name: String,
    pub value: f64,
    pub display_value: String,
    pub budget_ratio: String,
}

impl UnitRowResponse {
    fn from_row(row: &UnitMetric, unit: MetricUnit) -> Self {
        Self {
            id: row.unit.id.clone(),
            name: row.unit.name.clone(),
            value: (row.value * 100.0).round() / 100.0,
            display_value: format_value(row.value, unit),
            budget_ratio: format_budget_ratio(row),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrilldownResponse {
    pub view: DrillDownView,
    pub stage: Stage,
    pub kpi_name: String,
    pub top: Vec<UnitRowResponse>,
    pub worst: Vec<UnitRowResponse>,
    pub rows: Vec<UnitRowResponse>,
}

impl DrilldownResponse {
    fn new(data: DrilldownData, unit: MetricUnit) -> Self {
        let convert = |rows: &[UnitMetric]| -> Vec<UnitRowResponse> {
            rows.iter().map(|r| UnitRowResponse::from_row(r, unit)).collect()
        };
        Self {
            top: convert(&data.ranking.top),
            worst: convert(&data.ranking.worst),
            rows: convert(&data.rows),
            view: data.view,
            stage: data.stage,
            kpi_name: data.kpi_name,
        }
    }
}

#[derive(Serialize)]
pub struct ClosedResponse {
    pub stage: Stage,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Request Bodies
// ============================================================================

#[derive(Deserialize)]
pub struct SearchRequest {
    pub term: String,
}

#[derive(Deserialize)]
pub struct TabRequest {
    pub tab: ResultTab,
}

// ============================================================================
// Handlers
// ============================================================================

pub type AppState = Arc<DashboardService>;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(e: DashboardError) -> ApiError {
    let status = match &e {
        DashboardError::NoSnapshot => StatusCode::SERVICE_UNAVAILABLE,
        DashboardError::UnknownKpi(_) | DashboardError::UnknownUnit(_) => StatusCode::NOT_FOUND,
        DashboardError::DrilldownClosed | DashboardError::InvalidTransition { .. } => {
            StatusCode::CONFLICT
        }
        DashboardError::Fetch(_) => StatusCode::BAD_GATEWAY,
        DashboardError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse { error: e.to_string() }))
}

/// Unit of the KPI a drill-down is showing, for value formatting
async fn kpi_unit(service: &DashboardService, kpi_id: &str) -> MetricUnit {
    let session = service.session();
    let session = session.read().await;
    session
        .snapshot()
        .and_then(|s| s.find_kpi(kpi_id).map(|(_, k)| k.unit))
        .unwrap_or(MetricUnit::Count)
}

async fn drilldown_json(
    service: &DashboardService,
    data: Option<DrilldownData>,
) -> axum::response::Response {
    match data {
        Some(data) => {
            let unit = kpi_unit(service, &data.view.kpi_id).await;
            Json(DrilldownResponse::new(data, unit)).into_response()
        }
        None => Json(ClosedResponse { stage: Stage::Closed }).into_response(),
    }
}

/// GET /api/v1/health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// GET /api/v1/dashboard
pub async fn get_dashboard(State(service): State<AppState>) -> Json<DashboardResponse> {
    Json(DashboardResponse::from(service.view().await))
}

/// GET /api/v1/operational
pub async fn get_operational(State(service): State<AppState>) -> Json<Vec<OperationalGroup>> {
    Json(service.operational().await)
}

/// PUT /api/v1/scope
pub async fn put_scope(
    State(service): State<AppState>,
    Json(scope): Json<Scope>,
) -> Result<Json<DashboardResponse>, ApiError> {
    match service.set_scope(scope).await {
        Ok(view) => Ok(Json(DashboardResponse::from(view))),
        Err(e) => Err(api_error(e)),
    }
}

/// PUT /api/v1/role
pub async fn put_role(
    State(service): State<AppState>,
    Json(role): Json<Role>,
) -> Json<DashboardResponse> {
    Json(DashboardResponse::from(service.set_role(role).await))
}

/// PUT /api/v1/search
pub async fn put_search(
    State(service): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> StatusCode {
    service.search(req.term);
    StatusCode::ACCEPTED
}

/// GET /api/v1/search/recent
pub async fn get_recent_searches(State(service): State<AppState>) -> Json<Vec<RecentSearch>> {
    Json(service.recent_searches().await)
}

/// DELETE /api/v1/search/recent
pub async fn delete_recent_searches(
    State(service): State<AppState>,
) -> Result<StatusCode, ApiError> {
    match service.clear_recent_searches().await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(api_error(e)),
    }
}

/// POST /api/v1/refresh
pub async fn post_refresh(State(service): State<AppState>) -> Json<DashboardResponse> {
    Json(DashboardResponse::from(service.refresh().await))
}

/// POST /api/v1/reload
pub async fn post_reload(
    State(service): State<AppState>,
) -> Result<Json<DashboardResponse>, ApiError> {
    match service.reload().await {
        Ok(view) => Ok(Json(DashboardResponse::from(view))),
        Err(e) => Err(api_error(e)),
    }
}

/// GET /api/v1/drilldown
pub async fn get_drilldown(
    State(service): State<AppState>,
) -> Result<axum::response::Response, ApiError> {
    match service.drilldown().await {
        Ok(data) => Ok(drilldown_json(&service, data).await),
        Err(e) => Err(api_error(e)),
    }
}

/// POST /api/v1/drilldown/open/:kpi_id
pub async fn open_drilldown(
    State(service): State<AppState>,
    Path(kpi_id): Path<String>,
) -> Result<axum::response::Response, ApiError> {
    match service.open_drilldown(&kpi_id).await {
        Ok(data) => Ok(drilldown_json(&service, Some(data)).await),
        Err(e) => Err(api_error(e)),
    }
}

/// POST /api/v1/drilldown/region/:region_id
pub async fn select_region(
    State(service): State<AppState>,
    Path(region_id): Path<String>,
) -> Result<axum::response::Response, ApiError> {
    match service.select_region(&region_id).await {
        Ok(data) => Ok(drilldown_json(&service, Some(data)).await),
        Err(e) => Err(api_error(e)),
    }
}

/// POST /api/v1/drilldown/back
pub async fn drilldown_back(
    State(service): State<AppState>,
) -> Result<axum::response::Response, ApiError> {
    match service.back().await {
        Ok(data) => Ok(drilldown_json(&service, data).await),
        Err(e) => Err(api_error(e)),
    }
}

/// PUT /api/v1/drilldown/tab
pub async fn put_tab(
    State(service): State<AppState>,
    Json(req): Json<TabRequest>,
) -> Result<axum::response::Response, ApiError> {
    match service.set_tab(req.tab).await {
        Ok(data) => Ok(drilldown_json(&service, data).await),
        Err(e) => Err(api_error(e)),
    }
}

/// DELETE /api/v1/drilldown
pub async fn close_drilldown(State(service): State<AppState>) -> StatusCode {
    service.close_drilldown().await;
    StatusCode::NO_CONTENT
}
