use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::api::state::AppState;
use crate::api::{json_response, required, ApiError};
use crate::service::ServiceCacheStats;

#[derive(Debug, Deserialize)]
pub struct FormatsParams {
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UsageParams {
    pub period: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DetailParams {
    pub period: Option<String>,
    pub format: Option<String>,
    pub name: Option<String>,
}

pub async fn list_periods(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.service.periods().await?))
}

pub async fn list_formats(
    State(state): State<AppState>,
    Query(params): Query<FormatsParams>,
) -> Result<Json<Vec<String>>, ApiError> {
    let period = params.period.unwrap_or_default();
    Ok(Json(state.service.formats(&period).await?))
}

pub async fn usage(
    State(state): State<AppState>,
    Query(params): Query<UsageParams>,
) -> Result<Response, ApiError> {
    let period = required(params.period, "period")?;
    let format = required(params.format, "format")?;

    let overview = state.service.get_overview(&period, &format).await?;
    json_response(overview.as_ref())
}

pub async fn details(
    State(state): State<AppState>,
    Query(params): Query<DetailParams>,
) -> Result<Response, ApiError> {
    let period = required(params.period, "period")?;
    let format = required(params.format, "format")?;
    let name = required(params.name, "name")?;

    let detail = state.service.get_detail(&period, &format, &name).await?;
    json_response(detail.as_ref())
}

pub async fn cache_stats(State(state): State<AppState>) -> Json<ServiceCacheStats> {
    Json(state.service.cache_stats().await)
}
