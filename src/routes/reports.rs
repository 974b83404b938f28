use axum::{
    Json,
    extract::{Query, State},
};

use crate::AppState;
use crate::error::AppResult;
use crate::pipeline::{ReportRequest, ReportResponse};

pub async fn generate_from_query(
    State(state): State<AppState>,
    Query(request): Query<ReportRequest>,
) -> AppResult<Json<ReportResponse>> {
    let response = state.orchestrator.handle(&request).await?;
    Ok(Json(response))
}

pub async fn generate_from_body(
    State(state): State<AppState>,
    Json(request): Json<ReportRequest>,
) -> AppResult<Json<ReportResponse>> {
    let response = state.orchestrator.handle(&request).await?;
    Ok(Json(response))
}
