use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::AppState;
use crate::error::ApiError;
use crate::models::k8s::WorkerNodeDetail;
use crate::topology::cache::CacheState;
use crate::topology::detail::DetailSummary;
use crate::topology::icons::{Icon, IconKind, IconRef};
use crate::topology::selection::Selection;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNodesResponse {
    pub cluster_name: String,
    pub state: Option<CacheState>,
    pub nodes: Vec<WorkerNodeDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ClickRequest {
    pub identifier: String,
}

#[derive(Debug, Deserialize)]
pub struct ResizeRequest {
    pub width: f64,
}

pub async fn handle_get_topology(State(state): State<AppState>) -> Response {
    match state.aggregator.get_tree() {
        Some(tree) => Json(&*tree).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "topology not loaded yet\n").into_response(),
    }
}

pub async fn handle_refresh(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.aggregator.refresh_snapshot().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Cached nodes for one cluster. Never triggers a fetch.
pub async fn handle_get_cluster_nodes(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<ClusterNodesResponse> {
    let cache = state.aggregator.cache();
    Json(ClusterNodesResponse {
        state: cache.state(&name),
        nodes: cache.get_nodes(&name),
        cluster_name: name,
    })
}

pub async fn handle_get_selection(State(state): State<AppState>) -> Json<Selection> {
    Json(state.aggregator.selection())
}

pub async fn handle_node_clicked(
    State(state): State<AppState>,
    Json(req): Json<ClickRequest>,
) -> Result<Json<Selection>, ApiError> {
    if req.identifier.trim().is_empty() {
        return Err(ApiError::BadRequest("identifier must not be empty".to_string()));
    }
    Ok(Json(state.aggregator.on_node_clicked(&req.identifier)))
}

pub async fn handle_panel_close(State(state): State<AppState>) -> Json<Selection> {
    Json(state.aggregator.on_panel_close())
}

pub async fn handle_panel_resize(
    State(state): State<AppState>,
    Json(req): Json<ResizeRequest>,
) -> Result<Json<Selection>, ApiError> {
    if !req.width.is_finite() {
        return Err(ApiError::BadRequest("width must be a number".to_string()));
    }
    Ok(Json(state.aggregator.on_panel_resize(req.width.round() as i64)))
}

pub async fn handle_get_detail(State(state): State<AppState>) -> Json<Option<DetailSummary>> {
    Json(state.aggregator.get_detail_summary())
}

pub async fn handle_icon_manifest(
    State(state): State<AppState>,
) -> Json<HashMap<IconKind, IconRef>> {
    Json(state.icons.manifest())
}

pub async fn handle_get_icon(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Response, ApiError> {
    let kind =
        IconKind::parse(&kind).ok_or_else(|| ApiError::NotFound(format!("icon {:?}", kind)))?;

    Ok(match state.icons.get(kind) {
        Icon::Image {
            content_type,
            bytes,
        } => ([(header::CONTENT_TYPE, content_type)], bytes).into_response(),
        Icon::Glyph(glyph) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string())],
            glyph,
        )
            .into_response(),
    })
}

pub async fn handle_healthz() -> &'static str {
    "ok\n"
}
