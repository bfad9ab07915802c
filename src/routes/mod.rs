pub mod api;
pub mod sse;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Topology
        .route("/api/v1/topology", get(api::handle_get_topology))
        .route("/api/v1/topology/refresh", post(api::handle_refresh))
        .route("/api/v1/topology/events", get(sse::handle_topology_events))
        .route(
            "/api/v1/topology/clusters/{name}/nodes",
            get(api::handle_get_cluster_nodes),
        )
        // Selection and detail panel
        .route(
            "/api/v1/topology/selection",
            get(api::handle_get_selection).post(api::handle_node_clicked),
        )
        .route("/api/v1/topology/panel/close", post(api::handle_panel_close))
        .route("/api/v1/topology/panel/width", put(api::handle_panel_resize))
        .route("/api/v1/topology/detail", get(api::handle_get_detail))
        // Icons
        .route("/api/v1/icons", get(api::handle_icon_manifest))
        .route("/icons/{kind}", get(api::handle_get_icon))
        // Health
        .route("/healthz", get(api::handle_healthz))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
