//! Database Routes
//!
//! - GET /database/info - Store kind and whether it answers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::{DatabaseInfo, HypermediaResource};
use crate::api::state::AppState;

/// GET /database/info
pub async fn info(State(state): State<Arc<AppState>>) -> Json<HypermediaResource<DatabaseInfo>> {
    let has_access = state.store_reachable().await;

    let data = DatabaseInfo {
        kind: state.executor.store().kind().to_string(),
        has_access,
    };

    let mut resource = HypermediaResource::new(data).link("self", "/database/info");
    if has_access {
        resource = resource.success();
    }
    Json(resource)
}
