//! Service identity endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::AppState;
use crate::protocol::{Address, SwapMiddleware};

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub app_id: u64,
    pub app_address: Address,
    pub tm_app_id: u64,
    pub referral: Address,
    pub default_max_group_size: usize,
}

/// GET /api/info - Middleware identity and protocol constants
pub async fn get_info(State(state): State<AppState>) -> Json<InfoResponse> {
    let middleware = &state.middleware;
    let config = middleware.config();

    Json(InfoResponse {
        name: middleware.name(),
        version: middleware.version(),
        app_id: config.app_id,
        app_address: config.app_address(),
        tm_app_id: config.tm_app_id,
        referral: config.referral,
        default_max_group_size: config.default_max_group_size,
    })
}
