//! API endpoints for the inspection service

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

mod asset;
mod quote;
mod swap;
mod system;

use crate::protocol::{FirstStageMiddleware, Ledger};

/// Shared application state: the middleware and the ledger it reads from
#[derive(Clone)]
pub struct AppState {
    pub middleware: Arc<FirstStageMiddleware>,
    pub ledger: Arc<dyn Ledger>,
}

impl AppState {
    pub fn new(middleware: Arc<FirstStageMiddleware>, ledger: Arc<dyn Ledger>) -> Self {
        Self { middleware, ledger }
    }
}

/// Create the API router with all endpoints
pub fn router(middleware: Arc<FirstStageMiddleware>, ledger: Arc<dyn Ledger>) -> Router {
    let app_state = AppState::new(middleware, ledger);

    Router::new()
        .route("/info", get(system::get_info))
        // Protocol records
        .route("/assets/:asset_id", get(asset::get_asset))
        .route("/assets/:asset_id/users/:address", get(asset::get_user_deposit))
        .route("/keys/:asset_id/:address", get(asset::get_keys))
        // Swap hooks
        .route("/quote/adjust", post(quote::adjust_quote))
        .route("/swap/before", post(swap::before_swap))
        .route("/swap/after", post(swap::after_swap))
        .with_state(app_state)
}
