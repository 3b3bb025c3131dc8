//! Quote adjustment endpoint

use axum::{extract::State, Json};

use crate::api::AppState;
use crate::protocol::middleware::{AdjustedQuoteParams, QuoteParams};
use crate::protocol::SwapMiddleware;
use crate::types::ApiResult;

/// POST /api/quote/adjust - Tax-adjust a quote request before route-finding
pub async fn adjust_quote(
    State(state): State<AppState>,
    Json(params): Json<QuoteParams>,
) -> ApiResult<Json<AdjustedQuoteParams>> {
    let adjusted = state.middleware.adjust_quote_params(params).await?;
    Ok(Json(adjusted))
}
