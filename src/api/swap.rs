//! Swap hook endpoints
//!
//! Runs the before/after hooks for a described swap and returns the ordered
//! transactions the host would add to the group. Nothing is signed or sent.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::AppState;
use crate::protocol::tax::SwapQuote;
use crate::protocol::transaction::{EmptySigner, TransactionDescriptor, TransactionWithSigner};
use crate::protocol::{Address, SwapContext, SwapMiddleware};
use crate::types::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct SwapRequest {
    pub address: Address,
    pub from_asset_id: u64,
    pub to_asset_id: u64,
    pub quote: SwapQuote,
}

#[derive(Debug, Serialize)]
pub struct SwapHookResponse {
    pub hook: &'static str,
    pub applies: bool,
    pub transaction_count: usize,
    pub transactions: Vec<TransactionDescriptor>,
}

async fn build_context(state: &AppState, req: SwapRequest) -> ApiResult<SwapContext> {
    let suggested_params = state
        .ledger
        .suggested_params()
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to fetch transaction params: {}", e)))?;

    Ok(SwapContext {
        address: req.address,
        from_asset_id: req.from_asset_id,
        to_asset_id: req.to_asset_id,
        signer: Arc::new(EmptySigner),
        suggested_params,
        quote: req.quote,
    })
}

fn into_response(
    hook: &'static str,
    applies: bool,
    txns: Vec<TransactionWithSigner>,
) -> SwapHookResponse {
    let transactions: Vec<TransactionDescriptor> = txns.into_iter().map(|t| t.txn).collect();
    SwapHookResponse {
        hook,
        applies,
        transaction_count: transactions.len(),
        transactions,
    }
}

/// POST /api/swap/before - Transactions to prepend to the swap
pub async fn before_swap(
    State(state): State<AppState>,
    Json(req): Json<SwapRequest>,
) -> ApiResult<Json<SwapHookResponse>> {
    let context = build_context(&state, req).await?;
    let applies = state
        .middleware
        .should_apply(context.from_asset_id, context.to_asset_id);
    let txns = state.middleware.before_swap(&context).await?;
    Ok(Json(into_response("before_swap", applies, txns)))
}

/// POST /api/swap/after - Settlement transactions to append to the swap
pub async fn after_swap(
    State(state): State<AppState>,
    Json(req): Json<SwapRequest>,
) -> ApiResult<Json<SwapHookResponse>> {
    let context = build_context(&state, req).await?;
    let applies = state
        .middleware
        .should_apply(context.from_asset_id, context.to_asset_id);
    let txns = state.middleware.after_swap(&context).await?;
    Ok(Json(into_response("after_swap", applies, txns)))
}
