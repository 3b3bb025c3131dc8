//! Protocol record endpoints
//!
//! Decoded views of the asset and user boxes, plus the raw box names so they
//! can be checked against a block explorer.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::api::AppState;
use crate::protocol::keys::{self, ExemptRole};
use crate::protocol::records::{AssetRecord, UserDepositRecord};
use crate::protocol::Address;
use crate::types::{ApiError, ApiResult};

#[derive(Debug, Serialize)]
pub struct AssetResponse {
    pub asset_id: u64,
    pub box_key: String,
    pub record: AssetRecord,
}

#[derive(Debug, Serialize)]
pub struct UserDepositResponse {
    pub asset_id: u64,
    pub address: Address,
    pub box_key: String,
    pub record: UserDepositRecord,
}

#[derive(Debug, Serialize)]
pub struct KeysResponse {
    pub asset_id: u64,
    pub address: Address,
    pub asset_key: String,
    pub user_key: String,
    pub general_exempt_key: String,
    /// Keyed by the account's authorized signer when it is rekeyed
    pub referral_exempt_key: String,
}

pub(crate) fn parse_address(s: &str) -> ApiResult<Address> {
    s.parse()
        .map_err(|e| ApiError::BadRequest(format!("{}", e)))
}

/// GET /api/assets/:asset_id - Decoded asset box
pub async fn get_asset(
    State(state): State<AppState>,
    Path(asset_id): Path<u64>,
) -> ApiResult<Json<AssetResponse>> {
    let record = state.middleware.asset_record(asset_id).await?;

    Ok(Json(AssetResponse {
        asset_id,
        box_key: keys::asset_key(asset_id).to_hex(),
        record,
    }))
}

/// GET /api/assets/:asset_id/users/:address - Decoded user deposit box
pub async fn get_user_deposit(
    State(state): State<AppState>,
    Path((asset_id, address)): Path<(u64, String)>,
) -> ApiResult<Json<UserDepositResponse>> {
    let address = parse_address(&address)?;
    let record = state
        .middleware
        .user_deposit_record(asset_id, &address)
        .await?;

    Ok(Json(UserDepositResponse {
        asset_id,
        address,
        box_key: keys::user_key(asset_id, &address).to_hex(),
        record,
    }))
}

/// GET /api/keys/:asset_id/:address - Box names the swap hooks reference
pub async fn get_keys(
    State(state): State<AppState>,
    Path((asset_id, address)): Path<(u64, String)>,
) -> ApiResult<Json<KeysResponse>> {
    let address = parse_address(&address)?;
    let referral =
        keys::resolve_exempt_key(ExemptRole::Referral, &address, Some(state.ledger.as_ref()))
            .await;

    Ok(Json(KeysResponse {
        asset_id,
        address,
        asset_key: keys::asset_key(asset_id).to_hex(),
        user_key: keys::user_key(asset_id, &address).to_hex(),
        general_exempt_key: keys::exempt_key(ExemptRole::General, &address).to_hex(),
        referral_exempt_key: referral.to_hex(),
    }))
}
