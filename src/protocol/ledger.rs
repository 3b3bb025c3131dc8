//! Ledger collaborator
//!
//! Everything the middleware reads from the network goes through this trait.
//! Absence is reported as `Ok(None)` rather than an error so callers can treat
//! "never opted in" or "no box" as ordinary answers.

use async_trait::async_trait;

use super::address::Address;
use super::error::LedgerError;
use super::keys::StorageKey;
use super::transaction::SuggestedParams;

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Authorized signer of a rekeyed account, `None` if the account signs for itself
    async fn account_auth_address(&self, address: &Address)
        -> Result<Option<Address>, LedgerError>;

    /// Holding of `asset_id`, `None` if the account is not opted in
    async fn asset_holding(
        &self,
        address: &Address,
        asset_id: u64,
    ) -> Result<Option<u64>, LedgerError>;

    /// Raw box contents, `None` if the box does not exist
    async fn application_box(
        &self,
        app_id: u64,
        key: &StorageKey,
    ) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Reserve account configured in the asset parameters
    async fn asset_reserve(&self, asset_id: u64) -> Result<Option<Address>, LedgerError>;

    async fn suggested_params(&self) -> Result<SuggestedParams, LedgerError>;
}
