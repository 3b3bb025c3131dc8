//! Transaction descriptors handed back to the host
//!
//! These describe what to put in the atomic group; encoding and signing are
//! the host's job. Order within a returned list is significant.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::address::Address;
use super::keys::StorageKey;

/// Network fee and validity parameters, as returned by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedParams {
    /// Fee per byte, or the total fee when `flat_fee` is set (µAlgo)
    pub fee: u64,
    pub min_fee: u64,
    pub flat_fee: bool,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    pub genesis_hash: String,
}

impl SuggestedParams {
    /// Copy with a flat fee of `min_fee + extra_fee`, covering inner transactions.
    ///
    /// `fee` is a per-byte rate and is not folded in; under congestion the host
    /// re-prices the group from the encoded size.
    pub fn with_extra_fee(&self, extra_fee: u64) -> Self {
        Self {
            fee: self.min_fee + extra_fee,
            flat_fee: true,
            ..self.clone()
        }
    }
}

/// A box the application call must be allowed to touch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoxReference {
    pub app_id: u64,
    pub name: StorageKey,
    pub write: bool,
}

/// Argument passed to a contract method
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CallArg {
    Uint(u64),
    Address(Address),
    /// A transaction placed in the group immediately before the call
    Txn(Box<TransactionDescriptor>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppCall {
    pub sender: Address,
    pub app_id: u64,
    pub method: String,
    pub args: Vec<CallArg>,
    pub boxes: Vec<BoxReference>,
    pub accounts: Vec<Address>,
    pub foreign_apps: Vec<u64>,
    pub params: SuggestedParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionDescriptor {
    AssetTransfer {
        sender: Address,
        receiver: Address,
        asset_id: u64,
        #[serde(with = "amount_string")]
        amount: u64,
        params: SuggestedParams,
    },
    Payment {
        sender: Address,
        receiver: Address,
        #[serde(with = "amount_string")]
        amount: u64,
        params: SuggestedParams,
    },
    AppCall(AppCall),
}

impl TransactionDescriptor {
    /// Zero-amount self transfer, which opts the sender in to `asset_id`
    pub fn opt_in(sender: Address, asset_id: u64, params: &SuggestedParams) -> Self {
        TransactionDescriptor::AssetTransfer {
            sender,
            receiver: sender,
            asset_id,
            amount: 0,
            params: params.clone(),
        }
    }

    pub fn is_opt_in(&self) -> bool {
        matches!(
            self,
            TransactionDescriptor::AssetTransfer { sender, receiver, amount: 0, .. } if sender == receiver
        )
    }

    pub fn as_app_call(&self) -> Option<&AppCall> {
        match self {
            TransactionDescriptor::AppCall(call) => Some(call),
            _ => None,
        }
    }

    /// Method name for application calls
    pub fn method(&self) -> Option<&str> {
        self.as_app_call().map(|call| call.method.as_str())
    }
}

/// Capability that signs the group on the user's behalf
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Sign the transactions at `indexes` within `group`
    async fn sign(
        &self,
        group: &[TransactionDescriptor],
        indexes: &[usize],
    ) -> anyhow::Result<Vec<Vec<u8>>>;
}

/// Signer that returns empty signatures, for simulation and inspection
pub struct EmptySigner;

#[async_trait]
impl TransactionSigner for EmptySigner {
    async fn sign(
        &self,
        _group: &[TransactionDescriptor],
        indexes: &[usize],
    ) -> anyhow::Result<Vec<Vec<u8>>> {
        Ok(vec![Vec::new(); indexes.len()])
    }
}

/// A descriptor paired with the signer responsible for it
#[derive(Clone)]
pub struct TransactionWithSigner {
    pub txn: TransactionDescriptor,
    pub signer: Arc<dyn TransactionSigner>,
}

impl fmt::Debug for TransactionWithSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionWithSigner")
            .field("txn", &self.txn)
            .finish_non_exhaustive()
    }
}

mod amount_string {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(amount: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SuggestedParams {
        SuggestedParams {
            fee: 0,
            min_fee: 1_000,
            flat_fee: false,
            first_valid: 10,
            last_valid: 1_010,
            genesis_id: "mainnet-v1.0".into(),
            genesis_hash: "wGHE2Pwdvd7S12BL5FaOP20EGYesN73ktiC1qzkkit8=".into(),
        }
    }

    #[test]
    fn test_extra_fee_is_flat_on_top_of_min_fee() {
        let p = params().with_extra_fee(2_000);
        assert!(p.flat_fee);
        assert_eq!(p.fee, 3_000);
        assert_eq!(p.first_valid, 10);
    }

    #[test]
    fn test_extra_fee_ignores_per_byte_rate() {
        let congested = SuggestedParams {
            fee: 25,
            ..params()
        };
        let p = congested.with_extra_fee(11_000);
        assert!(p.flat_fee);
        assert_eq!(p.fee, 12_000);
    }

    #[test]
    fn test_opt_in_shape() {
        let sender = Address::new([9; 32]);
        let txn = TransactionDescriptor::opt_in(sender, 312769, &params());
        assert!(txn.is_opt_in());
        assert!(txn.method().is_none());
    }

    #[test]
    fn test_amounts_serialize_as_strings() {
        let txn = TransactionDescriptor::Payment {
            sender: Address::ZERO,
            receiver: Address::ZERO,
            amount: 37_700,
            params: params(),
        };
        let json = serde_json::to_value(&txn).unwrap();
        assert_eq!(json["type"], "payment");
        assert_eq!(json["amount"], "37700");
    }

    #[tokio::test]
    async fn test_empty_signer() {
        let sigs = EmptySigner.sign(&[], &[0, 1]).await.unwrap();
        assert_eq!(sigs.len(), 2);
        assert!(sigs.iter().all(|s| s.is_empty()));
    }
}
