//! Box key derivation
//!
//! Every record the protocol application keeps lives in a box whose name can be
//! computed from the asset id and/or account alone, so no index lookup is needed.

use serde::{Serialize, Serializer};
use std::fmt;

use super::address::{Address, PUBLIC_KEY_LENGTH};
use super::ledger::Ledger;

/// Tag byte for asset configuration boxes (ASCII 'a')
pub const ASSET_KEY_TAG: u8 = 0x61;
pub const ASSET_KEY_LENGTH: usize = 1 + 8;
pub const USER_KEY_LENGTH: usize = 8 + PUBLIC_KEY_LENGTH;
pub const EXEMPT_KEY_LENGTH: usize = 1 + PUBLIC_KEY_LENGTH;

/// Opaque name of a box in the protocol application's store
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(Vec<u8>);

impl StorageKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl From<Vec<u8>> for StorageKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for StorageKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageKey(0x{})", self.to_hex())
    }
}

impl Serialize for StorageKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Which exemption list an exempt-wallet box belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExemptRole {
    /// Direct address exemption
    General,
    /// Referral / authorized-signer exemption, keyed by the rekeyed signer
    Referral,
}

impl ExemptRole {
    pub fn tag(&self) -> u8 {
        match self {
            ExemptRole::General => b'g',
            ExemptRole::Referral => b'r',
        }
    }
}

/// `'a' || asset_id (u64 BE)`
pub fn asset_key(asset_id: u64) -> StorageKey {
    let mut key = Vec::with_capacity(ASSET_KEY_LENGTH);
    key.push(ASSET_KEY_TAG);
    key.extend_from_slice(&asset_id.to_be_bytes());
    StorageKey(key)
}

/// `asset_id (u64 BE) || public_key`
pub fn user_key(asset_id: u64, address: &Address) -> StorageKey {
    let mut key = Vec::with_capacity(USER_KEY_LENGTH);
    key.extend_from_slice(&asset_id.to_be_bytes());
    key.extend_from_slice(address.public_key());
    StorageKey(key)
}

/// `role tag || public_key`, with no signer resolution
pub fn exempt_key(role: ExemptRole, address: &Address) -> StorageKey {
    let mut key = Vec::with_capacity(EXEMPT_KEY_LENGTH);
    key.push(role.tag());
    key.extend_from_slice(address.public_key());
    StorageKey(key)
}

/// Exempt-wallet key as the protocol application expects it.
///
/// For [`ExemptRole::Referral`] with a ledger available, the account's
/// authorized signer is used when one is set. A failed lookup falls back to
/// the address itself.
pub async fn resolve_exempt_key(
    role: ExemptRole,
    address: &Address,
    ledger: Option<&dyn Ledger>,
) -> StorageKey {
    let signer = match (role, ledger) {
        (ExemptRole::Referral, Some(ledger)) => match ledger.account_auth_address(address).await {
            Ok(Some(auth)) => auth,
            Ok(None) => *address,
            Err(e) => {
                tracing::warn!(
                    "Auth address lookup for {} failed, keying on the account itself: {}",
                    address,
                    e
                );
                *address
            }
        },
        _ => *address,
    };
    exempt_key(role, &signer)
}
