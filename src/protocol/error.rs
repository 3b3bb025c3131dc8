//! Error taxonomy for the protocol layer

/// Result type used across the protocol layer
pub type Result<T> = std::result::Result<T, MiddlewareError>;

/// Failures reported by a ledger collaborator.
///
/// `NotFound` is kept distinct so callers can decide whether absence is benign
/// (an account that never opted in, a box that was never created).
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ledger returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed ledger response: {0}")]
    Decode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum MiddlewareError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("{record} too short: expected at least {expected} bytes, got {actual}")]
    TruncatedRecord {
        record: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Total tax rate {total_tax_bps} bps leaves nothing to trade against")]
    TaxRateInvalid { total_tax_bps: u64 },

    #[error("No protocol record for asset {asset_id}")]
    RecordNotFound { asset_id: u64 },

    #[error("Tax-adjusted amount does not fit in 64 bits")]
    AmountOverflow,

    #[error("Address required for quote adjustment")]
    MissingAddress,

    #[error("Swap session is in phase {actual:?}, expected one of {expected:?}")]
    InvalidPhase {
        expected: &'static [crate::protocol::middleware::SwapPhase],
        actual: crate::protocol::middleware::SwapPhase,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Contract call failed: {0}")]
    ContractCall(String),
}

impl MiddlewareError {
    /// True for errors that must never be downgraded to "feature inapplicable".
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MiddlewareError::InvalidAddress(_) | MiddlewareError::TaxRateInvalid { .. }
        )
    }
}
