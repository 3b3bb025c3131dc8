//! Tax protocol integration
//!
//! Pure pieces (key derivation, record decoding, tax arithmetic) plus the
//! swap middleware that drives them against a ledger and a contract client:
//! - `keys`: box names for asset, user and exempt-wallet records
//! - `records`: fixed-layout decoders for asset and user deposit boxes
//! - `tax`: basis-point adjustments for quotes and settlement
//! - `middleware`: lifecycle hooks producing the extra group transactions

pub mod address;
pub mod algod;
pub mod client;
pub mod config;
pub mod error;
pub mod keys;
pub mod ledger;
pub mod middleware;
pub mod records;
pub mod tax;
pub mod transaction;

pub use address::Address;
pub use error::{LedgerError, MiddlewareError, Result};
pub use ledger::Ledger;
pub use middleware::{FirstStageMiddleware, SwapContext, SwapMiddleware};
