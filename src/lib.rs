//! Tax-protocol swap middleware
//!
//! Augments aggregator swaps with the bookkeeping a tax-collecting asset
//! protocol requires, and serves an HTTP inspection API over the same logic.

pub mod api;
pub mod protocol;
pub mod types;
