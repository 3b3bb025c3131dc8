//! Tax arithmetic
//!
//! All rates are basis points out of [`BPS_DENOMINATOR`]. Every division floors;
//! intermediates are widened to u128 so `amount * 10_000` cannot wrap.

use serde::{Deserialize, Serialize};

use super::error::{MiddlewareError, Result};
use super::records::AssetRecord;

pub const BPS_DENOMINATOR: u64 = 10_000;

/// Extra group slots held back for each tax-enabled asset a swap touches
pub const RESERVED_TXNS_PER_ASSET: usize = 3;

/// Which amount a quote holds constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SwapQuote {
    /// The user sends exactly `amount`
    FixedInput { amount: u64 },
    /// The user receives exactly `amount`; `quote` is the counter-amount the
    /// route-finder quoted for it
    FixedOutput { amount: u64, quote: u64 },
}

impl SwapQuote {
    pub fn is_fixed_output(&self) -> bool {
        matches!(self, SwapQuote::FixedOutput { .. })
    }
}

fn net_rate(total_tax_bps: u64) -> Result<u64> {
    match BPS_DENOMINATOR.checked_sub(total_tax_bps) {
        Some(rate) if rate > 0 => Ok(rate),
        _ => Err(MiddlewareError::TaxRateInvalid { total_tax_bps }),
    }
}

fn mul_div(amount: u64, numerator: u64, denominator: u64) -> Result<u64> {
    let wide = amount as u128 * numerator as u128 / denominator as u128;
    u64::try_from(wide).map_err(|_| MiddlewareError::AmountOverflow)
}

/// Amount left for the swap after sell tax: `floor(amount * (10000 - t) / 10000)`.
///
/// A 100% rate is allowed and yields zero; anything above it is invalid.
pub fn sell_side_amount(amount: u64, total_tax_bps: u64) -> Result<u64> {
    let remaining = BPS_DENOMINATOR
        .checked_sub(total_tax_bps)
        .ok_or(MiddlewareError::TaxRateInvalid { total_tax_bps })?;
    mul_div(amount, remaining, BPS_DENOMINATOR)
}

/// Amount to request so that buy tax leaves `amount`: `floor(amount * 10000 / (10000 - t))`
pub fn buy_side_amount(amount: u64, total_tax_bps: u64) -> Result<u64> {
    mul_div(amount, BPS_DENOMINATOR, net_rate(total_tax_bps)?)
}

/// Amount the settlement tax is computed on.
///
/// Fixed-input quotes tax the fixed amount directly. Fixed-output quotes invert
/// the quoted counter-amount through the rate first, so the user still nets the
/// quoted figure after the settlement leg.
pub fn tax_base(quote: &SwapQuote, total_tax_bps: u64) -> Result<u64> {
    match *quote {
        SwapQuote::FixedInput { amount } => Ok(amount),
        SwapQuote::FixedOutput { quote, .. } => buy_side_amount(quote, total_tax_bps),
    }
}

/// `floor(base * t / 10000)`
pub fn tax_owed(base: u64, total_tax_bps: u64) -> Result<u64> {
    mul_div(base, total_tax_bps, BPS_DENOMINATOR)
}

/// Settlement tax for one leg of a swap.
///
/// The source leg pays when sell tax is on; otherwise the destination leg pays
/// when buy tax is on. A leg can be both when source and destination coincide.
pub fn settlement_tax(
    record: &AssetRecord,
    quote: &SwapQuote,
    is_source: bool,
    is_destination: bool,
) -> Result<u64> {
    let taxed = (is_source && record.flags.sell_tax) || (is_destination && record.flags.buy_tax);
    if !taxed {
        return Ok(0);
    }
    let base = tax_base(quote, record.total_tax_bps)?;
    tax_owed(base, record.total_tax_bps)
}

/// Group ceiling left for route-finding once protocol slots are reserved (never below 1)
pub fn effective_group_size(max_group_size: usize, reserved: usize) -> usize {
    max_group_size.saturating_sub(reserved).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::address::Address;
    use crate::protocol::records::AssetFlags;

    fn record(total: u64, buy_tax: bool, sell_tax: bool) -> AssetRecord {
        AssetRecord {
            admin_account: Address::ZERO,
            main_pool: Address::ZERO,
            liquidity_target: Address::ZERO,
            project_tax_bps: total,
            burn_tax_bps: 0,
            reflection_tax_bps: 0,
            freeze_tax_bps: 0,
            liquidity_tax_bps: 0,
            freeze_reward_bps: 0,
            max_freeze_reward: 0,
            liquidity_deposit_bps: 0,
            eligible_for_reflections_total: 0,
            freeze_rewards_available: 0,
            reflections_tokens_available: 0,
            reflections_algo_available: 0,
            minimum_reflections: 0,
            tokens_collected: 0,
            algo_collected: 0,
            pending_project_tax: 0,
            pending_liquidity_tax: 0,
            flags: AssetFlags {
                buy_tax,
                sell_tax,
                taxes_in_native: false,
            },
            total_tax_bps: total,
        }
    }

    #[test]
    fn test_sell_side_five_percent() {
        assert_eq!(sell_side_amount(1_000_000, 500).unwrap(), 950_000);
    }

    #[test]
    fn test_buy_side_recovers_pre_tax_amount() {
        let supplied = buy_side_amount(950_000, 500).unwrap();
        assert!(supplied.abs_diff(1_000_000) <= 1);
    }

    #[test]
    fn test_buy_side_rejects_full_rate() {
        assert!(matches!(
            buy_side_amount(1_000, 10_000),
            Err(MiddlewareError::TaxRateInvalid {
                total_tax_bps: 10_000
            })
        ));
        assert!(buy_side_amount(1_000, 12_000).is_err());
    }

    #[test]
    fn test_sell_side_bounds() {
        assert_eq!(sell_side_amount(1_000, 10_000).unwrap(), 0);
        assert!(sell_side_amount(1_000, 10_001).is_err());
    }

    #[test]
    fn test_floors_instead_of_rounding() {
        // 999 * 9700 / 10000 = 969.03
        assert_eq!(sell_side_amount(999, 300).unwrap(), 969);
        // 333 * 300 / 10000 = 9.99
        assert_eq!(tax_owed(333, 300).unwrap(), 9);
    }

    #[test]
    fn test_no_overflow_on_large_amounts() {
        assert_eq!(sell_side_amount(u64::MAX, 0).unwrap(), u64::MAX);
        assert!(matches!(
            buy_side_amount(u64::MAX, 500),
            Err(MiddlewareError::AmountOverflow)
        ));
    }

    #[test]
    fn test_tax_base_by_quote_mode() {
        let fixed_in = SwapQuote::FixedInput { amount: 1_000_000 };
        assert_eq!(tax_base(&fixed_in, 300).unwrap(), 1_000_000);

        let fixed_out = SwapQuote::FixedOutput {
            amount: 5,
            quote: 970_000,
        };
        assert_eq!(tax_base(&fixed_out, 300).unwrap(), 1_000_000);
    }

    #[test]
    fn test_settlement_tax_follows_direction_flags() {
        let quote = SwapQuote::FixedInput { amount: 100_000_000 };
        let buy_only = record(300, true, false);

        assert_eq!(settlement_tax(&buy_only, &quote, true, false).unwrap(), 0);
        assert_eq!(
            settlement_tax(&buy_only, &quote, false, true).unwrap(),
            3_000_000
        );
        // Same-asset swap: the source leg is also the destination
        assert_eq!(
            settlement_tax(&buy_only, &quote, true, true).unwrap(),
            3_000_000
        );

        let untaxed = record(300, false, false);
        assert_eq!(settlement_tax(&untaxed, &quote, true, true).unwrap(), 0);
    }

    #[test]
    fn test_effective_group_size() {
        assert_eq!(effective_group_size(16, 6), 10);
        assert_eq!(effective_group_size(2, 6), 1);
    }

    #[test]
    fn test_quote_serde_shape() {
        let quote: SwapQuote =
            serde_json::from_str(r#"{"type":"fixed-output","amount":10,"quote":12}"#).unwrap();
        assert!(quote.is_fixed_output());
        let quote: SwapQuote =
            serde_json::from_str(r#"{"type":"fixed-input","amount":10}"#).unwrap();
        assert_eq!(quote, SwapQuote::FixedInput { amount: 10 });
    }
}
