//! Box record decoding
//!
//! The protocol application stores its state as fixed-layout big-endian blobs.
//! These decoders read fields at fixed offsets and never trust stored
//! aggregates: the total tax rate is recomputed from its components.

use serde::Serialize;

use super::address::{Address, PUBLIC_KEY_LENGTH};
use super::error::{MiddlewareError, Result};

// Asset box layout (byte offsets)
const ADMIN_ACCOUNT: usize = 0;
const MAIN_POOL: usize = 32;
const PROJECT_TAX_BPS: usize = 64;
const BURN_TAX_BPS: usize = 72;
const REFLECTION_TAX_BPS: usize = 80;
const FREEZE_TAX_BPS: usize = 88;
const LIQUIDITY_TAX_BPS: usize = 96;
const LIQUIDITY_TARGET: usize = 104;
const FREEZE_REWARD_BPS: usize = 136;
const MAX_FREEZE_REWARD: usize = 144;
const LIQUIDITY_DEPOSIT_BPS: usize = 152;
const ELIGIBLE_FOR_REFLECTIONS_TOTAL: usize = 176;
const FREEZE_REWARDS_AVAILABLE: usize = 184;
const REFLECTIONS_TOKENS_AVAILABLE: usize = 192;
const REFLECTIONS_ALGO_AVAILABLE: usize = 200;
const MINIMUM_REFLECTIONS: usize = 208;
const TOKENS_COLLECTED: usize = 216;
const ALGO_COLLECTED: usize = 224;
const PENDING_PROJECT_TAX: usize = 232;
const PENDING_LIQUIDITY_TAX: usize = 240;
const FLAGS: usize = 248;

/// Smallest asset box the decoder accepts (everything up to and including the flags byte)
pub const ASSET_RECORD_MIN_LEN: usize = FLAGS + 1;
/// Full on-chain size of an asset box
pub const ASSET_RECORD_LEN: usize = 256;

// User deposit box layout (byte offsets)
const LOCKED_ASSET_ID: usize = 0;
const LP_DEPOSIT: usize = 8;
const LOCKED_LP_TOKENS: usize = 16;
const LP_APP_ID: usize = 24;
const SECOND_LOCKED_ASSET_ID: usize = 32;
const SECOND_LP_DEPOSIT: usize = 40;

pub const USER_DEPOSIT_RECORD_MIN_LEN: usize = 48;

/// Bit positions inside the packed flags byte
pub mod flag_bits {
    pub const BUY_TAX: u8 = 0b1000_0000;
    pub const SELL_TAX: u8 = 0b0100_0000;
    pub const TAXES_IN_NATIVE: u8 = 0b0010_0000;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AssetFlags {
    pub buy_tax: bool,
    pub sell_tax: bool,
    /// Tax is denominated in the network currency rather than the asset
    pub taxes_in_native: bool,
}

impl AssetFlags {
    pub fn from_byte(byte: u8) -> Self {
        Self {
            buy_tax: byte & flag_bits::BUY_TAX != 0,
            sell_tax: byte & flag_bits::SELL_TAX != 0,
            taxes_in_native: byte & flag_bits::TAXES_IN_NATIVE != 0,
        }
    }

    pub fn to_byte(self) -> u8 {
        let mut byte = 0;
        if self.buy_tax {
            byte |= flag_bits::BUY_TAX;
        }
        if self.sell_tax {
            byte |= flag_bits::SELL_TAX;
        }
        if self.taxes_in_native {
            byte |= flag_bits::TAXES_IN_NATIVE;
        }
        byte
    }

    /// Any directional tax is active
    pub fn any_tax(&self) -> bool {
        self.buy_tax || self.sell_tax
    }
}

/// Snapshot of a tax-enabled asset's configuration and accounting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRecord {
    pub admin_account: Address,
    pub main_pool: Address,
    pub liquidity_target: Address,
    pub project_tax_bps: u64,
    pub burn_tax_bps: u64,
    pub reflection_tax_bps: u64,
    pub freeze_tax_bps: u64,
    pub liquidity_tax_bps: u64,
    pub freeze_reward_bps: u64,
    pub max_freeze_reward: u64,
    pub liquidity_deposit_bps: u64,
    pub eligible_for_reflections_total: u64,
    pub freeze_rewards_available: u64,
    pub reflections_tokens_available: u64,
    pub reflections_algo_available: u64,
    pub minimum_reflections: u64,
    pub tokens_collected: u64,
    pub algo_collected: u64,
    pub pending_project_tax: u64,
    pub pending_liquidity_tax: u64,
    #[serde(flatten)]
    pub flags: AssetFlags,
    /// Sum of the five component rates
    pub total_tax_bps: u64,
}

impl AssetRecord {
    /// Decode an asset box.
    ///
    /// Out-of-range values are passed through untouched; a total above 10 000 bps
    /// surfaces later as `TaxRateInvalid` when the rate is actually applied.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < ASSET_RECORD_MIN_LEN {
            return Err(MiddlewareError::TruncatedRecord {
                record: "Asset box",
                expected: ASSET_RECORD_MIN_LEN,
                actual: bytes.len(),
            });
        }

        let project_tax_bps = read_u64_be(bytes, PROJECT_TAX_BPS);
        let burn_tax_bps = read_u64_be(bytes, BURN_TAX_BPS);
        let reflection_tax_bps = read_u64_be(bytes, REFLECTION_TAX_BPS);
        let freeze_tax_bps = read_u64_be(bytes, FREEZE_TAX_BPS);
        let liquidity_tax_bps = read_u64_be(bytes, LIQUIDITY_TAX_BPS);

        // Saturate so a corrupt box cannot panic in debug builds
        let total_tax_bps = [
            project_tax_bps,
            burn_tax_bps,
            reflection_tax_bps,
            freeze_tax_bps,
            liquidity_tax_bps,
        ]
        .iter()
        .fold(0u64, |acc, bps| acc.saturating_add(*bps));

        Ok(Self {
            admin_account: read_address(bytes, ADMIN_ACCOUNT)?,
            main_pool: read_address(bytes, MAIN_POOL)?,
            liquidity_target: read_address(bytes, LIQUIDITY_TARGET)?,
            project_tax_bps,
            burn_tax_bps,
            reflection_tax_bps,
            freeze_tax_bps,
            liquidity_tax_bps,
            freeze_reward_bps: read_u64_be(bytes, FREEZE_REWARD_BPS),
            max_freeze_reward: read_u64_be(bytes, MAX_FREEZE_REWARD),
            liquidity_deposit_bps: read_u64_be(bytes, LIQUIDITY_DEPOSIT_BPS),
            eligible_for_reflections_total: read_u64_be(bytes, ELIGIBLE_FOR_REFLECTIONS_TOTAL),
            freeze_rewards_available: read_u64_be(bytes, FREEZE_REWARDS_AVAILABLE),
            reflections_tokens_available: read_u64_be(bytes, REFLECTIONS_TOKENS_AVAILABLE),
            reflections_algo_available: read_u64_be(bytes, REFLECTIONS_ALGO_AVAILABLE),
            minimum_reflections: read_u64_be(bytes, MINIMUM_REFLECTIONS),
            tokens_collected: read_u64_be(bytes, TOKENS_COLLECTED),
            algo_collected: read_u64_be(bytes, ALGO_COLLECTED),
            pending_project_tax: read_u64_be(bytes, PENDING_PROJECT_TAX),
            pending_liquidity_tax: read_u64_be(bytes, PENDING_LIQUIDITY_TAX),
            flags: AssetFlags::from_byte(bytes[FLAGS]),
            total_tax_bps,
        })
    }

    /// Lay the record out as the protocol application stores it.
    ///
    /// Used to build synthetic boxes for fakes and tests; `total_tax_bps` is
    /// not part of the layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; ASSET_RECORD_LEN];
        write_address(&mut out, ADMIN_ACCOUNT, &self.admin_account);
        write_address(&mut out, MAIN_POOL, &self.main_pool);
        write_address(&mut out, LIQUIDITY_TARGET, &self.liquidity_target);
        for (offset, value) in [
            (PROJECT_TAX_BPS, self.project_tax_bps),
            (BURN_TAX_BPS, self.burn_tax_bps),
            (REFLECTION_TAX_BPS, self.reflection_tax_bps),
            (FREEZE_TAX_BPS, self.freeze_tax_bps),
            (LIQUIDITY_TAX_BPS, self.liquidity_tax_bps),
            (FREEZE_REWARD_BPS, self.freeze_reward_bps),
            (MAX_FREEZE_REWARD, self.max_freeze_reward),
            (LIQUIDITY_DEPOSIT_BPS, self.liquidity_deposit_bps),
            (ELIGIBLE_FOR_REFLECTIONS_TOTAL, self.eligible_for_reflections_total),
            (FREEZE_REWARDS_AVAILABLE, self.freeze_rewards_available),
            (REFLECTIONS_TOKENS_AVAILABLE, self.reflections_tokens_available),
            (REFLECTIONS_ALGO_AVAILABLE, self.reflections_algo_available),
            (MINIMUM_REFLECTIONS, self.minimum_reflections),
            (TOKENS_COLLECTED, self.tokens_collected),
            (ALGO_COLLECTED, self.algo_collected),
            (PENDING_PROJECT_TAX, self.pending_project_tax),
            (PENDING_LIQUIDITY_TAX, self.pending_liquidity_tax),
        ] {
            out[offset..offset + 8].copy_from_slice(&value.to_be_bytes());
        }
        out[FLAGS] = self.flags.to_byte();
        out
    }
}

/// Per-user, per-asset liquidity lock accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct UserDepositRecord {
    pub locked_asset_id: u64,
    pub lp_deposit: u64,
    pub locked_lp_tokens: u64,
    pub lp_app_id: u64,
    pub second_locked_asset_id: u64,
    pub second_lp_deposit: u64,
}

impl UserDepositRecord {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < USER_DEPOSIT_RECORD_MIN_LEN {
            return Err(MiddlewareError::TruncatedRecord {
                record: "UserDeposit box",
                expected: USER_DEPOSIT_RECORD_MIN_LEN,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            locked_asset_id: read_u64_be(bytes, LOCKED_ASSET_ID),
            lp_deposit: read_u64_be(bytes, LP_DEPOSIT),
            locked_lp_tokens: read_u64_be(bytes, LOCKED_LP_TOKENS),
            lp_app_id: read_u64_be(bytes, LP_APP_ID),
            second_locked_asset_id: read_u64_be(bytes, SECOND_LOCKED_ASSET_ID),
            second_lp_deposit: read_u64_be(bytes, SECOND_LP_DEPOSIT),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        [
            self.locked_asset_id,
            self.lp_deposit,
            self.locked_lp_tokens,
            self.lp_app_id,
            self.second_locked_asset_id,
            self.second_lp_deposit,
        ]
        .iter()
        .flat_map(|v| v.to_be_bytes())
        .collect()
    }
}

/// Caller guarantees `offset + 8 <= bytes.len()`
fn read_u64_be(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_be_bytes(buf)
}

fn read_address(bytes: &[u8], offset: usize) -> Result<Address> {
    Address::from_slice(&bytes[offset..offset + PUBLIC_KEY_LENGTH])
}

fn write_address(out: &mut [u8], offset: usize, address: &Address) {
    out[offset..offset + PUBLIC_KEY_LENGTH].copy_from_slice(address.public_key());
}
