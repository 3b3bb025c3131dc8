//! Protocol and service configuration

use anyhow::Context;
use std::net::SocketAddr;

use super::address::Address;
use super::tax::RESERVED_TXNS_PER_ASSET;

const MAINNET_APP_ID: u64 = 3158291365;
const MAINNET_TM_APP_ID: u64 = 1002541853;
// BNFIREKGRXEHCFOEQLTX3PU5SUCMRKDU7WHNBGZA4SXPW42OAHZBP7BPHY
const BONFIRE_WALLET: Address = Address::new([
    0x0b, 0x4a, 0x88, 0x91, 0x46, 0x8d, 0xc8, 0x71, 0x15, 0xc4, 0x82, 0xe7, 0x7d, 0xbe, 0x9d,
    0x95, 0x04, 0xc8, 0xa8, 0x74, 0xfd, 0x8e, 0xd0, 0x9b, 0x20, 0xe4, 0xae, 0xfb, 0x73, 0x4e,
    0x01, 0xf2,
]);
// FJHGNHTMRSQCISPDN2N6FTFKXM64S2X52M6BYONH7ZMON3SPRUZTSAHV54
const DEPLOYER_WALLET: Address = Address::new([
    0x2a, 0x4e, 0x66, 0x9e, 0x6c, 0x8c, 0xa0, 0x24, 0x49, 0xe3, 0x6e, 0x9b, 0xe2, 0xcc, 0xaa,
    0xbb, 0x3d, 0xc9, 0x6a, 0xfd, 0xd3, 0x3c, 0x1c, 0x39, 0xa7, 0xfe, 0x58, 0xe6, 0xee, 0x4f,
    0x8d, 0x33,
]);

const DEFAULT_ALGOD_URL: &str = "https://mainnet-api.algonode.cloud";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";

/// Group size assumed when the host does not impose one
pub const DEFAULT_MAX_GROUP_SIZE: usize = 16;

/// Fee constants, all in µAlgo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    /// Minimum-balance funding sent with a freeze registration
    pub freeze_mbr: u64,
    pub freeze_extra_fee: u64,
    pub top_extra_fee: u64,
    pub bottom_extra_fee: u64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            freeze_mbr: 37_700,
            freeze_extra_fee: 2_000,
            top_extra_fee: 1_000,
            bottom_extra_fee: 11_000,
        }
    }
}

/// On-chain identities and constants of the tax protocol
#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    /// Application holding the asset and user boxes
    pub app_id: u64,
    /// Secondary protocol application referenced by the settlement call
    pub tm_app_id: u64,
    pub bonfire_wallet: Address,
    pub deployer_wallet: Address,
    /// Referral credited on settlement; the zero address when unset
    pub referral: Address,
    pub default_max_group_size: usize,
    pub reserved_txns_per_asset: usize,
    pub fees: FeeSchedule,
}

impl ProtocolConfig {
    pub fn mainnet() -> Self {
        Self {
            app_id: MAINNET_APP_ID,
            tm_app_id: MAINNET_TM_APP_ID,
            bonfire_wallet: BONFIRE_WALLET,
            deployer_wallet: DEPLOYER_WALLET,
            referral: Address::ZERO,
            default_max_group_size: DEFAULT_MAX_GROUP_SIZE,
            reserved_txns_per_asset: RESERVED_TXNS_PER_ASSET,
            fees: FeeSchedule::default(),
        }
    }

    pub fn with_referral(mut self, referral: Option<Address>) -> Self {
        self.referral = referral.unwrap_or(Address::ZERO);
        self
    }

    /// Escrow account of the protocol application, receiver of tax and MBR payments
    pub fn app_address(&self) -> Address {
        Address::for_application(self.app_id)
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

/// Settings for the inspection service, read from the environment
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub algod_url: String,
    pub algod_token: Option<String>,
    pub bind_addr: SocketAddr,
    pub protocol: ProtocolConfig,
}

impl ServiceConfig {
    /// Reads `ALGOD_URL`, `ALGOD_TOKEN`, `FS_REFERRAL_ADDRESS` and `BIND_ADDR`.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honored.
    pub fn from_env() -> anyhow::Result<Self> {
        let referral = match std::env::var("FS_REFERRAL_ADDRESS") {
            Ok(s) if !s.trim().is_empty() => Some(s.trim().parse::<Address>()?),
            _ => None,
        };

        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .with_context(|| format!("Invalid BIND_ADDR: {}", bind_addr))?;

        Ok(Self {
            algod_url: std::env::var("ALGOD_URL").unwrap_or_else(|_| DEFAULT_ALGOD_URL.to_string()),
            algod_token: std::env::var("ALGOD_TOKEN").ok().filter(|t| !t.is_empty()),
            bind_addr,
            protocol: ProtocolConfig::mainnet().with_referral(referral),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_wallets() {
        let config = ProtocolConfig::mainnet();
        assert_eq!(
            config.bonfire_wallet.to_string(),
            "BNFIREKGRXEHCFOEQLTX3PU5SUCMRKDU7WHNBGZA4SXPW42OAHZBP7BPHY"
        );
        assert_eq!(
            config.deployer_wallet.to_string(),
            "FJHGNHTMRSQCISPDN2N6FTFKXM64S2X52M6BYONH7ZMON3SPRUZTSAHV54"
        );
        assert!(config.referral.is_zero());
    }

    #[test]
    fn test_mainnet_app_address() {
        assert_eq!(
            ProtocolConfig::mainnet().app_address().to_string(),
            "L43XN7OOKJE2MUMKEZ62ORSSUNJCGBNINYDG4J7XLFX6WVZASP2PPDD52Y"
        );
    }

    #[test]
    fn test_default_fees() {
        let fees = FeeSchedule::default();
        assert_eq!(fees.freeze_mbr, 37_700);
        assert_eq!(fees.bottom_extra_fee, 11_000);
    }

    #[test]
    fn test_referral_override() {
        let referral = Address::new([5; 32]);
        let config = ProtocolConfig::mainnet().with_referral(Some(referral));
        assert_eq!(config.referral, referral);
    }
}
