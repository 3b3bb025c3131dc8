//! Swap middleware for the tax protocol
//!
//! Hooks the host calls around a swap. Before the swap it opts the sender in,
//! registers freeze tracking where needed and emits one `generalOperationsTop`
//! call per protocol asset. After the swap it pays the tax owed on each leg
//! through `generalOperationsBottom`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::address::Address;
use super::client::{
    BottomCall, BoxClientFactory, ClientCache, FreezeCall, ProtocolClient, ProtocolClientFactory,
    TopCall,
};
use super::config::ProtocolConfig;
use super::error::{LedgerError, MiddlewareError, Result};
use super::keys::{self, ExemptRole};
use super::ledger::Ledger;
use super::records::{AssetRecord, UserDepositRecord};
use super::tax::{self, SwapQuote};
use super::transaction::{
    BoxReference, SuggestedParams, TransactionDescriptor, TransactionSigner, TransactionWithSigner,
};

const MIDDLEWARE_NAME: &str = "FirstStageDeflex";
const MIDDLEWARE_VERSION: &str = "1.0.0";

/// Which side of the trade a quote request fixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuoteMode {
    #[default]
    FixedInput,
    FixedOutput,
}

/// Parameters of a quote request before route-finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteParams {
    pub from_asset_id: u64,
    pub to_asset_id: u64,
    pub amount: u64,
    #[serde(rename = "type", default)]
    pub mode: QuoteMode,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub max_group_size: Option<usize>,
    #[serde(default)]
    pub opt_in: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdjustedQuoteParams {
    /// Request to forward to the route-finder: tax-adjusted amount, reduced
    /// group ceiling, and opt-in disabled since this middleware emits its own
    pub params: QuoteParams,
    pub adjusted_amount: u64,
    pub reserved_txns: usize,
}

/// Host-supplied description of one swap
#[derive(Clone)]
pub struct SwapContext {
    pub address: Address,
    pub from_asset_id: u64,
    pub to_asset_id: u64,
    pub signer: Arc<dyn TransactionSigner>,
    pub suggested_params: SuggestedParams,
    pub quote: SwapQuote,
}

/// Lifecycle hooks a swap aggregator invokes
#[async_trait]
pub trait SwapMiddleware: Send + Sync {
    fn name(&self) -> &'static str;

    fn version(&self) -> &'static str;

    fn should_apply(&self, from_asset_id: u64, to_asset_id: u64) -> bool;

    async fn adjust_quote_params(&self, params: QuoteParams) -> Result<AdjustedQuoteParams>;

    async fn before_swap(&self, context: &SwapContext) -> Result<Vec<TransactionWithSigner>>;

    async fn after_swap(&self, context: &SwapContext) -> Result<Vec<TransactionWithSigner>>;
}

/// Progress of one swap through the hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SwapPhase {
    NotApplicable,
    PreparingPre,
    PreparedPre,
    PreparingPost,
    Done,
}

pub struct FirstStageMiddleware {
    config: ProtocolConfig,
    ledger: Arc<dyn Ledger>,
    factory: Arc<dyn ProtocolClientFactory>,
    clients: ClientCache,
}

impl FirstStageMiddleware {
    /// Middleware using the box-backed default protocol client
    pub fn new(config: ProtocolConfig, ledger: Arc<dyn Ledger>) -> Self {
        let factory = Arc::new(BoxClientFactory::new(ledger.clone(), config.app_id));
        Self::with_client_factory(config, ledger, factory)
    }

    pub fn with_client_factory(
        config: ProtocolConfig,
        ledger: Arc<dyn Ledger>,
        factory: Arc<dyn ProtocolClientFactory>,
    ) -> Self {
        Self {
            config,
            ledger,
            factory,
            clients: ClientCache::new(),
        }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn client_cache(&self) -> &ClientCache {
        &self.clients
    }

    /// Start tracking one swap
    pub fn session<'a>(&'a self, context: &'a SwapContext) -> SwapSession<'a> {
        SwapSession::new(self, context)
    }

    /// Fetch and decode the asset box; `RecordNotFound` if the asset is not protocol-enabled
    pub async fn asset_record(&self, asset_id: u64) -> Result<AssetRecord> {
        let bytes = self
            .ledger
            .application_box(self.config.app_id, &keys::asset_key(asset_id))
            .await?
            .ok_or(MiddlewareError::RecordNotFound { asset_id })?;
        AssetRecord::decode(&bytes)
    }

    pub async fn user_deposit_record(
        &self,
        asset_id: u64,
        address: &Address,
    ) -> Result<UserDepositRecord> {
        let bytes = self
            .ledger
            .application_box(self.config.app_id, &keys::user_key(asset_id, address))
            .await?
            .ok_or(MiddlewareError::RecordNotFound { asset_id })?;
        UserDepositRecord::decode(&bytes)
    }

    /// Absent boxes mean "not protocol-enabled"; corrupt ones still fail
    async fn find_asset_record(&self, asset_id: u64) -> Result<Option<AssetRecord>> {
        match self.asset_record(asset_id).await {
            Ok(record) => Ok(Some(record)),
            Err(MiddlewareError::RecordNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn client(&self, sender: &Address) -> Arc<dyn ProtocolClient> {
        self.clients.get_or_create(sender, self.factory.as_ref()).await
    }

    /// Asset box, user box (writable), and both exempt-wallet boxes
    pub async fn box_references(&self, address: &Address, asset_id: u64) -> Vec<BoxReference> {
        let app_id = self.config.app_id;
        let general = keys::resolve_exempt_key(ExemptRole::General, address, None).await;
        let referral =
            keys::resolve_exempt_key(ExemptRole::Referral, address, Some(self.ledger.as_ref()))
                .await;

        vec![
            BoxReference {
                app_id,
                name: keys::asset_key(asset_id),
                write: false,
            },
            BoxReference {
                app_id,
                name: keys::user_key(asset_id, address),
                write: true,
            },
            BoxReference {
                app_id,
                name: general,
                write: false,
            },
            BoxReference {
                app_id,
                name: referral,
                write: false,
            },
        ]
    }

    /// A missing holding means not opted in; an unreadable one is assumed opted in
    /// so no spurious opt-in lands in the group.
    async fn is_opted_in(&self, address: &Address, asset_id: u64) -> bool {
        match self.ledger.asset_holding(address, asset_id).await {
            Ok(holding) => holding.is_some(),
            Err(LedgerError::NotFound(_)) => false,
            Err(e) => {
                tracing::warn!(
                    "Opt-in lookup for asset {} failed, assuming opted in: {}",
                    asset_id,
                    e
                );
                true
            }
        }
    }

    async fn user_balance(&self, address: &Address, asset_id: u64) -> u64 {
        match self.ledger.asset_holding(address, asset_id).await {
            Ok(holding) => holding.unwrap_or(0),
            Err(e) => {
                tracing::warn!("Balance lookup for asset {} failed, using 0: {}", asset_id, e);
                0
            }
        }
    }

    async fn is_freeze_eligible(
        &self,
        client: &dyn ProtocolClient,
        address: &Address,
        asset_id: u64,
    ) -> Result<bool> {
        if client.is_address_exempt(address, asset_id).await? {
            return Ok(false);
        }
        if client.is_address_maybe_exempt_app(address, asset_id).await? {
            return Ok(false);
        }
        Ok(true)
    }
}

#[async_trait]
impl SwapMiddleware for FirstStageMiddleware {
    fn name(&self) -> &'static str {
        MIDDLEWARE_NAME
    }

    fn version(&self) -> &'static str {
        MIDDLEWARE_VERSION
    }

    /// Only swaps touching at least one non-native asset
    fn should_apply(&self, from_asset_id: u64, to_asset_id: u64) -> bool {
        from_asset_id != 0 || to_asset_id != 0
    }

    async fn adjust_quote_params(&self, params: QuoteParams) -> Result<AdjustedQuoteParams> {
        if params.address.is_none() {
            return Err(MiddlewareError::MissingAddress);
        }

        let mut reserved_txns = 0usize;
        let mut adjusted_amount = params.amount;

        for asset_id in [params.from_asset_id, params.to_asset_id] {
            if asset_id == 0 {
                continue;
            }
            let Some(record) = self.find_asset_record(asset_id).await? else {
                continue;
            };

            if record.flags.any_tax() {
                reserved_txns += self.config.reserved_txns_per_asset;
            }
            if record.flags.sell_tax && asset_id == params.from_asset_id {
                adjusted_amount = tax::sell_side_amount(adjusted_amount, record.total_tax_bps)?;
            }
            if record.flags.buy_tax && asset_id == params.to_asset_id {
                adjusted_amount = tax::buy_side_amount(adjusted_amount, record.total_tax_bps)?;
            }
        }

        let max_group_size = tax::effective_group_size(
            params
                .max_group_size
                .unwrap_or(self.config.default_max_group_size),
            reserved_txns,
        );

        tracing::debug!(
            "Adjusted quote {} -> {} ({} slots reserved, group ceiling {})",
            params.amount,
            adjusted_amount,
            reserved_txns,
            max_group_size
        );

        Ok(AdjustedQuoteParams {
            params: QuoteParams {
                amount: adjusted_amount,
                max_group_size: Some(max_group_size),
                opt_in: Some(false),
                ..params
            },
            adjusted_amount,
            reserved_txns,
        })
    }

    async fn before_swap(&self, context: &SwapContext) -> Result<Vec<TransactionWithSigner>> {
        let mut session = self.session(context);
        if !session.begin() {
            return Ok(Vec::new());
        }
        session.before_swap().await
    }

    async fn after_swap(&self, context: &SwapContext) -> Result<Vec<TransactionWithSigner>> {
        let mut session = self.session(context);
        if !session.begin() {
            return Ok(Vec::new());
        }
        session.after_swap().await
    }
}

/// State for one swap.
///
/// Asset records are cached for the session only and dropped when it reaches
/// [`SwapPhase::Done`].
pub struct SwapSession<'a> {
    middleware: &'a FirstStageMiddleware,
    context: &'a SwapContext,
    id: Uuid,
    phase: SwapPhase,
    records: HashMap<u64, Option<AssetRecord>>,
}

impl<'a> SwapSession<'a> {
    fn new(middleware: &'a FirstStageMiddleware, context: &'a SwapContext) -> Self {
        Self {
            middleware,
            context,
            id: Uuid::new_v4(),
            phase: SwapPhase::NotApplicable,
            records: HashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> SwapPhase {
        self.phase
    }

    /// Returns false, leaving the session inert, for native-to-native swaps
    pub fn begin(&mut self) -> bool {
        if self.phase == SwapPhase::NotApplicable
            && self
                .middleware
                .should_apply(self.context.from_asset_id, self.context.to_asset_id)
        {
            self.phase = SwapPhase::PreparingPre;
        }
        self.phase != SwapPhase::NotApplicable
    }

    fn expect_phase(&self, expected: &'static [SwapPhase]) -> Result<()> {
        if expected.contains(&self.phase) {
            Ok(())
        } else {
            Err(MiddlewareError::InvalidPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    async fn record(&mut self, asset_id: u64) -> Result<Option<AssetRecord>> {
        if let Some(cached) = self.records.get(&asset_id) {
            return Ok(cached.clone());
        }
        let record = self.middleware.find_asset_record(asset_id).await?;
        self.records.insert(asset_id, record.clone());
        Ok(record)
    }

    fn with_signer(&self, txns: Vec<TransactionDescriptor>) -> Vec<TransactionWithSigner> {
        txns.into_iter()
            .map(|txn| TransactionWithSigner {
                txn,
                signer: self.context.signer.clone(),
            })
            .collect()
    }

    /// Transactions to place ahead of the swap
    pub async fn before_swap(&mut self) -> Result<Vec<TransactionWithSigner>> {
        self.expect_phase(&[SwapPhase::PreparingPre])?;

        let ctx = self.context;
        let sender = ctx.address;
        let client = self.middleware.client(&sender).await;
        let mut txns = Vec::new();

        let mut asset_ids = vec![ctx.from_asset_id];
        if ctx.to_asset_id != ctx.from_asset_id {
            asset_ids.push(ctx.to_asset_id);
        }

        for asset_id in asset_ids {
            if asset_id == 0 {
                continue;
            }

            if !self.middleware.is_opted_in(&sender, asset_id).await {
                tracing::debug!("[{}] Opting {} in to asset {}", self.id, sender, asset_id);
                txns.push(TransactionDescriptor::opt_in(
                    sender,
                    asset_id,
                    &ctx.suggested_params,
                ));
            }

            let Some(_record) = self.record(asset_id).await? else {
                tracing::debug!("[{}] Asset {} is not protocol-enabled", self.id, asset_id);
                continue;
            };

            let boxes = self.middleware.box_references(&sender, asset_id).await;
            let freeze_eligible = self
                .middleware
                .is_freeze_eligible(client.as_ref(), &sender, asset_id)
                .await?;
            let user_box_exists = match client.user_box_exists(&sender, asset_id).await {
                Ok(exists) => exists,
                Err(e) => {
                    tracing::warn!(
                        "[{}] User box lookup for asset {} failed, treating as absent: {}",
                        self.id,
                        asset_id,
                        e
                    );
                    false
                }
            };

            // Always true for ids drawn from this swap; kept as the registration guard
            let is_swap_leg = asset_id == ctx.from_asset_id || asset_id == ctx.to_asset_id;
            if freeze_eligible && !user_box_exists && is_swap_leg {
                tracing::debug!(
                    "[{}] Registering {} for freeze tracking of asset {}",
                    self.id,
                    sender,
                    asset_id
                );
                let fees = &self.middleware.config.fees;
                let mbr = TransactionDescriptor::Payment {
                    sender,
                    receiver: client.app_address(),
                    amount: fees.freeze_mbr,
                    params: ctx.suggested_params.clone(),
                };
                let freeze = client
                    .freeze(FreezeCall {
                        sender,
                        asset_id,
                        refreeze_address: sender,
                        mbr,
                        boxes: boxes.clone(),
                        params: ctx.suggested_params.clone(),
                        extra_fee: fees.freeze_extra_fee,
                    })
                    .await?;
                txns.extend(freeze);
            }

            let user_balance = self.middleware.user_balance(&sender, asset_id).await;
            let top = client
                .general_operations_top(TopCall {
                    sender,
                    asset_id,
                    user_balance,
                    boxes,
                    params: ctx.suggested_params.clone(),
                    extra_fee: self.middleware.config.fees.top_extra_fee,
                })
                .await?;
            txns.extend(top);
        }

        self.phase = SwapPhase::PreparedPre;
        tracing::info!(
            "[{}] before_swap for {}: {} transactions",
            self.id,
            sender,
            txns.len()
        );
        Ok(self.with_signer(txns))
    }

    /// Settlement transactions to place after the swap.
    ///
    /// The destination leg is evaluated even when it equals the source, so a
    /// same-asset swap settles twice with the source leg also counted as a
    /// destination.
    pub async fn after_swap(&mut self) -> Result<Vec<TransactionWithSigner>> {
        self.expect_phase(&[SwapPhase::PreparingPre, SwapPhase::PreparedPre])?;
        self.phase = SwapPhase::PreparingPost;

        let ctx = self.context;
        let client = self.middleware.client(&ctx.address).await;
        let mut txns = Vec::new();

        let legs = [
            (ctx.from_asset_id, true, ctx.from_asset_id == ctx.to_asset_id),
            (ctx.to_asset_id, false, true),
        ];
        for (asset_id, is_source, is_destination) in legs {
            let settlement = self
                .settle(client.as_ref(), asset_id, is_source, is_destination)
                .await?;
            txns.extend(settlement);
        }

        self.phase = SwapPhase::Done;
        self.records.clear();
        tracing::info!(
            "[{}] after_swap for {}: {} transactions",
            self.id,
            ctx.address,
            txns.len()
        );
        Ok(self.with_signer(txns))
    }

    async fn settle(
        &mut self,
        client: &dyn ProtocolClient,
        asset_id: u64,
        is_source: bool,
        is_destination: bool,
    ) -> Result<Vec<TransactionDescriptor>> {
        if asset_id == 0 {
            return Ok(Vec::new());
        }
        let Some(record) = self.record(asset_id).await? else {
            return Ok(Vec::new());
        };

        let ctx = self.context;
        let config = &self.middleware.config;
        let tax_amount = tax::settlement_tax(&record, &ctx.quote, is_source, is_destination)?;
        tracing::debug!(
            "[{}] Asset {} owes {} in tax ({} bps, source={}, destination={})",
            self.id,
            asset_id,
            tax_amount,
            record.total_tax_bps,
            is_source,
            is_destination
        );

        let tax_payment = TransactionDescriptor::AssetTransfer {
            sender: ctx.address,
            receiver: client.app_address(),
            asset_id,
            amount: tax_amount,
            params: ctx.suggested_params.clone(),
        };

        // An unset pool decodes to the zero address, which doubles as the sentinel
        let pool_account = record.main_pool;
        let project_account = self
            .middleware
            .ledger
            .asset_reserve(asset_id)
            .await?
            .unwrap_or(Address::ZERO);

        client
            .general_operations_bottom(BottomCall {
                sender: ctx.address,
                asset_id,
                tax_payment,
                referral: config.referral,
                accounts: vec![
                    pool_account,
                    config.bonfire_wallet,
                    config.deployer_wallet,
                    project_account,
                ],
                foreign_apps: vec![config.tm_app_id],
                params: ctx.suggested_params.clone(),
                extra_fee: config.fees.bottom_extra_fee,
            })
            .await
    }
}
