//! Contract-call collaborator
//!
//! A [`ProtocolClient`] turns logical protocol operations into application-call
//! descriptors and answers the read-only exemption checks. Clients are built
//! per sender and kept in an append-only [`ClientCache`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::address::Address;
use super::error::Result;
use super::keys::{self, ExemptRole};
use super::ledger::Ledger;
use super::transaction::{AppCall, BoxReference, CallArg, SuggestedParams, TransactionDescriptor};

pub const FREEZE_METHOD: &str = "freeze";
pub const OPERATIONS_TOP_METHOD: &str = "generalOperationsTop";
pub const OPERATIONS_BOTTOM_METHOD: &str = "generalOperationsBottom";

// Leading flag argument of the two hook methods
const TOP_FLAG: u64 = 1;
const BOTTOM_FLAG: u64 = 2;

/// Register `refreeze_address` for freeze tracking of `asset_id`
#[derive(Debug, Clone)]
pub struct FreezeCall {
    pub sender: Address,
    pub asset_id: u64,
    pub refreeze_address: Address,
    /// Minimum-balance funding payment to the application
    pub mbr: TransactionDescriptor,
    pub boxes: Vec<BoxReference>,
    pub params: SuggestedParams,
    pub extra_fee: u64,
}

/// Pre-swap hook for one asset
#[derive(Debug, Clone)]
pub struct TopCall {
    pub sender: Address,
    pub asset_id: u64,
    pub user_balance: u64,
    pub boxes: Vec<BoxReference>,
    pub params: SuggestedParams,
    pub extra_fee: u64,
}

/// Post-swap settlement hook for one asset
#[derive(Debug, Clone)]
pub struct BottomCall {
    pub sender: Address,
    pub asset_id: u64,
    pub tax_payment: TransactionDescriptor,
    pub referral: Address,
    pub accounts: Vec<Address>,
    pub foreign_apps: Vec<u64>,
    pub params: SuggestedParams,
    pub extra_fee: u64,
}

#[async_trait]
pub trait ProtocolClient: Send + Sync {
    fn app_id(&self) -> u64;

    fn app_address(&self) -> Address {
        Address::for_application(self.app_id())
    }

    /// Whether the per-user record for `asset_id` exists yet
    async fn user_box_exists(&self, address: &Address, asset_id: u64) -> Result<bool>;

    /// Address is exempt from freeze enforcement directly
    async fn is_address_exempt(&self, address: &Address, asset_id: u64) -> Result<bool>;

    /// Address may be exempt because an application controls it
    async fn is_address_maybe_exempt_app(&self, address: &Address, asset_id: u64)
        -> Result<bool>;

    /// Returns the transaction arguments followed by the call itself
    async fn freeze(&self, call: FreezeCall) -> Result<Vec<TransactionDescriptor>>;

    async fn general_operations_top(&self, call: TopCall) -> Result<Vec<TransactionDescriptor>>;

    /// Returns the transaction arguments followed by the call itself
    async fn general_operations_bottom(
        &self,
        call: BottomCall,
    ) -> Result<Vec<TransactionDescriptor>>;
}

/// Builds one client per sender
pub trait ProtocolClientFactory: Send + Sync {
    fn client_for(&self, sender: &Address) -> Arc<dyn ProtocolClient>;
}

/// Default client: builds descriptors locally and answers exemption checks
/// from the application's exempt-wallet boxes.
///
/// Box presence only approximates the contract's read-only exemption methods
/// and ignores `asset_id`; a client that simulates those methods should replace it.
pub struct BoxClient {
    ledger: Arc<dyn Ledger>,
    app_id: u64,
}

impl BoxClient {
    pub fn new(ledger: Arc<dyn Ledger>, app_id: u64) -> Self {
        Self { ledger, app_id }
    }

    async fn box_exists(&self, key: &keys::StorageKey) -> Result<bool> {
        Ok(self.ledger.application_box(self.app_id, key).await?.is_some())
    }

    fn app_call(
        &self,
        sender: Address,
        method: &str,
        args: Vec<CallArg>,
        boxes: Vec<BoxReference>,
        params: &SuggestedParams,
        extra_fee: u64,
    ) -> AppCall {
        AppCall {
            sender,
            app_id: self.app_id,
            method: method.to_string(),
            args,
            boxes,
            accounts: Vec::new(),
            foreign_apps: Vec::new(),
            params: params.with_extra_fee(extra_fee),
        }
    }
}

#[async_trait]
impl ProtocolClient for BoxClient {
    fn app_id(&self) -> u64 {
        self.app_id
    }

    async fn user_box_exists(&self, address: &Address, asset_id: u64) -> Result<bool> {
        self.box_exists(&keys::user_key(asset_id, address)).await
    }

    async fn is_address_exempt(&self, address: &Address, _asset_id: u64) -> Result<bool> {
        self.box_exists(&keys::exempt_key(ExemptRole::General, address))
            .await
    }

    async fn is_address_maybe_exempt_app(
        &self,
        address: &Address,
        _asset_id: u64,
    ) -> Result<bool> {
        let key =
            keys::resolve_exempt_key(ExemptRole::Referral, address, Some(self.ledger.as_ref()))
                .await;
        self.box_exists(&key).await
    }

    async fn freeze(&self, call: FreezeCall) -> Result<Vec<TransactionDescriptor>> {
        let app_call = self.app_call(
            call.sender,
            FREEZE_METHOD,
            vec![
                CallArg::Uint(call.asset_id),
                CallArg::Address(call.refreeze_address),
                CallArg::Txn(Box::new(call.mbr.clone())),
            ],
            call.boxes,
            &call.params,
            call.extra_fee,
        );
        Ok(vec![call.mbr, TransactionDescriptor::AppCall(app_call)])
    }

    async fn general_operations_top(&self, call: TopCall) -> Result<Vec<TransactionDescriptor>> {
        let app_call = self.app_call(
            call.sender,
            OPERATIONS_TOP_METHOD,
            vec![
                CallArg::Uint(TOP_FLAG),
                CallArg::Uint(call.asset_id),
                CallArg::Uint(call.user_balance),
            ],
            call.boxes,
            &call.params,
            call.extra_fee,
        );
        Ok(vec![TransactionDescriptor::AppCall(app_call)])
    }

    async fn general_operations_bottom(
        &self,
        call: BottomCall,
    ) -> Result<Vec<TransactionDescriptor>> {
        let mut app_call = self.app_call(
            call.sender,
            OPERATIONS_BOTTOM_METHOD,
            vec![
                CallArg::Uint(BOTTOM_FLAG),
                CallArg::Uint(call.asset_id),
                CallArg::Txn(Box::new(call.tax_payment.clone())),
                CallArg::Address(call.referral),
            ],
            Vec::new(),
            &call.params,
            call.extra_fee,
        );
        app_call.accounts = call.accounts;
        app_call.foreign_apps = call.foreign_apps;
        Ok(vec![call.tax_payment, TransactionDescriptor::AppCall(app_call)])
    }
}

/// Builds [`BoxClient`]s sharing one ledger
pub struct BoxClientFactory {
    ledger: Arc<dyn Ledger>,
    app_id: u64,
}

impl BoxClientFactory {
    pub fn new(ledger: Arc<dyn Ledger>, app_id: u64) -> Self {
        Self { ledger, app_id }
    }
}

impl ProtocolClientFactory for BoxClientFactory {
    fn client_for(&self, _sender: &Address) -> Arc<dyn ProtocolClient> {
        Arc::new(BoxClient::new(self.ledger.clone(), self.app_id))
    }
}

/// Sender-keyed client cache.
///
/// Append-only: entries are never replaced or evicted. Lookups take the read
/// lock; a miss re-checks under the write lock so concurrent first use by the
/// same sender leaves a single entry.
#[derive(Default)]
pub struct ClientCache {
    clients: RwLock<HashMap<Address, Arc<dyn ProtocolClient>>>,
}

impl ClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_create(
        &self,
        sender: &Address,
        factory: &dyn ProtocolClientFactory,
    ) -> Arc<dyn ProtocolClient> {
        if let Some(client) = self.clients.read().await.get(sender) {
            return client.clone();
        }

        let mut clients = self.clients.write().await;
        clients
            .entry(*sender)
            .or_insert_with(|| {
                tracing::debug!("Creating protocol client for {}", sender);
                factory.client_for(sender)
            })
            .clone()
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::error::LedgerError;
    use crate::protocol::keys::StorageKey;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Ledger that only knows which boxes exist
    struct BoxesOnly {
        boxes: HashSet<Vec<u8>>,
        auth: Option<Address>,
    }

    #[async_trait]
    impl Ledger for BoxesOnly {
        async fn account_auth_address(
            &self,
            _address: &Address,
        ) -> std::result::Result<Option<Address>, LedgerError> {
            Ok(self.auth)
        }

        async fn asset_holding(
            &self,
            _address: &Address,
            _asset_id: u64,
        ) -> std::result::Result<Option<u64>, LedgerError> {
            Ok(None)
        }

        async fn application_box(
            &self,
            _app_id: u64,
            key: &StorageKey,
        ) -> std::result::Result<Option<Vec<u8>>, LedgerError> {
            Ok(self.boxes.get(key.as_bytes()).map(|_| vec![0u8; 48]))
        }

        async fn asset_reserve(
            &self,
            _asset_id: u64,
        ) -> std::result::Result<Option<Address>, LedgerError> {
            Ok(None)
        }

        async fn suggested_params(&self) -> std::result::Result<SuggestedParams, LedgerError> {
            Err(LedgerError::NotFound("params".into()))
        }
    }

    fn params() -> SuggestedParams {
        SuggestedParams {
            fee: 0,
            min_fee: 1_000,
            flat_fee: false,
            first_valid: 1,
            last_valid: 1_001,
            genesis_id: "testnet-v1.0".into(),
            genesis_hash: "SGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiI=".into(),
        }
    }

    #[tokio::test]
    async fn test_exemption_checks_read_exempt_boxes() {
        let user = Address::new([1; 32]);
        let signer = Address::new([2; 32]);
        let ledger = BoxesOnly {
            boxes: HashSet::from([keys::exempt_key(ExemptRole::Referral, &signer)
                .as_bytes()
                .to_vec()]),
            auth: Some(signer),
        };
        let client = BoxClient::new(Arc::new(ledger), 1);

        assert!(!client.is_address_exempt(&user, 5).await.unwrap());
        // Keyed by the rekeyed signer, not the account
        assert!(client.is_address_maybe_exempt_app(&user, 5).await.unwrap());
    }

    #[tokio::test]
    async fn test_freeze_emits_mbr_before_call() {
        let ledger = BoxesOnly {
            boxes: HashSet::new(),
            auth: None,
        };
        let client = BoxClient::new(Arc::new(ledger), 77);
        let sender = Address::new([4; 32]);
        let mbr = TransactionDescriptor::Payment {
            sender,
            receiver: client.app_address(),
            amount: 37_700,
            params: params(),
        };

        let txns = client
            .freeze(FreezeCall {
                sender,
                asset_id: 9,
                refreeze_address: sender,
                mbr: mbr.clone(),
                boxes: Vec::new(),
                params: params(),
                extra_fee: 2_000,
            })
            .await
            .unwrap();

        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0], mbr);
        let call = txns[1].as_app_call().unwrap();
        assert_eq!(call.method, FREEZE_METHOD);
        assert_eq!(call.app_id, 77);
        assert_eq!(call.params.fee, 3_000);
    }

    struct CountingFactory(AtomicUsize);

    impl ProtocolClientFactory for CountingFactory {
        fn client_for(&self, _sender: &Address) -> Arc<dyn ProtocolClient> {
            self.0.fetch_add(1, Ordering::SeqCst);
            let ledger = BoxesOnly {
                boxes: HashSet::new(),
                auth: None,
            };
            Arc::new(BoxClient::new(Arc::new(ledger), 1))
        }
    }

    #[tokio::test]
    async fn test_cache_builds_once_per_sender() {
        let cache = Arc::new(ClientCache::new());
        let factory = Arc::new(CountingFactory(AtomicUsize::new(0)));
        let sender = Address::new([8; 32]);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let factory = factory.clone();
            handles.push(tokio::spawn(async move {
                cache.get_or_create(&sender, factory.as_ref()).await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        cache
            .get_or_create(&Address::new([9; 32]), factory.as_ref())
            .await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(factory.0.load(Ordering::SeqCst), 2);
    }
}
