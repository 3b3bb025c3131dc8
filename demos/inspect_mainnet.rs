//! Inspect the swap hooks against mainnet
//!
//! Decodes the asset boxes for two protocol assets, then prints the quote
//! adjustment and the transactions the middleware would add before and after
//! a swap between them. Nothing is signed or submitted.
//!
//! Run with: cargo run --example inspect_mainnet

use anyhow::Result;
use std::sync::Arc;

use firststage_middleware::protocol::algod::AlgodClient;
use firststage_middleware::protocol::config::ProtocolConfig;
use firststage_middleware::protocol::middleware::{QuoteMode, QuoteParams};
use firststage_middleware::protocol::tax::SwapQuote;
use firststage_middleware::protocol::transaction::{
    CallArg, EmptySigner, TransactionDescriptor, TransactionWithSigner,
};
use firststage_middleware::protocol::{
    Address, FirstStageMiddleware, Ledger, SwapContext, SwapMiddleware,
};

const TEST_ADDRESS: &str = "NOLXAGDW6KLLX3GRIVGU72HPHW7WWUN2VE7GUZOLYKEG7FGM6FENVFFEXQ";
const FROM_ASSET: u64 = 2_154_668_640;
const TO_ASSET: u64 = 312_769;

fn print_group(txns: &[TransactionWithSigner]) {
    if txns.is_empty() {
        println!("  ⚠️  No transactions returned");
        return;
    }

    println!("\n===== Transaction Group =====");
    for (i, wrapped) in txns.iter().enumerate() {
        match &wrapped.txn {
            TransactionDescriptor::AssetTransfer {
                sender,
                receiver,
                asset_id,
                amount,
                params,
            } => {
                println!("#{} axfer | Fee: {}", i + 1, params.fee);
                println!("   Sender:   {}", sender);
                println!("   Receiver: {}", receiver);
                println!("   Asset {} ({})", asset_id, amount);
            }
            TransactionDescriptor::Payment {
                sender,
                receiver,
                amount,
                params,
            } => {
                println!("#{} pay | Fee: {}", i + 1, params.fee);
                println!("   Sender:   {}", sender);
                println!("   Receiver: {}", receiver);
                println!("   Amount: {}", amount);
            }
            TransactionDescriptor::AppCall(call) => {
                println!("#{} appl | Fee: {}", i + 1, call.params.fee);
                println!("   Sender: {}", call.sender);
                let args: Vec<String> = call
                    .args
                    .iter()
                    .map(|arg| match arg {
                        CallArg::Uint(v) => v.to_string(),
                        CallArg::Address(a) => a.to_string(),
                        CallArg::Txn(_) => "<txn>".to_string(),
                    })
                    .collect();
                println!(
                    "   AppCall -> ID: {}, {}({})",
                    call.app_id,
                    call.method,
                    args.join(", ")
                );
                if !call.boxes.is_empty() {
                    println!("   Box References:");
                    for (j, b) in call.boxes.iter().enumerate() {
                        println!(
                            "     #{} AppID: {}, Name (hex): {}{}",
                            j + 1,
                            b.app_id,
                            b.name.to_hex(),
                            if b.write { " [w]" } else { "" }
                        );
                    }
                }
                for account in &call.accounts {
                    println!("   Account: {}", account);
                }
            }
        }
        println!("----------------------------");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let address: Address = TEST_ADDRESS.parse()?;
    let ledger: Arc<dyn Ledger> = Arc::new(AlgodClient::mainnet());
    let middleware = FirstStageMiddleware::new(ProtocolConfig::mainnet(), ledger.clone());

    println!("\n{}", "═".repeat(70));
    println!("🔥 {} v{}", middleware.name(), middleware.version());
    println!("   App {} ({})", middleware.config().app_id, middleware.config().app_address());
    println!("{}", "═".repeat(70));

    // 1. Asset records
    for asset_id in [FROM_ASSET, TO_ASSET] {
        match middleware.asset_record(asset_id).await {
            Ok(record) => {
                println!("\n📦 Asset {}", asset_id);
                println!("   Total tax:  {} bps", record.total_tax_bps);
                println!(
                    "   Buy/Sell:   {}/{}",
                    record.flags.buy_tax, record.flags.sell_tax
                );
                println!("   Main pool:  {}", record.main_pool);
            }
            Err(e) => println!("\n📦 Asset {}: {}", asset_id, e),
        }
    }

    // 2. Quote adjustment
    println!("\n--- adjust_quote_params ---");
    let adjusted = middleware
        .adjust_quote_params(QuoteParams {
            from_asset_id: FROM_ASSET,
            to_asset_id: TO_ASSET,
            amount: 1_000_000,
            mode: QuoteMode::FixedInput,
            address: Some(address),
            max_group_size: Some(16),
            opt_in: None,
        })
        .await?;
    println!(
        "  amount {} -> {}, {} slots reserved, group ceiling {:?}",
        1_000_000, adjusted.adjusted_amount, adjusted.reserved_txns, adjusted.params.max_group_size
    );

    // 3. Hooks
    let context = SwapContext {
        address,
        from_asset_id: FROM_ASSET,
        to_asset_id: TO_ASSET,
        signer: Arc::new(EmptySigner),
        suggested_params: ledger.suggested_params().await?,
        quote: SwapQuote::FixedInput {
            amount: 100_000_000,
        },
    };

    println!("\n--- before_swap ---");
    let before = middleware.before_swap(&context).await?;
    print_group(&before);

    println!("\n--- after_swap ---");
    let after = middleware.after_swap(&context).await?;
    print_group(&after);

    Ok(())
}
