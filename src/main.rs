//! Zarban arbitrage keeper - main entry point

use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio::time;
use tracing::{error, info, info_span, warn};
use zarban_arb_keeper::{
    cex::{Exchange, NobitexClient, NobitexSettings, PaperExchange},
    chain::{ChainClient, EventHandler, FileCheckpoint, IndexerSettings, LogHandler, PollingIndexer},
    config::Environment,
    dex::{DexTrader, DexTraderClient, IDexTrader, Quoter, UniswapV3Quoter},
    execution::{Executor, ExecutorSettings},
    storage::{Journal, MemoryStore, Store},
    strategy::{ArbitrageStrategy, BuyDexSellCex, SellDexBuyCex, StrategyConfig, Venues},
    *,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = CONFIG.clone();

    // Initialize logging
    let _logging_guard = utils::setup_logging(&config.log_level, &config.output_dir)?;
    utils::setup_output_directories(&config.output_dir)?;

    info!("⚖️  Zarban Arbitrage Keeper v{}", env!("CARGO_PKG_VERSION"));
    info!("📋 Configuration:");
    info!("   Environment: {:?}", config.environment);
    info!("   Quantity scan: start {} step {}", config.start_qty, config.step_qty);
    info!("   Profit threshold: {} TMN", config.profit_threshold);
    info!("   Slippage: {}", config.slippage);
    info!("   Cycle interval: {:?}", config.cycle_interval);
    info!("   Indexer: {} workers, batch {}", config.indexer_pool_size, config.indexer_batch_size());

    // Chain access
    let chain_url = config
        .chain_url
        .as_deref()
        .context("CHAIN_URL is required")?;
    let provider = network::setup_chain_provider(chain_url).await?;

    let dex_trader_address = config
        .dex_trader_address
        .context("DEX_TRADER_ADDRESS is required")?;
    let signer = PrivateKeySigner::from_str(
        config.private_key.as_deref().context("PRIVATE_KEY is required")?,
    )
    .context("Failed to parse private key")?;

    let tokens = config.tokens();
    let dex_trader: Arc<dyn DexTrader> = Arc::new(DexTraderClient::new(
        provider.clone(),
        dex_trader_address,
        tokens.clone(),
        signer,
    ));
    let quoter: Arc<dyn Quoter> = Arc::new(UniswapV3Quoter::new(
        provider.clone(),
        config.uniswap_v3_quoter,
    ));

    // Exchange access; testnet trades on paper against live prices
    let nobitex: Arc<dyn Exchange> = Arc::new(NobitexClient::new(NobitexSettings {
        base_url: config.nobitex_url.clone(),
        api_key: config.nobitex_key.clone(),
        timeout: config.nobitex_timeout,
        minimum_order_toman: config.nobitex_minimum_order_toman,
    })?);
    let exchange: Arc<dyn Exchange> = match config.environment {
        Environment::Mainnet => nobitex,
        Environment::Testnet => {
            info!("   ⚠️  TESTNET MODE - exchange orders are simulated");
            let paper =
                PaperExchange::with_market_data(nobitex, config.nobitex_minimum_order_toman);
            paper
                .fund(config.paper_usdt_balance, config.paper_toman_balance)
                .await;
            info!(
                "   Paper wallet: {} USDT, {} TMN",
                config.paper_usdt_balance, config.paper_toman_balance
            );
            Arc::new(paper)
        }
    };

    // Indexer
    let chain_client: Arc<dyn ChainClient> = provider.clone();
    let checkpoint = Arc::new(FileCheckpoint::new(
        &config.checkpoint_path,
        config.indexer_start_block,
    ));
    let mut indexer = PollingIndexer::new(
        chain_client,
        checkpoint,
        IndexerSettings {
            batch_size: config.indexer_batch_size(),
            pool_size: config.indexer_pool_size,
            poll_interval: config.block_interval,
        },
        info_span!("indexer"),
    );
    let trade_events: Arc<dyn LogHandler> = Arc::new(EventHandler::<IDexTrader::Trade>::new(
        |header, log, event| {
            info!(
                block = header.number,
                tx_hash = ?log.transaction_hash,
                token_in = %event.token0,
                token_out = %event.token1,
                amount_in = %event.amountIn,
                amount_out = %event.amountOut,
                "🔔 DexTrader trade observed"
            );
            Ok(())
        },
    ));
    indexer.register_event_handlers([trade_events]);
    indexer.register_addresses([dex_trader_address]);
    indexer.init(config.block_interval).await?;
    let receipts = indexer.handle();

    let indexer_task = tokio::spawn(async move {
        if let Err(e) = indexer.run().await {
            error!("🚨 Indexer stopped: {}", e);
        }
    });

    // Persistence
    let store: Arc<dyn Store> = Arc::new(MemoryStore::with_journal(Journal::new(
        &config.output_dir,
    )));
    let pair_id = store
        .create_pair_if_not_exist(&Pair::new(Symbol::Dai, Symbol::Zar))
        .await?;

    // Strategies
    let venues = Venues {
        exchange: exchange.clone(),
        quoter,
        dex_trader: dex_trader.clone(),
        tokens: tokens.clone(),
        pool_fee: config.pool_fee,
    };
    let strategy_config = StrategyConfig {
        start_qty: config.start_qty,
        step_qty: config.step_qty,
        profit_threshold: config.profit_threshold,
        slippage: config.slippage,
    };
    let strategies: Vec<Box<dyn ArbitrageStrategy>> = vec![
        Box::new(BuyDexSellCex::new(
            venues.clone(),
            strategy_config.clone(),
            info_span!("strategy", name = "buy-dex-sell-cex"),
        )),
        Box::new(SellDexBuyCex::new(
            venues,
            strategy_config,
            info_span!("strategy", name = "sell-dex-buy-cex"),
        )),
    ];

    let mut executor = Executor::new(
        store,
        strategies,
        exchange,
        dex_trader,
        receipts,
        tokens,
        ExecutorSettings {
            pair_id,
            pool_fee: config.pool_fee,
            receipt_timeout: config.receipt_timeout,
            order_poll_interval: config.nobitex_order_status_interval,
            order_retry_timeout: config.nobitex_retry_timeout,
            evaluation_timeout: config.evaluation_timeout,
        },
        info_span!("executor"),
    );

    info!("\n🚀 Starting keeper loop...\n");

    let start_time = Instant::now();
    let (mut cycles, mut executed, mut failed) = (0u64, 0u64, 0u64);
    let mut interval = time::interval(config.cycle_interval);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if indexer_task.is_finished() {
                    error!("Indexer task is no longer running, stopping keeper");
                    break;
                }
                match executor.run_cycle().await {
                    Ok(report) => {
                        cycles += 1;
                        executed += report.executed as u64;
                        failed += report.failed.len() as u64;
                    }
                    Err(e) => warn!("Cycle bookkeeping failed: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("\n📛 Received shutdown signal (Ctrl+C)...");
                break;
            }
        }
    }

    indexer_task.abort();
    info!("\n🛑 Shutting down gracefully...");
    utils::print_cycle_stats(start_time, cycles, executed, failed);

    Ok(())
}
