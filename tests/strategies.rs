mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::Span;

use common::*;
use zarban_arb_keeper::{
    errors::KeeperError,
    strategy::{find_best_opportunity, ArbitrageStrategy, BuyDexSellCex, LegPricing, SellDexBuyCex},
    types::{Side, Symbol},
};

async fn buy_strategy(zar: Decimal, threshold: Decimal) -> (BuyDexSellCex, Arc<MockQuoter>) {
    let quoter = MockQuoter::new(stepped_pool);
    let strategy = BuyDexSellCex::new(
        venues(
            paper_exchange(dec!(1000), Decimal::ZERO).await,
            quoter.clone(),
            Arc::new(MockDexTrader::new(zar, dec!(500))),
        ),
        strategy_config(threshold),
        Span::none(),
    );
    (strategy, quoter)
}

#[tokio::test]
async fn setup_converts_rates_and_rial_to_toman() {
    let exchange = paper_exchange(dec!(10), dec!(10000000)).await;
    let mut strategy = SellDexBuyCex::new(
        venues(
            exchange,
            MockQuoter::new(|q| q),
            Arc::new(MockDexTrader::new(dec!(1), dec!(2))),
        ),
        strategy_config(Decimal::ZERO),
        Span::none(),
    );

    let markets = strategy.setup().await.unwrap().clone();
    assert_eq!(markets.nobitex.price(Symbol::Usdt).unwrap(), dec!(60000));
    assert_eq!(markets.nobitex.price(Symbol::Eth).unwrap(), dec!(100000000));
    assert_eq!(markets.nobitex.balance(Symbol::Tmn), dec!(1000000));
    assert_eq!(markets.uniswap.balance(Symbol::Dai), dec!(2));

    strategy.teardown();
    assert!(strategy.markets().is_none());
}

#[tokio::test]
async fn scan_picks_most_profitable_quantity() {
    let (mut strategy, _) = buy_strategy(dec!(1000000), dec!(5000)).await;
    strategy.setup().await.unwrap();

    let best = strategy.evaluate().await.unwrap().expect("opportunity");

    assert_eq!(best.quantity, dec!(50));
    // DEX: 50 * 60,000 - 2,900 ZAR * 1,000 - 1,000 gas; CEX: 50 * 60,000 * -0.25%
    assert_eq!(best.estimated_profit(), dec!(91500));
    assert_eq!(best.dex_leg.side, Side::Buy);
    assert_eq!(best.dex_leg.amount_in, dec!(2900));
    assert_eq!(best.cex_leg.amount(), dec!(50));
}

#[tokio::test]
async fn scan_stops_at_first_unaffordable_quantity() {
    let (mut strategy, quoter) = buy_strategy(dec!(2000), dec!(5000)).await;
    strategy.setup().await.unwrap();

    let best = strategy.evaluate().await.unwrap().expect("opportunity");

    // 35 DAI needs 2,030 ZAR
    assert_eq!(best.quantity, dec!(34));
    assert_eq!(quoter.max_quoted(), Some(dec!(35)));
}

#[tokio::test]
async fn orders_below_exchange_minimum_are_skipped() {
    let (mut strategy, _) = buy_strategy(dec!(1000000), dec!(5000)).await;
    let markets = strategy.setup().await.unwrap().clone();

    // 5 USDT is worth exactly the 300,000 TMN minimum
    let err = strategy.cex_candidate(&markets, dec!(5)).await.unwrap_err();
    assert!(err.is_invalid_amount());
    assert!(strategy.cex_candidate(&markets, dec!(6)).await.is_ok());
}

#[tokio::test]
async fn empty_book_fails_evaluation() {
    let exchange = paper_exchange(dec!(1000), Decimal::ZERO).await;
    exchange
        .set_order_book(Symbol::Usdt, Symbol::Irt, Default::default())
        .await;
    let mut strategy = BuyDexSellCex::new(
        venues(
            exchange,
            MockQuoter::new(stepped_pool),
            Arc::new(MockDexTrader::new(dec!(1000000), dec!(500))),
        ),
        strategy_config(Decimal::ZERO),
        Span::none(),
    );
    strategy.setup().await.unwrap();

    let err = strategy.evaluate().await.unwrap_err();
    assert!(matches!(err, KeeperError::Strategy { .. }));
    assert!(matches!(err.root(), KeeperError::InvalidPrice { .. }));
}

#[tokio::test]
async fn evaluate_before_setup_is_an_error() {
    let (strategy, _) = buy_strategy(dec!(1000000), dec!(5000)).await;
    assert!(matches!(
        strategy.evaluate().await,
        Err(KeeperError::MarketDataUnavailable { .. })
    ));
}

/// 62 ZAR per DAI against 61,000 TMN asks: 850 TMN per DAI minus 1,000 gas.
async fn sell_strategy(rial: Decimal, threshold: Decimal) -> (SellDexBuyCex, Arc<MockQuoter>) {
    let quoter = MockQuoter::new(|qty| qty * dec!(62));
    let strategy = SellDexBuyCex::new(
        venues(
            paper_exchange(Decimal::ZERO, rial).await,
            quoter.clone(),
            Arc::new(MockDexTrader::new(Decimal::ZERO, dec!(500))),
        ),
        strategy_config(threshold),
        Span::none(),
    );
    (strategy, quoter)
}

#[tokio::test]
async fn sell_side_is_capped_by_toman_balance() {
    let (mut strategy, quoter) = sell_strategy(dec!(10000000), dec!(5000)).await;
    strategy.setup().await.unwrap();

    let best = strategy.evaluate().await.unwrap().expect("opportunity");

    // 17 USDT at 61,000 exceeds the 1,000,000 TMN balance
    assert_eq!(best.quantity, dec!(16));
    assert_eq!(best.estimated_profit(), dec!(12600));
    assert_eq!(best.cex_leg.side, Side::Buy);
    assert_eq!(best.cex_leg.amount(), dec!(16));
    assert_eq!(quoter.max_quoted(), Some(dec!(17)));
}

#[tokio::test]
async fn profit_below_threshold_is_not_an_opportunity() {
    let (mut strategy, _) = sell_strategy(dec!(10000000), dec!(20000)).await;
    strategy.setup().await.unwrap();

    assert!(strategy.evaluate().await.unwrap().is_none());
}

#[tokio::test]
async fn non_positive_step_is_rejected() {
    let (mut strategy, _) = sell_strategy(dec!(10000000), dec!(0)).await;
    let markets = strategy.setup().await.unwrap().clone();
    let mut config = strategy_config(Decimal::ZERO);
    config.step_qty = Decimal::ZERO;

    let err = find_best_opportunity(&strategy, &markets, &config, dec!(10), &Span::none())
        .await
        .unwrap_err();
    assert!(err.is_invalid_amount());
}
