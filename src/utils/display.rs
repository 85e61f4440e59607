//! Display and printing utilities

use rust_decimal::Decimal;
use std::time::Instant;
use tracing::{info, warn};

use crate::strategy::{ArbitrageOpportunity, OrderCandidate};

/// Groups the integer part in thousands: `1234567.5` -> `1,234,567.50`.
pub fn comma_separate(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

fn print_leg(label: &str, leg: &OrderCandidate) {
    warn!(
        "   {} {} {} on {}: in {} {} / out {} {}",
        label,
        leg.side,
        leg.pair,
        leg.venue,
        leg.amount_in,
        leg.source(),
        leg.amount_out,
        leg.destination()
    );
    warn!(
        "      cost {} TMN (network {}), revenue {} TMN",
        comma_separate(leg.estimated_cost.total()),
        comma_separate(leg.estimated_cost.network_fee),
        comma_separate(leg.estimated_revenue)
    );
}

pub fn print_arbitrage_opportunity(opportunity: &ArbitrageOpportunity) {
    warn!("\n🎯 ARBITRAGE OPPORTUNITY ({})", opportunity.strategy);
    warn!("📦 Quantity: {}", opportunity.quantity);
    print_leg("DEX", &opportunity.dex_leg);
    print_leg("CEX", &opportunity.cex_leg);
    warn!(
        "💰 Estimated profit: {} TMN",
        comma_separate(opportunity.estimated_profit())
    );
}

pub fn print_cycle_stats(start_time: Instant, cycles: u64, executed: u64, failed: u64) {
    let runtime = start_time.elapsed().as_secs() / 60;

    info!("\n📊 Session Statistics ({} minutes)", runtime);
    info!("     Cycles: {}", cycles);
    info!("     Trades executed: {}", executed);
    info!("     Strategy failures: {}", failed);
    info!("");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn groups_thousands() {
        assert_eq!(comma_separate(dec!(1234567.5)), "1,234,567.50");
        assert_eq!(comma_separate(dec!(999)), "999.00");
        assert_eq!(comma_separate(dec!(-91500)), "-91,500.00");
        assert_eq!(comma_separate(Decimal::ZERO), "0.00");
    }
}
