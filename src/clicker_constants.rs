// SPDX-License-Identifier: Apache-2.0

// Clicker Engine Constants
// Hard-coded economics for deterministic ledger behavior.

use once_cell::sync::Lazy;

// ============================
// Currency
// ============================

/// Decimal places in the settlement currency.
pub const COIN_DECIMALS: u32 = 18;

/// Base units per whole coin (10^18).
pub const UNITS_PER_COIN: u128 = 1_000_000_000_000_000_000;

/// Fixed fee for a single click, in base units (0.1 coin). Payment must
/// match exactly, in both directions.
pub const CLICK_FEE: u128 = UNITS_PER_COIN / 10;

/// Multiplier purchase tiers as (cost in whole coins, units added).
/// Paying a tier's exact cost adds its unit count; the raw currency amount
/// never feeds the multiplier directly.
pub const MULTIPLIER_TIERS: &[(u64, u64)] = &[(10, 10), (25, 25), (50, 50)];

// ============================
// Epoch settlement
// ============================

/// Ranked winners paid per epoch.
pub const TOP_WINNERS: usize = 50;

/// Epoch snapshots retained before the oldest is evicted.
pub const HISTORY_CAP: usize = 5;

/// Reserved username meaning "registered without a referrer". Can never be
/// claimed as a username.
pub const NO_REFERRER: &str = "noReferrer";

/// Payout schedule as (rank span, basis points per rank in the span).
/// Rank 1 takes 15%, tapering to 0.45% each for ranks 31..=50. Spans cover
/// exactly TOP_WINNERS ranks and allocate exactly 10_000 bps.
pub const PAYOUT_SPANS_BPS: &[(usize, u16)] = &[
    (1, 1_500),
    (1, 1_200),
    (1, 1_000),
    (1, 800),
    (1, 600),
    (5, 300),
    (10, 150),
    (10, 100),
    (20, 45),
];

/// Flattened per-rank payout table, index = rank - 1.
pub static PAYOUT_BPS: Lazy<Vec<u16>> = Lazy::new(|| {
    let mut table = Vec::with_capacity(TOP_WINNERS);
    for &(span, bps) in PAYOUT_SPANS_BPS {
        for _ in 0..span {
            table.push(bps);
        }
    }
    table
});

// ============================
// Operator
// ============================

/// Default privileged settlement caller.
pub const DEFAULT_OPERATOR_ADDRESS: &str = "0x00000000000000000000000000000000c11c4e01";

/// Operator address, overridable via env so hosts can rotate the trigger
/// key without rebuilding.
pub fn operator_address() -> String {
    std::env::var("CLICKER_OPERATOR_ADDRESS")
        .unwrap_or_else(|_| DEFAULT_OPERATOR_ADDRESS.to_string())
}

// ============================
// Amount helpers
// ============================

/// Convert a human coin amount to base units. Scales through micro-coins so
/// fee schedules written as short decimals stay exact at 18 decimals.
pub fn coin_amount(coins: f64) -> u128 {
    let micro = (coins * 1_000_000.0).round() as u128;
    micro * (UNITS_PER_COIN / 1_000_000)
}

/// Render base units as a trimmed decimal string ("0.01", "1.23", "15").
/// Collaborators display amounts as decimal strings, never floats.
pub fn format_amount(units: u128) -> String {
    let whole = units / UNITS_PER_COIN;
    let frac = units % UNITS_PER_COIN;
    if frac == 0 {
        return whole.to_string();
    }
    let mut digits = format!("{:018}", frac);
    while digits.ends_with('0') {
        digits.pop();
    }
    format!("{}.{}", whole, digits)
}
