//! Epoch settlement: rank, pay, reset, snapshot, advance.
//!
//! Settlement runs as one atomic step under the engine's exclusive write
//! guard. Once authorized it cannot fail from an application error; the
//! only abort paths are storage failures and accounting faults.

use std::collections::HashMap;

use serde::Serialize;
use sled::Db;
use tracing::{info, warn};

use crate::accounts;
use crate::config::ClickerConfig;
use crate::errors::{EngineResult, FaultError};
use crate::history::{self, EpochSnapshot};
use crate::ranking;

/// Summary returned by [`run_settlement`].
#[derive(Debug, Clone, Serialize)]
pub struct SettlementSummary {
    pub epoch_id: u64,
    pub pool: u128,
    pub distributed: u128,
    pub winners: usize,
    pub accounts_reset: usize,
}

/// Basis-point share of `pool`, floored. Truncation remainders stay in the
/// pool for the next epoch.
fn mul_bps_floor(pool: u128, bps: u16) -> u128 {
    pool.saturating_mul(bps as u128) / 10_000
}

pub fn run_settlement(db: &Db, cfg: &ClickerConfig) -> EngineResult<SettlementSummary> {
    let held = accounts::held_funds(db)?;
    let mut population = accounts::all_accounts(db)?;

    let pending_total = population
        .iter()
        .fold(0u128, |acc, a| acc.saturating_add(a.pending_reward));
    if pending_total > held {
        return Err(FaultError::PendingExceedsHeld {
            pending: pending_total,
            held,
        }
        .into());
    }
    let pool = held - pending_total;

    let winners = ranking::rank_accounts(&population, cfg.top_n());
    if pool == 0 && !winners.is_empty() {
        warn!("settling with an empty pool; winners receive nothing this epoch");
    }

    // Payout pass is read-only; credits and resets apply afterwards. Ranks
    // past the eligible winner count pay nothing and their shares are not
    // redistributed.
    let mut payouts: HashMap<String, u128> = HashMap::with_capacity(winners.len());
    let mut distributed: u128 = 0;
    for (rank_idx, winner) in winners.iter().enumerate() {
        let bps = cfg.payout_bps.get(rank_idx).copied().unwrap_or(0);
        let amount = mul_bps_floor(pool, bps);
        if amount == 0 {
            continue;
        }
        payouts.insert(winner.address.clone(), amount);
        distributed = distributed.saturating_add(amount);
    }

    // Every account returns to zero each epoch, winner or not.
    let mut accounts_reset = 0usize;
    for acct in population.iter_mut() {
        let mut dirty = false;
        if let Some(amount) = payouts.get(&acct.address) {
            acct.pending_reward = acct.pending_reward.saturating_add(*amount);
            dirty = true;
        }
        if acct.clicks > 0 {
            acct.clicks = 0;
            accounts_reset += 1;
            dirty = true;
        }
        if dirty {
            accounts::put_account(db, acct)?;
        }
    }

    let epoch_id = accounts::current_epoch(db)?;
    history::append_snapshot(
        db,
        cfg.history_cap,
        &EpochSnapshot {
            epoch_id,
            ts_ms: accounts::now_ms(),
            winners: winners.clone(),
            total_distributed: distributed,
        },
    )?;
    accounts::set_epoch(db, epoch_id + 1)?;
    db.flush()?;

    info!(
        epoch = epoch_id,
        pool,
        distributed,
        winners = winners.len(),
        accounts_reset,
        "💰 epoch settled"
    );
    Ok(SettlementSummary {
        epoch_id,
        pool,
        distributed,
        winners: winners.len(),
        accounts_reset,
    })
}
