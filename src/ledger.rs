//! Fee validation and pool inflow accounting.
//!
//! Both paid operations require an exact payment match. Collected fees go
//! into held funds and become part of the next epoch's pool.

use sled::Db;
use tracing::debug;

use crate::accounts;
use crate::config::ClickerConfig;
use crate::errors::{EngineError, EngineResult};

/// One paid click: credits the account's current multiplier worth of click
/// credits and adds the fee to held funds. Returns the new click total.
pub fn click(db: &Db, cfg: &ClickerConfig, identity: &str, paid: u128) -> EngineResult<u64> {
    let mut acct = accounts::get_account(db, identity)?
        .ok_or_else(|| EngineError::NotRegistered(identity.to_string()))?;
    if paid != cfg.click_fee {
        return Err(EngineError::IncorrectFee {
            required: cfg.click_fee,
            paid,
        });
    }

    acct.clicks = acct.clicks.saturating_add(acct.multiplier);
    accounts::put_account(db, &acct)?;
    accounts::credit_held(db, paid)?;

    debug!(
        identity = %identity,
        clicks = acct.clicks,
        multiplier = acct.multiplier,
        "click credited"
    );
    Ok(acct.clicks)
}

/// Buy multiplier units. The payment must match a configured tier cost
/// exactly; the multiplier grows by the tier's unit count, not by the raw
/// currency amount. Returns the new multiplier.
pub fn purchase_multiplier(
    db: &Db,
    cfg: &ClickerConfig,
    identity: &str,
    paid: u128,
) -> EngineResult<u64> {
    let mut acct = accounts::get_account(db, identity)?
        .ok_or_else(|| EngineError::NotRegistered(identity.to_string()))?;
    let tier = cfg
        .multiplier_tiers
        .iter()
        .find(|t| t.cost == paid)
        .ok_or(EngineError::InvalidTier(paid))?;

    acct.multiplier = acct.multiplier.saturating_add(tier.units);
    accounts::put_account(db, &acct)?;
    accounts::credit_held(db, paid)?;

    debug!(
        identity = %identity,
        multiplier = acct.multiplier,
        units = tier.units,
        "multiplier purchased"
    );
    Ok(acct.multiplier)
}
