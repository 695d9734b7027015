//! Engine configuration.
//!
//! All economics are fixed at construction: the click fee, the multiplier
//! purchase tiers, the per-rank payout table, history capacity, the
//! reserved no-referrer sentinel, and the privileged operator address.
//! Hosts either take the compiled defaults or load a TOML file with
//! amounts written in whole coins.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::{fs, path::Path};

use crate::clicker_constants as consts;

/// One multiplier purchase tier: paying exactly `cost` base units adds
/// `units` to the buyer's multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiplierTier {
    pub cost: u128,
    pub units: u64,
}

#[derive(Debug, Clone)]
pub struct ClickerConfig {
    /// Exact fee per click, in base units.
    pub click_fee: u128,

    /// Purchase tiers, matched by exact cost.
    pub multiplier_tiers: Vec<MultiplierTier>,

    /// Per-rank payout shares in basis points; index = rank - 1. The table
    /// length is the top-N cutoff.
    pub payout_bps: Vec<u16>,

    /// Epoch snapshots retained before eviction.
    pub history_cap: usize,

    /// Reserved username meaning "no referrer".
    pub no_referrer: String,

    /// Only this caller may trigger settlement.
    pub operator: String,
}

impl Default for ClickerConfig {
    fn default() -> Self {
        Self {
            click_fee: consts::CLICK_FEE,
            multiplier_tiers: consts::MULTIPLIER_TIERS
                .iter()
                .map(|&(coins, units)| MultiplierTier {
                    cost: coins as u128 * consts::UNITS_PER_COIN,
                    units,
                })
                .collect(),
            payout_bps: consts::PAYOUT_BPS.clone(),
            history_cap: consts::HISTORY_CAP,
            no_referrer: consts::NO_REFERRER.to_string(),
            operator: consts::operator_address(),
        }
    }
}

impl ClickerConfig {
    /// Number of ranked winners paid per epoch.
    pub fn top_n(&self) -> usize {
        self.payout_bps.len()
    }

    pub fn validate(&self) -> Result<()> {
        if self.click_fee == 0 {
            return Err(anyhow!("click_fee must be nonzero"));
        }
        if self.multiplier_tiers.is_empty() {
            return Err(anyhow!("at least one multiplier tier is required"));
        }
        for tier in &self.multiplier_tiers {
            if tier.cost == 0 || tier.units == 0 {
                return Err(anyhow!("multiplier tiers must have nonzero cost and units"));
            }
        }
        let mut costs: Vec<u128> = self.multiplier_tiers.iter().map(|t| t.cost).collect();
        costs.sort_unstable();
        costs.dedup();
        if costs.len() != self.multiplier_tiers.len() {
            return Err(anyhow!("multiplier tier costs must be unique"));
        }
        if self.payout_bps.is_empty() {
            return Err(anyhow!("payout table must not be empty"));
        }
        let total: u32 = self.payout_bps.iter().map(|&b| b as u32).sum();
        if total > 10_000 {
            return Err(anyhow!(
                "payout table allocates {} bps, more than the pool",
                total
            ));
        }
        if self.history_cap == 0 {
            return Err(anyhow!("history_cap must be at least 1"));
        }
        if self.no_referrer.is_empty() {
            return Err(anyhow!("no_referrer sentinel must not be empty"));
        }
        if self.operator.len() < 12 {
            return Err(anyhow!("operator address looks invalid/empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TierFile {
    cost_coins: f64,
    units: u64,
}

/// On-disk shape: amounts in whole coins, converted on load.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    click_fee_coins: f64,
    multiplier_tiers: Vec<TierFile>,
    #[serde(default)]
    history_cap: Option<usize>,
    #[serde(default)]
    no_referrer: Option<String>,
    operator_address: String,
}

/// Load and validate a TOML config file. The payout table is not
/// file-configurable; it stays at the compiled schedule.
pub fn load_config(path: &str) -> Result<ClickerConfig> {
    let raw = fs::read_to_string(Path::new(path))?;
    let file: ConfigFile = toml::from_str(&raw)?;

    let mut cfg = ClickerConfig {
        click_fee: consts::coin_amount(file.click_fee_coins),
        multiplier_tiers: file
            .multiplier_tiers
            .iter()
            .map(|t| MultiplierTier {
                cost: consts::coin_amount(t.cost_coins),
                units: t.units,
            })
            .collect(),
        operator: file.operator_address,
        ..ClickerConfig::default()
    };
    if let Some(cap) = file.history_cap {
        cfg.history_cap = cap;
    }
    if let Some(sentinel) = file.no_referrer {
        cfg.no_referrer = sentinel;
    }
    cfg.validate()?;
    Ok(cfg)
}
