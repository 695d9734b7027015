//! Engine facade: the single mutation path over the backing store.
//!
//! Commands hold the write guard, queries the read guard. Settlement runs
//! its whole critical section under one write guard, so readers observe
//! either the pre-settlement or the post-settlement world, never an
//! intermediate one.

use std::path::Path;

use parking_lot::RwLock;
use sled::Db;

use crate::accounts::{self, Account};
use crate::claims;
use crate::config::ClickerConfig;
use crate::errors::{EngineError, EngineResult, FaultError};
use crate::history::{self, EpochSnapshot};
use crate::ledger;
use crate::ranking::{self, LeaderboardEntry};
use crate::registry;
use crate::settlement::{self, SettlementSummary};

#[derive(Debug)]
pub struct ClickerEngine {
    db: Db,
    cfg: ClickerConfig,
    state: RwLock<()>,
}

impl ClickerEngine {
    /// Open (or create) a persistent engine at `path`.
    pub fn open(path: impl AsRef<Path>, cfg: ClickerConfig) -> EngineResult<Self> {
        let db = sled::open(path)?;
        Self::with_db(db, cfg)
    }

    /// Wrap an existing database handle. Used with temporary databases in
    /// tests and by hosts that manage the database themselves.
    pub fn with_db(db: Db, cfg: ClickerConfig) -> EngineResult<Self> {
        cfg.validate()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        let engine = Self {
            db,
            cfg,
            state: RwLock::new(()),
        };
        // A fresh store starts at epoch 1
        let meta = accounts::meta_tree(&engine.db)?;
        if accounts::read_u64(&meta, accounts::KEY_EPOCH)? == 0 {
            accounts::write_u64(&meta, accounts::KEY_EPOCH, 1)?;
        }
        Ok(engine)
    }

    pub fn config(&self) -> &ClickerConfig {
        &self.cfg
    }

    // ============================
    // Commands
    // ============================

    pub fn register(
        &self,
        identity: &str,
        username: &str,
        referrer: Option<&str>,
    ) -> EngineResult<()> {
        let _guard = self.state.write();
        registry::register(&self.db, &self.cfg, identity, username, referrer)
    }

    /// One paid click. Returns the new click total.
    pub fn click(&self, identity: &str, paid: u128) -> EngineResult<u64> {
        let _guard = self.state.write();
        ledger::click(&self.db, &self.cfg, identity, paid)
    }

    /// Buy multiplier units at an exact tier cost. Returns the new
    /// multiplier.
    pub fn increase_multiplier(&self, identity: &str, paid: u128) -> EngineResult<u64> {
        let _guard = self.state.write();
        ledger::purchase_multiplier(&self.db, &self.cfg, identity, paid)
    }

    /// Drain the caller's pending reward. Returns the drained amount for
    /// the external transfer collaborator.
    pub fn claim(&self, identity: &str) -> EngineResult<u128> {
        let _guard = self.state.write();
        claims::claim(&self.db, identity)
    }

    /// Settle the current epoch. Only the configured operator may trigger
    /// this; cadence enforcement belongs to the external scheduler.
    pub fn settle(&self, caller: &str) -> EngineResult<SettlementSummary> {
        if caller != self.cfg.operator {
            return Err(EngineError::Unauthorized(caller.to_string()));
        }
        let _guard = self.state.write();
        settlement::run_settlement(&self.db, &self.cfg)
    }

    // ============================
    // Queries
    // ============================

    pub fn account(&self, identity: &str) -> EngineResult<Option<Account>> {
        let _guard = self.state.read();
        accounts::get_account(&self.db, identity)
    }

    pub fn is_registered(&self, identity: &str) -> EngineResult<bool> {
        Ok(self.account(identity)?.is_some())
    }

    /// Unsorted view of every account's current standing.
    pub fn leaderboard(&self) -> EngineResult<Vec<LeaderboardEntry>> {
        let _guard = self.state.read();
        Ok(accounts::all_accounts(&self.db)?
            .into_iter()
            .map(|a| LeaderboardEntry {
                address: a.address,
                username: a.username,
                clicks: a.clicks,
            })
            .collect())
    }

    /// Ranked preview of the current epoch: what settlement would pay now.
    pub fn standings(&self) -> EngineResult<Vec<LeaderboardEntry>> {
        let _guard = self.state.read();
        let all = accounts::all_accounts(&self.db)?;
        Ok(ranking::rank_accounts(&all, self.cfg.top_n()))
    }

    /// Past epoch snapshots, most recent first.
    pub fn history(&self) -> EngineResult<Vec<EpochSnapshot>> {
        let _guard = self.state.read();
        history::recent_snapshots(&self.db, self.cfg.history_cap)
    }

    pub fn pending_reward(&self, identity: &str) -> EngineResult<u128> {
        Ok(self
            .account(identity)?
            .map(|a| a.pending_reward)
            .unwrap_or(0))
    }

    pub fn total_pending_rewards(&self) -> EngineResult<u128> {
        let _guard = self.state.read();
        accounts::total_pending(&self.db)
    }

    pub fn held_funds(&self) -> EngineResult<u128> {
        let _guard = self.state.read();
        accounts::held_funds(&self.db)
    }

    /// Funds eligible for the next distribution: held minus outstanding
    /// pending rewards. A negative difference is an accounting fault.
    pub fn pool_balance(&self) -> EngineResult<u128> {
        let _guard = self.state.read();
        let held = accounts::held_funds(&self.db)?;
        let pending = accounts::total_pending(&self.db)?;
        if pending > held {
            return Err(FaultError::PendingExceedsHeld { pending, held }.into());
        }
        Ok(held - pending)
    }

    pub fn current_epoch(&self) -> EngineResult<u64> {
        let _guard = self.state.read();
        accounts::current_epoch(&self.db)
    }
}
