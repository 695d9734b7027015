//! Account store.
//!
//! Per-identity state lives as bincode records in the `accounts` tree,
//! with a `usernames` index tree and a `meta` tree holding the engine
//! counters (held funds, current epoch, registration sequence). Counters
//! are fixed-width big-endian so the encodings are order-preserving.

use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::{EngineResult, FaultError};

/// Tree of bincode-encoded [`Account`] records keyed by address.
pub const ACCOUNTS_TREE: &str = "accounts";
/// Username to address index tree.
pub const USERNAMES_TREE: &str = "usernames";
/// Engine counters tree.
pub const META_TREE: &str = "meta";

/// Total funds held by the engine (u128 BE).
pub const KEY_HELD_FUNDS: &[u8] = b"funds:held";
/// Current epoch id (u64 BE), starts at 1.
pub const KEY_EPOCH: &[u8] = b"epoch:current";
/// Next registration-order sequence number (u64 BE).
pub const KEY_NEXT_SEQ: &[u8] = b"acct:next_seq";

/// One registered identity. Created once, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub address: String,
    /// Unique, immutable after registration.
    pub username: String,
    /// Ranking credit earned per paid click. Starts at 1, never decreases.
    pub multiplier: u64,
    /// Current-epoch click credits. Reset to zero at each settlement.
    pub clicks: u64,
    /// Accounts this one has referred. Never decreases.
    pub referrals: u64,
    /// Credited, unclaimed winnings in base units.
    pub pending_reward: u128,
    /// Referrer address, fixed at registration. No re-parenting.
    pub referrer: Option<String>,
    /// Registration-order sequence, the ranking tie-break.
    pub joined_seq: u64,
    pub registered_at_ms: u64,
}

pub fn accounts_tree(db: &Db) -> EngineResult<Tree> {
    Ok(db.open_tree(ACCOUNTS_TREE)?)
}

pub fn usernames_tree(db: &Db) -> EngineResult<Tree> {
    Ok(db.open_tree(USERNAMES_TREE)?)
}

pub fn meta_tree(db: &Db) -> EngineResult<Tree> {
    Ok(db.open_tree(META_TREE)?)
}

pub fn encode_account(acct: &Account) -> EngineResult<Vec<u8>> {
    Ok(bincode::serialize(acct)?)
}

pub fn decode_account(bytes: &[u8]) -> EngineResult<Account> {
    Ok(bincode::deserialize(bytes)?)
}

pub fn get_account(db: &Db, address: &str) -> EngineResult<Option<Account>> {
    match accounts_tree(db)?.get(address.as_bytes())? {
        Some(raw) => Ok(Some(decode_account(&raw)?)),
        None => Ok(None),
    }
}

pub fn put_account(db: &Db, acct: &Account) -> EngineResult<()> {
    accounts_tree(db)?.insert(acct.address.as_bytes(), encode_account(acct)?)?;
    Ok(())
}

/// Resolve a username to its owning address.
pub fn resolve_username(db: &Db, username: &str) -> EngineResult<Option<String>> {
    match usernames_tree(db)?.get(username.as_bytes())? {
        Some(raw) => Ok(Some(String::from_utf8_lossy(&raw).to_string())),
        None => Ok(None),
    }
}

pub fn index_username(db: &Db, username: &str, address: &str) -> EngineResult<()> {
    usernames_tree(db)?.insert(username.as_bytes(), address.as_bytes())?;
    Ok(())
}

/// Scan every account record. The store is bounded by the player base, so
/// a full scan per settlement stays cheap.
pub fn all_accounts(db: &Db) -> EngineResult<Vec<Account>> {
    let mut out = Vec::new();
    for kv in accounts_tree(db)?.iter() {
        let (_, raw) = kv?;
        out.push(decode_account(&raw)?);
    }
    Ok(out)
}

/// Allocate the next registration-order sequence number.
pub fn allocate_join_seq(db: &Db) -> EngineResult<u64> {
    let meta = meta_tree(db)?;
    let seq = read_u64(&meta, KEY_NEXT_SEQ)?;
    write_u64(&meta, KEY_NEXT_SEQ, seq + 1)?;
    Ok(seq)
}

pub fn held_funds(db: &Db) -> EngineResult<u128> {
    read_u128(&meta_tree(db)?, KEY_HELD_FUNDS)
}

/// Add a collected fee to held funds.
pub fn credit_held(db: &Db, amount: u128) -> EngineResult<u128> {
    let meta = meta_tree(db)?;
    let current = read_u128(&meta, KEY_HELD_FUNDS)?;
    let next = current
        .checked_add(amount)
        .ok_or(FaultError::BalanceOverflow { amount })?;
    write_u128(&meta, KEY_HELD_FUNDS, next)?;
    Ok(next)
}

/// Remove claimed funds from the held total. Draining below zero is an
/// accounting fault, not a recoverable condition.
pub fn debit_held(db: &Db, amount: u128) -> EngineResult<u128> {
    let meta = meta_tree(db)?;
    let current = read_u128(&meta, KEY_HELD_FUNDS)?;
    if current < amount {
        return Err(FaultError::PendingExceedsHeld {
            pending: amount,
            held: current,
        }
        .into());
    }
    let next = current - amount;
    write_u128(&meta, KEY_HELD_FUNDS, next)?;
    Ok(next)
}

/// Sum of all outstanding pending rewards.
pub fn total_pending(db: &Db) -> EngineResult<u128> {
    let mut total: u128 = 0;
    for acct in all_accounts(db)? {
        total = total.saturating_add(acct.pending_reward);
    }
    Ok(total)
}

pub fn current_epoch(db: &Db) -> EngineResult<u64> {
    let id = read_u64(&meta_tree(db)?, KEY_EPOCH)?;
    Ok(if id == 0 { 1 } else { id })
}

pub fn set_epoch(db: &Db, id: u64) -> EngineResult<()> {
    write_u64(&meta_tree(db)?, KEY_EPOCH, id)
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ---------- fixed-width helpers ----------

pub fn read_u128(tree: &Tree, key: &[u8]) -> EngineResult<u128> {
    if let Some(ivec) = tree.get(key)? {
        let bytes = ivec.as_ref();
        let mut buf = [0u8; 16];
        let take = bytes.len().min(16);
        buf[..take].copy_from_slice(&bytes[..take]);
        Ok(u128::from_be_bytes(buf))
    } else {
        Ok(0)
    }
}

pub fn write_u128(tree: &Tree, key: &[u8], v: u128) -> EngineResult<()> {
    tree.insert(key, v.to_be_bytes().to_vec())?;
    Ok(())
}

pub fn read_u64(tree: &Tree, key: &[u8]) -> EngineResult<u64> {
    if let Some(ivec) = tree.get(key)? {
        let bytes = ivec.as_ref();
        let mut buf = [0u8; 8];
        let take = bytes.len().min(8);
        buf[..take].copy_from_slice(&bytes[..take]);
        Ok(u64::from_be_bytes(buf))
    } else {
        Ok(0)
    }
}

pub fn write_u64(tree: &Tree, key: &[u8], v: u64) -> EngineResult<()> {
    tree.insert(key, v.to_be_bytes().to_vec())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Db {
        sled::Config::new().temporary(true).open().unwrap()
    }

    fn test_account(addr: &str, seq: u64) -> Account {
        Account {
            address: addr.to_string(),
            username: format!("user{}", seq),
            multiplier: 1,
            clicks: 0,
            referrals: 0,
            pending_reward: 0,
            referrer: None,
            joined_seq: seq,
            registered_at_ms: now_ms(),
        }
    }

    #[test]
    fn account_round_trip() {
        let db = test_db();
        let acct = test_account("0xaaaa", 0);
        put_account(&db, &acct).unwrap();

        let loaded = get_account(&db, "0xaaaa").unwrap().unwrap();
        assert_eq!(loaded.username, "user0");
        assert_eq!(loaded.multiplier, 1);
        assert!(get_account(&db, "0xbbbb").unwrap().is_none());
    }

    #[test]
    fn username_index_resolves() {
        let db = test_db();
        index_username(&db, "alice", "0xaaaa").unwrap();
        assert_eq!(
            resolve_username(&db, "alice").unwrap().as_deref(),
            Some("0xaaaa")
        );
        assert!(resolve_username(&db, "bob").unwrap().is_none());
    }

    #[test]
    fn join_sequence_is_monotonic() {
        let db = test_db();
        assert_eq!(allocate_join_seq(&db).unwrap(), 0);
        assert_eq!(allocate_join_seq(&db).unwrap(), 1);
        assert_eq!(allocate_join_seq(&db).unwrap(), 2);
    }

    #[test]
    fn held_funds_credit_and_debit() {
        let db = test_db();
        assert_eq!(held_funds(&db).unwrap(), 0);

        credit_held(&db, 1_000).unwrap();
        credit_held(&db, 500).unwrap();
        assert_eq!(held_funds(&db).unwrap(), 1_500);

        debit_held(&db, 600).unwrap();
        assert_eq!(held_funds(&db).unwrap(), 900);

        // Draining past zero is a fault
        let err = debit_held(&db, 1_000).unwrap_err();
        assert!(matches!(
            err,
            crate::errors::EngineError::Fault(FaultError::PendingExceedsHeld { .. })
        ));
        assert_eq!(held_funds(&db).unwrap(), 900);
    }

    #[test]
    fn epoch_starts_at_one() {
        let db = test_db();
        assert_eq!(current_epoch(&db).unwrap(), 1);
        set_epoch(&db, 7).unwrap();
        assert_eq!(current_epoch(&db).unwrap(), 7);
    }

    #[test]
    fn total_pending_sums_all_accounts() {
        let db = test_db();
        let mut a = test_account("0xaaaa", 0);
        a.pending_reward = 100;
        let mut b = test_account("0xbbbb", 1);
        b.pending_reward = 250;
        put_account(&db, &a).unwrap();
        put_account(&db, &b).unwrap();
        assert_eq!(total_pending(&db).unwrap(), 350);
    }
}
