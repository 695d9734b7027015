//! Bounded epoch snapshot history.
//!
//! Snapshots are bincode records keyed by epoch id (u64 BE) so tree order
//! is epoch order. The store keeps the most recent `cap` records and
//! evicts from the front.

use serde::{Deserialize, Serialize};
use sled::{Db, Tree};

use crate::errors::{EngineResult, FaultError};
use crate::ranking::LeaderboardEntry;

pub const HISTORY_TREE: &str = "history";

/// Immutable record of one settled epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochSnapshot {
    pub epoch_id: u64,
    pub ts_ms: u64,
    /// Ranked winners, best first. Every entry had clicks > 0 at
    /// settlement time.
    pub winners: Vec<LeaderboardEntry>,
    pub total_distributed: u128,
}

pub fn history_tree(db: &Db) -> EngineResult<Tree> {
    Ok(db.open_tree(HISTORY_TREE)?)
}

/// Append a snapshot and evict the oldest entries beyond `cap`.
pub fn append_snapshot(db: &Db, cap: usize, snap: &EpochSnapshot) -> EngineResult<()> {
    let tree = history_tree(db)?;
    let encoded =
        bincode::serialize(snap).map_err(|e| crate::errors::EngineError::Serialization(e.to_string()))?;
    tree.insert(snap.epoch_id.to_be_bytes().to_vec(), encoded)?;

    while tree.len() > cap {
        match tree.first()? {
            Some((oldest, _)) => {
                tree.remove(oldest)?;
            }
            None => break,
        }
    }
    Ok(())
}

/// Past snapshots, most recent first. A record that fails to decode means
/// the history store is corrupt, which is fatal.
pub fn recent_snapshots(db: &Db, limit: usize) -> EngineResult<Vec<EpochSnapshot>> {
    let tree = history_tree(db)?;
    let mut out = Vec::new();
    for kv in tree.iter().rev() {
        if out.len() >= limit {
            break;
        }
        let (_, raw) = kv?;
        let snap: EpochSnapshot = bincode::deserialize(&raw)
            .map_err(|e| FaultError::CorruptRecord(format!("epoch snapshot: {}", e)))?;
        out.push(snap);
    }
    Ok(out)
}
