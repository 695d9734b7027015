//! Leaderboard ordering.

use serde::{Deserialize, Serialize};

use crate::accounts::Account;

/// One leaderboard row, as exposed to the query layer and recorded in
/// epoch snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub address: String,
    pub username: String,
    pub clicks: u64,
}

/// Order accounts for payout: descending click count, ties broken by
/// registration order. The tie-break is persisted on the account record,
/// never derived from map iteration order. Zero-click accounts are never
/// eligible, even when fewer than `top_n` accounts are active. Output is
/// bounded to `top_n` entries.
pub fn rank_accounts(accounts: &[Account], top_n: usize) -> Vec<LeaderboardEntry> {
    let mut eligible: Vec<&Account> = accounts.iter().filter(|a| a.clicks > 0).collect();
    eligible.sort_by(|a, b| {
        b.clicks
            .cmp(&a.clicks)
            .then(a.joined_seq.cmp(&b.joined_seq))
    });
    eligible.truncate(top_n);
    eligible
        .into_iter()
        .map(|a| LeaderboardEntry {
            address: a.address.clone(),
            username: a.username.clone(),
            clicks: a.clicks,
        })
        .collect()
}
