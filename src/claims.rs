//! Claim processing.
//!
//! Draining a pending balance zeroes the account's credit and debits held
//! funds by the same amount in one multi-tree transaction, so a crash
//! between the two writes is never observable. The returned amount is what
//! the external transfer collaborator pays out.

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional};
use tracing::info;

use crate::accounts::{self, KEY_HELD_FUNDS};
use crate::errors::{EngineError, EngineResult, FaultError};

pub fn claim(db: &Db, identity: &str) -> EngineResult<u128> {
    let accounts_tree = accounts::accounts_tree(db)?;
    let meta_tree = accounts::meta_tree(db)?;

    let result = (&accounts_tree, &meta_tree).transaction(|(accts, meta)| {
        let raw = accts
            .get(identity.as_bytes())?
            .ok_or_else(|| abort(EngineError::NotRegistered(identity.to_string())))?;
        let mut acct = accounts::decode_account(&raw).map_err(abort)?;

        let amount = acct.pending_reward;
        if amount == 0 {
            return Err(abort(EngineError::NothingToClaim));
        }

        let held = decode_u128(meta.get(KEY_HELD_FUNDS)?.as_deref());
        if amount > held {
            return Err(abort(EngineError::Fault(FaultError::PendingExceedsHeld {
                pending: amount,
                held,
            })));
        }

        acct.pending_reward = 0;
        let encoded = accounts::encode_account(&acct).map_err(abort)?;
        accts.insert(identity.as_bytes(), encoded)?;
        meta.insert(KEY_HELD_FUNDS, (held - amount).to_be_bytes().to_vec())?;
        Ok(amount)
    });

    match result {
        Ok(amount) => {
            info!(identity = %identity, amount, "✅ pending reward claimed");
            Ok(amount)
        }
        Err(TransactionError::Abort(e)) => Err(e),
        Err(TransactionError::Storage(e)) => Err(EngineError::Database(e)),
    }
}

fn abort(e: EngineError) -> ConflictableTransactionError<EngineError> {
    ConflictableTransactionError::Abort(e)
}

fn decode_u128(bytes: Option<&[u8]>) -> u128 {
    let mut buf = [0u8; 16];
    if let Some(b) = bytes {
        let take = b.len().min(16);
        buf[..take].copy_from_slice(&b[..take]);
    }
    u128::from_be_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClickerConfig;
    use crate::ledger;
    use crate::registry;
    use crate::settlement;

    fn settled_winner() -> (Db, ClickerConfig) {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let cfg = ClickerConfig {
            click_fee: 100,
            ..ClickerConfig::default()
        };
        registry::register(&db, &cfg, "0xaaaa", "alice", None).unwrap();
        ledger::click(&db, &cfg, "0xaaaa", 100).unwrap();
        settlement::run_settlement(&db, &cfg).unwrap();
        (db, cfg)
    }

    #[test]
    fn claim_drains_exactly_once() {
        let (db, _cfg) = settled_winner();
        let held_before = accounts::held_funds(&db).unwrap();

        let amount = claim(&db, "0xaaaa").unwrap();
        assert_eq!(amount, 15); // rank-1 share of the 100 pool

        let alice = accounts::get_account(&db, "0xaaaa").unwrap().unwrap();
        assert_eq!(alice.pending_reward, 0);
        assert_eq!(accounts::held_funds(&db).unwrap(), held_before - amount);

        // A second claim with no new credit fails and changes nothing
        let err = claim(&db, "0xaaaa").unwrap_err();
        assert!(matches!(err, EngineError::NothingToClaim));
        assert_eq!(accounts::held_funds(&db).unwrap(), held_before - amount);
    }

    #[test]
    fn claim_requires_registration() {
        let (db, _cfg) = settled_winner();
        let err = claim(&db, "0xbbbb").unwrap_err();
        assert!(matches!(err, EngineError::NotRegistered(_)));
    }

    #[test]
    fn claim_with_no_credit_fails() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let cfg = ClickerConfig::default();
        registry::register(&db, &cfg, "0xbbbb", "bob", None).unwrap();
        let err = claim(&db, "0xbbbb").unwrap_err();
        assert!(matches!(err, EngineError::NothingToClaim));
    }

    #[test]
    fn pending_over_held_is_fatal() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let cfg = ClickerConfig::default();
        registry::register(&db, &cfg, "0xaaaa", "alice", None).unwrap();
        let mut alice = accounts::get_account(&db, "0xaaaa").unwrap().unwrap();
        alice.pending_reward = 500; // no matching held funds
        accounts::put_account(&db, &alice).unwrap();

        let err = claim(&db, "0xaaaa").unwrap_err();
        assert!(matches!(
            err,
            EngineError::Fault(FaultError::PendingExceedsHeld { .. })
        ));
        // The fault aborts the transaction; the bad credit is untouched
        let alice = accounts::get_account(&db, "0xaaaa").unwrap().unwrap();
        assert_eq!(alice.pending_reward, 500);
    }
}
