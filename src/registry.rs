//! Registration: identity and username intake, referral bookkeeping.
//!
//! Registration is the only path that creates accounts and the only path
//! besides purchase that changes a multiplier: when a valid referrer is
//! named, both sides gain one multiplier unit and the referrer gains one
//! referral credit.

use sled::Db;
use tracing::info;

use crate::accounts::{self, Account};
use crate::config::ClickerConfig;
use crate::errors::{EngineError, EngineResult};

pub fn register(
    db: &Db,
    cfg: &ClickerConfig,
    identity: &str,
    username: &str,
    referrer: Option<&str>,
) -> EngineResult<()> {
    if accounts::get_account(db, identity)?.is_some() {
        return Err(EngineError::DuplicateIdentity(identity.to_string()));
    }
    if username == cfg.no_referrer {
        return Err(EngineError::ReservedUsername(username.to_string()));
    }
    if accounts::resolve_username(db, username)?.is_some() {
        return Err(EngineError::UsernameTaken(username.to_string()));
    }

    // Resolve the referrer before touching any state. The sentinel value
    // means "none" and is not an error.
    let referrer_addr = match referrer {
        Some(name) if name != cfg.no_referrer => {
            match accounts::resolve_username(db, name)? {
                Some(addr) => Some(addr),
                None => return Err(EngineError::UnknownReferrer(name.to_string())),
            }
        }
        _ => None,
    };

    let mut acct = Account {
        address: identity.to_string(),
        username: username.to_string(),
        multiplier: 1,
        clicks: 0,
        referrals: 0,
        pending_reward: 0,
        referrer: referrer_addr.clone(),
        joined_seq: accounts::allocate_join_seq(db)?,
        registered_at_ms: accounts::now_ms(),
    };

    if let Some(addr) = &referrer_addr {
        let mut parent = accounts::get_account(db, addr)?
            .ok_or_else(|| EngineError::UnknownReferrer(addr.clone()))?;
        parent.multiplier += 1;
        parent.referrals += 1;
        accounts::put_account(db, &parent)?;
        acct.multiplier += 1;
    }

    accounts::put_account(db, &acct)?;
    accounts::index_username(db, username, identity)?;

    info!(
        identity = %identity,
        username = %username,
        referred = referrer_addr.is_some(),
        "registered account"
    );
    Ok(())
}
