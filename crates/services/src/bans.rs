//! Per-identity, per-board bans and the gate that combines them with the
//! coarse IP-range table.

use crate::ip_range::IpBanTable;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use domains::{BanInfo, BanLevel, Denial, Identity, Requester, UserAction, ALL_BOARDS};
use std::collections::HashMap;

/// Process-wide ban records keyed by identity, then board (or `*`).
///
/// Expiry is a read-time filter: expired rows stay until
/// [`BanRegistry::purge_expired`] removes them.
#[derive(Debug, Default)]
pub struct BanRegistry {
    records: DashMap<Identity, HashMap<String, BanInfo>>,
}

impl BanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts one record per board in `bans`. Boards not named in the set
    /// keep their current record. The set lands under a single entry lock,
    /// so readers never observe half of it.
    pub fn ban_user(&self, identity: Identity, bans: Vec<BanInfo>) {
        if bans.is_empty() {
            return;
        }
        let mut entry = self.records.entry(identity.clone()).or_default();
        for ban in bans {
            tracing::info!(
                identity = %identity,
                board = %ban.board,
                level = ban.level.0,
                expires = ?ban.expires,
                "ban recorded"
            );
            entry.insert(ban.board.clone(), ban);
        }
    }

    /// The board's own record if live, else the live `*` record.
    pub fn effective_ban(&self, identity: &Identity, board: &str, now: DateTime<Utc>) -> Option<BanInfo> {
        let entry = self.records.get(identity)?;
        let live = |key: &str| entry.get(key).filter(|b| !b.is_expired_at(now)).cloned();
        live(board).or_else(|| live(ALL_BOARDS))
    }

    pub fn check_action(
        &self,
        identity: &Identity,
        board: &str,
        action: UserAction,
        now: DateTime<Utc>,
    ) -> Result<(), Denial> {
        match self.effective_ban(identity, board, now) {
            Some(ban) if ban.level.blocks(action) => Err(denial_for(ban)),
            _ => Ok(()),
        }
    }

    /// Every stored record for the identity, expired ones included.
    pub fn bans_for(&self, identity: &Identity) -> Vec<BanInfo> {
        let mut bans: Vec<BanInfo> = self
            .records
            .get(identity)
            .map(|e| e.values().cloned().collect())
            .unwrap_or_default();
        bans.sort_by(|a, b| a.board.cmp(&b.board));
        bans
    }

    pub fn all_bans(&self) -> Vec<(Identity, BanInfo)> {
        self.records
            .iter()
            .flat_map(|e| {
                let identity = e.key().clone();
                e.value()
                    .values()
                    .cloned()
                    .map(move |b| (identity.clone(), b))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Drops expired rows; returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.records.retain(|_, boards| {
            let before = boards.len();
            boards.retain(|_, ban| !ban.is_expired_at(now));
            removed += before - boards.len();
            !boards.is_empty()
        });
        removed
    }
}

fn denial_for(ban: BanInfo) -> Denial {
    if ban.level >= BanLevel::READING {
        Denial::ReadingBanned { board: ban.board, reason: ban.reason, expires: ban.expires }
    } else {
        Denial::PostingBanned { board: ban.board, reason: ban.reason, expires: ban.expires }
    }
}

/// Combines every ban source for one request. Any veto denies.
pub struct BanGate;

impl BanGate {
    /// Order: IP-range table (cannot be lifted per board), the requester's
    /// address, then their hashpass.
    pub fn check(
        ip_table: &IpBanTable,
        registry: &BanRegistry,
        requester: &Requester,
        board: &str,
        action: UserAction,
        now: DateTime<Utc>,
    ) -> Result<(), Denial> {
        let level = ip_table.level_for(&requester.ip);
        if BanLevel(level).blocks(action) {
            return Err(Denial::IpBanned { level });
        }
        registry.check_action(&Identity::Ip(requester.ip.clone()), board, action, now)?;
        if let Some(hashpass) = requester.hashpass {
            registry.check_action(&Identity::Hashpass(hashpass), board, action, now)?;
        }
        Ok(())
    }
}
