//! Pending-request table for in-flight texture loads.
//!
//! Every load is stamped with a [`LoadTicket`]. A completion is applied
//! only while the table still holds the same ticket for its key, so results
//! that arrive after a pool clear (or after a newer load replaced them) are
//! discarded.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use clipdeck_timeline_model::asset::{Asset, AssetId};

/// Identity of a load: the same asset fetched from the same source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PendingKey {
    pub asset_id: AssetId,
    pub source_url: String,
}

impl PendingKey {
    pub fn for_asset(asset: &Asset) -> Self {
        Self {
            asset_id: asset.id.clone(),
            source_url: asset.source_url.clone(),
        }
    }
}

/// Stamp identifying one specific load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    /// Unique per attempt.
    pub id: u64,
    /// Pool epoch the load was started in.
    pub epoch: u64,
}

#[derive(Debug)]
struct PendingLoad {
    ticket: LoadTicket,
    started_at: Instant,
    /// Requests that joined this load after it started.
    joined: u32,
}

/// Outcome of asking the table to start a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginLoad {
    /// No load was in flight; the caller must start one with this ticket.
    Started(LoadTicket),
    /// A load for the key is already in flight.
    Joined,
}

/// In-flight loads keyed by `(asset id, source url)`.
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: HashMap<PendingKey, PendingLoad>,
    next_id: u64,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in `key`, starting a load only if none is in flight.
    pub fn begin(&mut self, key: PendingKey, epoch: u64) -> BeginLoad {
        if let Some(existing) = self.entries.get_mut(&key) {
            existing.joined = existing.joined.saturating_add(1);
            return BeginLoad::Joined;
        }

        self.next_id += 1;
        let ticket = LoadTicket {
            id: self.next_id,
            epoch,
        };
        self.entries.insert(
            key,
            PendingLoad {
                ticket,
                started_at: Instant::now(),
                joined: 0,
            },
        );
        BeginLoad::Started(ticket)
    }

    /// Retire the load for `key` if `ticket` is still the current one.
    ///
    /// Returns the time the load took, or `None` for a stale completion.
    pub fn complete(&mut self, key: &PendingKey, ticket: LoadTicket) -> Option<Duration> {
        match self.entries.get(key) {
            Some(pending) if pending.ticket == ticket => {
                let elapsed = pending.started_at.elapsed();
                self.entries.remove(key);
                Some(elapsed)
            }
            _ => None,
        }
    }

    /// Whether any load for this asset id is in flight.
    pub fn is_pending(&self, asset_id: &str) -> bool {
        self.entries.keys().any(|k| k.asset_id == asset_id)
    }

    /// Number of requests that joined the in-flight load for `key`.
    pub fn joined(&self, key: &PendingKey) -> u32 {
        self.entries.get(key).map(|p| p.joined).unwrap_or(0)
    }

    /// Forget every in-flight load. Their completions become stale.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
