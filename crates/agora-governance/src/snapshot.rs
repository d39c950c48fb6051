//! Historical power snapshots.
//!
//! A snapshot freezes the raw (balance, staked, reputation) components of
//! every known voter at creation time. Snapshots are immutable once
//! written; historical power queries recompute base power from the frozen
//! triple and ignore delegation entirely (inherited design decision, see
//! DESIGN.md).

use std::collections::HashMap;
use agora_types::Address;
use serde::{Deserialize, Serialize};
use crate::power::PowerComponents;

/// An immutable, timestamped capture of raw power components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique snapshot ID
    pub id: u64,
    /// When the snapshot was taken
    pub created_at: u64,
    /// Caller-supplied reference time (e.g. the epoch the snapshot
    /// stands for)
    pub reference_time: u64,
    /// Frozen components by address
    balances: HashMap<Address, PowerComponents>,
}

impl Snapshot {
    /// Frozen components of an address, if it was known at snapshot time.
    pub fn components_of(&self, address: &Address) -> Option<PowerComponents> {
        self.balances.get(address).copied()
    }

    /// Number of addresses captured.
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    /// Whether the snapshot captured no addresses.
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

/// Store of all snapshots.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    snapshots: HashMap<u64, Snapshot>,
    next_id: u64,
}

impl SnapshotStore {
    /// Create a new store.
    pub fn new() -> Self {
        Self {
            snapshots: HashMap::new(),
            next_id: 1,
        }
    }

    /// Record a new snapshot, allocating the next monotonic id.
    pub fn create(
        &mut self,
        created_at: u64,
        reference_time: u64,
        balances: HashMap<Address, PowerComponents>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        self.snapshots.insert(
            id,
            Snapshot {
                id,
                created_at,
                reference_time,
                balances,
            },
        );
        id
    }

    /// Get a snapshot. Snapshots are never handed out mutably.
    pub fn get(&self, id: u64) -> Option<&Snapshot> {
        self.snapshots.get(&id)
    }

    /// Number of snapshots taken.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether any snapshot exists.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
