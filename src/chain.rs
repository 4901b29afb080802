//! Chain tip and synchronization status for QuorumChain
//!
//! The governance core never tracks blocks itself; it asks a [`ChainView`]
//! for the current tip (to bind messages to a chain position) and for the
//! initial-download status (to gate submissions on a synced node).

use crate::governance::message::Sha256Hash;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Sync state tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    Idle,
    Syncing,
    Synced,
    Failed,
}

/// What the governance core needs to know about the block chain.
pub trait ChainView: Send + Sync {
    fn tip_hash(&self) -> Sha256Hash;
    fn tip_height(&self) -> u64;
    /// True while the node has not finished initial synchronization.
    /// Administrative submission is blocked in this state.
    fn is_initial_download(&self) -> bool;
}

#[derive(Debug, Clone)]
struct TipInner {
    hash: Sha256Hash,
    height: u64,
    sync_state: SyncState,
}

/// In-memory chain tip tracker, updated by the block-processing side and
/// read by the governance core.
pub struct ChainTip {
    inner: RwLock<TipInner>,
}

impl ChainTip {
    pub fn new(hash: Sha256Hash, height: u64) -> Self {
        ChainTip {
            inner: RwLock::new(TipInner {
                hash,
                height,
                sync_state: SyncState::Idle,
            }),
        }
    }

    pub fn set_tip(&self, hash: Sha256Hash, height: u64) {
        let mut inner = self.inner.write();
        inner.hash = hash;
        inner.height = height;
    }

    pub fn set_sync_state(&self, sync_state: SyncState) {
        self.inner.write().sync_state = sync_state;
    }

    pub fn sync_state(&self) -> SyncState {
        self.inner.read().sync_state
    }
}

impl Default for ChainTip {
    fn default() -> Self {
        Self::new([0u8; 32], 0)
    }
}

impl ChainView for ChainTip {
    fn tip_hash(&self) -> Sha256Hash {
        self.inner.read().hash
    }

    fn tip_height(&self) -> u64 {
        self.inner.read().height
    }

    fn is_initial_download(&self) -> bool {
        self.inner.read().sync_state != SyncState::Synced
    }
}
