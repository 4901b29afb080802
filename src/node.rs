//! Node orchestration for QuorumChain

use crate::chain::{ChainTip, SyncState};
use crate::config::{load_config, Config};
use crate::crypto::Secp256k1Checker;
use crate::error::Result;
use crate::governance::SubmissionController;
use crate::persistence::{Database, InMemoryPersistence, Persistence};
use crate::relay::ChannelRelay;
use crate::state::StateStore;
use crossbeam_channel::Receiver;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub struct Node {
    pub config: Config,
    pub store: Arc<StateStore>,
    pub chain: Arc<ChainTip>,
    pub controller: Arc<SubmissionController>,
    relay_rx: Receiver<Vec<u8>>,
}

impl Node {
    pub fn init() -> Result<Self> {
        // Load and validate config
        let config = load_config()?;

        tracing_subscriber::fmt::init();
        info!(
            "Starting QuorumChain node (network_id = {})",
            config.network.network_id
        );

        // Setup persistence
        let persistence: Arc<dyn Persistence> = match Database::open(&config.database.path) {
            Ok(db) => Arc::new(db),
            Err(e) => {
                warn!(
                    "Failed to open DB at {}: {}. Falling back to in-memory persistence.",
                    config.database.path, e
                );
                Arc::new(InMemoryPersistence::new())
            }
        };

        // Restore governance state (empty registries on first start)
        let store = Arc::new(StateStore::restore(persistence)?);
        {
            let state = store.read();
            info!(
                "Governance state restored: {} validators, {} admins",
                state.validators.len(),
                state.admins.len()
            );
        }

        if let Some(admin_id) = &config.governance.admin_id {
            info!("local admin identity configured: {}", admin_id);
        }

        let chain = Arc::new(ChainTip::default());
        let (relay, relay_rx) = ChannelRelay::new();
        let controller = Arc::new(SubmissionController::new(
            store.clone(),
            chain.clone(),
            Arc::new(relay),
            Arc::new(Secp256k1Checker),
        ));

        Ok(Self {
            config,
            store,
            chain,
            controller,
            relay_rx,
        })
    }

    pub async fn start(self: Arc<Self>) -> Result<()> {
        // Ensure data directory (parent of DB path) exists
        let db_path = std::path::Path::new(&self.config.database.path);
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Drain the relay channel and hand verified messages to the network
        // layer. The channel end is the broadcast boundary; submission never
        // waits on it.
        let rx = self.relay_rx.clone();
        let peer_count = self.config.network.bootstrap_peers.len();
        tokio::task::spawn_blocking(move || {
            for encoded in rx.iter() {
                info!(
                    "broadcasting chain data message ({} bytes) to {} peers",
                    encoded.len(),
                    peer_count
                );
            }
            error!("chain data relay channel closed");
        });

        // Transition to Syncing then Synced once initial checks pass.
        // Block tracking is external; a fresh single node is treated as
        // already caught up.
        self.chain.set_sync_state(SyncState::Syncing);
        self.chain.set_sync_state(SyncState::Synced);
        info!("Initial synchronization finished; governance submissions enabled");

        // Node main loop - health logging
        let interval = Duration::from_secs(self.config.governance.status_interval_secs.max(1));
        loop {
            let info = self.controller.cvn_info();
            info!(
                "Node running: {} validators, {} admins, tip height = {}",
                info.validator_count, info.admin_count, info.tip_height
            );
            tokio::time::sleep(interval).await;
        }
    }
}
