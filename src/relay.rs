//! Chain data relay boundary for QuorumChain
//!
//! Relaying a verified message to the network is a fire-and-forget hand-off;
//! local state changes never wait on it.

use crate::governance::message::ChainDataMessage;
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, warn};

/// External broadcast boundary for verified chain data messages.
pub trait ChainDataRelay: Send + Sync {
    fn relay(&self, msg: &ChainDataMessage);
}

/// Default relay: encodes the message and hands it to a channel drained by
/// the network layer.
pub struct ChannelRelay {
    tx: Sender<Vec<u8>>,
}

impl ChannelRelay {
    /// Create the relay and the receiving end for the broadcaster task.
    pub fn new() -> (Self, Receiver<Vec<u8>>) {
        let (tx, rx) = unbounded();
        (ChannelRelay { tx }, rx)
    }
}

impl ChainDataRelay for ChannelRelay {
    fn relay(&self, msg: &ChainDataMessage) {
        let encoded = match bincode::serialize(msg) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("failed to encode chain data message for relay: {}", e);
                return;
            }
        };
        debug!("relaying chain data message ({} bytes)", encoded.len());
        if self.tx.send(encoded).is_err() {
            warn!("chain data relay channel closed; message not broadcast");
        }
    }
}

/// Relay that drops everything; used in tests and single-node setups.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRelay;

impl ChainDataRelay for NoopRelay {
    fn relay(&self, _msg: &ChainDataMessage) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_relay_delivers_encoded_message() {
        let (relay, rx) = ChannelRelay::new();
        let msg = ChainDataMessage::new([3u8; 32]);
        relay.relay(&msg);

        let encoded = rx.try_recv().unwrap();
        let decoded: ChainDataMessage = bincode::deserialize(&encoded).unwrap();
        assert_eq!(decoded.prev_block_hash, msg.prev_block_hash);
        assert_eq!(decoded.payload_kinds(), 0);
    }

    #[test]
    fn test_relay_survives_closed_channel() {
        let (relay, rx) = ChannelRelay::new();
        drop(rx);
        // must not panic or block
        relay.relay(&ChainDataMessage::new([0u8; 32]));
    }
}
