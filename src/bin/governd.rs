#![forbid(unsafe_code)]
//! Governance node daemon for QuorumChain

use quorumchain::node::Node;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let node = Arc::new(Node::init()?);
    node.start().await?;
    Ok(())
}
