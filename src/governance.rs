//! Governance module split into message, signature, quorum and submission
//! concerns for better modularity

pub mod message;
pub mod quorum;
pub mod signature;
pub mod submit;

pub use message::*;
pub use signature::*;
pub use submit::*;

pub use crate::error::Result;
