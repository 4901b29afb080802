//! Dynamic chain parameters for QuorumChain
//!
//! The governance-tunable knobs of the network. Exactly one instance is live
//! at any time; a parameter-change message replaces the whole record rather
//! than mutating it in place.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicChainParameters {
    /// Target seconds between blocks
    pub block_spacing: u32,
    /// Seconds a block creator may be late before the next one takes over
    pub block_spacing_grace_period: u32,
    /// Smallest output value the network relays
    pub dust_threshold: u32,
    /// Maximum number of admin signatures accepted on a chain data message
    pub max_cvn_signers: u32,
    /// Minimum number of admin signatures required on a chain data message
    pub min_cvn_signers: u32,
    /// Number of successive blocks a CVN must have signed before creating one
    pub min_successive_signatures: u32,
}

impl Default for DynamicChainParameters {
    fn default() -> Self {
        Self {
            block_spacing: 180,
            block_spacing_grace_period: 60,
            dust_threshold: 10_000,
            max_cvn_signers: 11,
            min_cvn_signers: 1,
            min_successive_signatures: 1,
        }
    }
}

impl DynamicChainParameters {
    /// Produce a new parameter set by overlaying named overrides onto `self`.
    ///
    /// Unrecognized names are skipped, not rejected, so that older nodes can
    /// ignore parameters they do not understand. A skipped key is logged
    /// because a typo in a name silently fails to apply.
    pub fn overlay(&self, overrides: &BTreeMap<String, u32>) -> DynamicChainParameters {
        let mut params = self.clone();
        for (key, value) in overrides {
            match key.as_str() {
                "block_spacing" => params.block_spacing = *value,
                "block_spacing_grace_period" => params.block_spacing_grace_period = *value,
                "dust_threshold" => params.dust_threshold = *value,
                "max_cvn_signers" => params.max_cvn_signers = *value,
                "min_cvn_signers" => params.min_cvn_signers = *value,
                "min_successive_signatures" => params.min_successive_signatures = *value,
                _ => warn!("skipping unknown dynamic chain parameter '{}'", key),
            }
        }
        params
    }

    /// Feed every field into a digest in declaration order.
    pub fn hash_into(&self, hasher: &mut Sha256) {
        hasher.update(self.block_spacing.to_le_bytes());
        hasher.update(self.block_spacing_grace_period.to_le_bytes());
        hasher.update(self.dust_threshold.to_le_bytes());
        hasher.update(self.max_cvn_signers.to_le_bytes());
        hasher.update(self.min_cvn_signers.to_le_bytes());
        hasher.update(self.min_successive_signatures.to_le_bytes());
    }
}

impl fmt::Display for DynamicChainParameters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "block_spacing: {}, block_spacing_grace_period: {}, dust_threshold: {}, \
             max_cvn_signers: {}, min_cvn_signers: {}, min_successive_signatures: {}",
            self.block_spacing,
            self.block_spacing_grace_period,
            self.dust_threshold,
            self.max_cvn_signers,
            self.min_cvn_signers,
            self.min_successive_signatures
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_replaces_named_fields() {
        let params = DynamicChainParameters::default();
        let mut overrides = BTreeMap::new();
        overrides.insert("block_spacing".to_string(), 90);
        overrides.insert("min_cvn_signers".to_string(), 3);

        let updated = params.overlay(&overrides);
        assert_eq!(updated.block_spacing, 90);
        assert_eq!(updated.min_cvn_signers, 3);
        // untouched fields keep their current values
        assert_eq!(updated.dust_threshold, params.dust_threshold);
        assert_eq!(updated.max_cvn_signers, params.max_cvn_signers);
    }

    #[test]
    fn test_overlay_ignores_unknown_keys() {
        let params = DynamicChainParameters::default();
        let mut overrides = BTreeMap::new();
        overrides.insert("block_spacingg".to_string(), 5);

        let updated = params.overlay(&overrides);
        assert_eq!(updated, params);
    }

    #[test]
    fn test_overlay_empty_is_identity() {
        let params = DynamicChainParameters::default();
        assert_eq!(params.overlay(&BTreeMap::new()), params);
    }

    #[test]
    fn test_display_lists_all_fields() {
        let rendered = DynamicChainParameters::default().to_string();
        assert!(rendered.contains("block_spacing: 180"));
        assert!(rendered.contains("min_cvn_signers: 1"));
        assert!(rendered.contains("min_successive_signatures: 1"));
    }
}
