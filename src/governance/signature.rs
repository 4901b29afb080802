//! Admin signatures and their `"<signerId-hex>:<signature-hex>"` wire form

use crate::error::{GovernanceError, Result};
use crate::registry::format_id;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One admin's signature over a chain data message digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSignature {
    pub signer_id: u32,
    #[serde(with = "serde_bytes")]
    pub signature: Vec<u8>,
}

impl AdminSignature {
    pub fn new(signer_id: u32, signature: Vec<u8>) -> Self {
        AdminSignature {
            signer_id,
            signature,
        }
    }
}

impl fmt::Display for AdminSignature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", format_id(self.signer_id), hex::encode(&self.signature))
    }
}

/// Parse one `id:sig` token. `index` is the 1-based position of the token in
/// the submitted list and only feeds the error message.
///
/// The wire form is exactly two colon-separated fields; a signature payload
/// containing extra colons is rejected, not truncated. No whitespace is
/// tolerated. The signer id accepts an optional `0x` prefix.
pub fn parse_admin_signature(index: usize, text: &str) -> Result<AdminSignature> {
    let tokens: Vec<&str> = text.split(':').collect();
    if tokens.len() != 2 {
        return Err(GovernanceError::SignatureFormat {
            index,
            reason: format!("expected exactly 2 colon-separated fields, got {}", tokens.len()),
        });
    }

    let signer_id = parse_signer_id(index, tokens[0])?;
    let signature = hex::decode(tokens[1]).map_err(|e| GovernanceError::SignatureFormat {
        index,
        reason: format!("signature payload is not valid hex: {}", e),
    })?;

    Ok(AdminSignature::new(signer_id, signature))
}

/// Parse a full signature list, keeping the submitted order.
pub fn parse_admin_signatures(texts: &[String]) -> Result<Vec<AdminSignature>> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| parse_admin_signature(i + 1, text))
        .collect()
}

fn parse_signer_id(index: usize, token: &str) -> Result<u32> {
    let digits = token.strip_prefix("0x").unwrap_or(token);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(GovernanceError::SignatureFormat {
            index,
            reason: format!("signer id '{}' is not valid hex", token),
        });
    }
    u32::from_str_radix(digits, 16).map_err(|_| GovernanceError::SignatureFormat {
        index,
        reason: format!("signer id '{}' does not fit in 32 bits", token),
    })
}
