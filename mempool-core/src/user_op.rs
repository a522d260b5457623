// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

//! User operations as held by the pool, and the sender identity derived for
//! accounts that are not deployed yet.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

pub const SENDER_BYTES: usize = 20;

/// A pending user operation. Fields are kept in their textual form and stored verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub init_code: String,
}

impl UserOperation {
    pub fn new(
        sender: impl Into<String>,
        nonce: impl Into<String>,
        init_code: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            nonce: nonce.into(),
            init_code: init_code.into(),
        }
    }

    /// Fills in `sender` from `(init_code, nonce)` when the caller left it empty.
    ///
    /// A non-empty sender is trusted as-is. Without init code there is nothing to
    /// derive from and the operation passes through unchanged.
    pub fn with_resolved_sender(mut self) -> Self {
        if self.sender.is_empty() && !self.init_code.is_empty() {
            let derived = derive_sender(self.init_code.as_bytes(), self.nonce.as_bytes());
            self.sender = sender_key(&derived);
        }
        self
    }
}

/// First 20 bytes of `sha3_256(init_code || nonce)`.
pub fn derive_sender(init_code: &[u8], nonce: &[u8]) -> Address {
    let mut hasher = Sha3_256::new();
    hasher.update(init_code);
    hasher.update(nonce);
    let digest = hasher.finalize();
    Address::from_slice(&digest[..SENDER_BYTES])
}

/// Lowercase `0x`-prefixed hex, the textual key format of the pool.
pub fn sender_key(address: &Address) -> String {
    alloy_primitives::hex::encode_prefixed(address.as_slice())
}
