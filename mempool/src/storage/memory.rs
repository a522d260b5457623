// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::collections::HashMap;

use super::{PendingOperationStore, StorageError};
use mempool_core::user_op::UserOperation;

/// In-process store with the same keyed semantics as [`super::Storage`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    by_sender: HashMap<String, UserOperation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_sender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_sender.is_empty()
    }
}

impl PendingOperationStore for MemoryStore {
    fn upsert(&mut self, op: UserOperation) -> Result<UserOperation, StorageError> {
        self.by_sender
            .entry(op.sender.clone())
            .and_modify(|existing| {
                existing.nonce.clone_from(&op.nonce);
                existing.init_code.clone_from(&op.init_code);
            })
            .or_insert_with(|| op.clone());
        Ok(op)
    }

    fn list_all(&mut self) -> Result<Vec<UserOperation>, StorageError> {
        Ok(self.by_sender.values().cloned().collect())
    }
}
