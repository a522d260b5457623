// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

mod db;
mod memory;
mod sql;

use mempool_core::user_op::UserOperation;
use thiserror::Error;

pub use db::Storage;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StorageOpenError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Migration(#[from] rusqlite_migration::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Keyed store of pending user operations, at most one record per sender.
///
/// Implementations are driven by a single owner (the pool lane), so methods take
/// `&mut self` and run to completion before returning.
pub trait PendingOperationStore: Send {
    /// Inserts `op`, or overwrites `nonce` and `init_code` of the record already
    /// keyed by `op.sender`. Returns the operation as submitted.
    fn upsert(&mut self, op: UserOperation) -> Result<UserOperation, StorageError>;

    /// Every stored operation, in no particular order.
    fn list_all(&mut self) -> Result<Vec<UserOperation>, StorageError>;
}
