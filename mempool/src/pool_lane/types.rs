// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::time::Instant;

use mempool_core::user_op::UserOperation;
use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug)]
pub struct PendingAdd {
    /// Already carries its resolved sender.
    pub user_operation: UserOperation,
    pub respond_to: oneshot::Sender<Result<UserOperation, PoolError>>,
    pub received_at: Instant,
}

#[derive(Debug)]
pub struct PendingList {
    pub respond_to: oneshot::Sender<Result<Vec<UserOperation>, PoolError>>,
}

#[derive(Debug)]
pub enum PoolLaneInput {
    Add(PendingAdd),
    List(PendingList),
}

#[derive(Debug, Error, Clone)]
pub enum PoolError {
    #[error("{0}")]
    Storage(String),
}

impl PoolError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}
