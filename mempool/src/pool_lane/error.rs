// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolLaneError {
    #[error("pool lane input channel closed")]
    ChannelClosed,
    #[error("pool lane shutdown requested")]
    ShutdownRequested,
}
