// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

mod error;
mod lane;
mod types;

pub use error::PoolLaneError;
pub use lane::{PoolLane, PoolLaneConfig, PoolLaneStop};
pub use types::{PendingAdd, PendingList, PoolError, PoolLaneInput};
