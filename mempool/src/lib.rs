// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

//! Pending user-operation pool.
//!
//! Flow: API -> sender resolution -> pool lane -> SQLite.
//! The pool lane is the single owner of the store; reads and writes are served in dequeue order.
pub mod api;
pub mod pool_lane;
pub mod storage;
