// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use rusqlite::Connection;
use rusqlite_migration::{M, Migrations};

use super::sql::{sql_select_pending_operations, sql_upsert_pending_operation};
use super::{PendingOperationStore, StorageError, StorageOpenError};
use mempool_core::user_op::UserOperation;

const MIGRATION_0001_SCHEMA: &str = include_str!("migrations/0001_schema.sql");

/// SQLite-backed pending-operation store.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: &str, synchronous: &str) -> std::result::Result<Self, StorageOpenError> {
        let conn = Self::open_connection_with_migrations(path, synchronous)?;
        Ok(Self { conn })
    }

    pub fn open_connection(
        path: &str,
        synchronous: &str,
    ) -> std::result::Result<Connection, StorageOpenError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", synchronous)?;
        conn.pragma_update(None, "busy_timeout", 5000)?;
        Ok(conn)
    }

    pub fn open_connection_with_migrations(
        path: &str,
        synchronous: &str,
    ) -> std::result::Result<Connection, StorageOpenError> {
        let mut conn = Self::open_connection(path, synchronous)?;
        Self::run_migrations(&mut conn)?;
        Ok(conn)
    }

    pub fn run_migrations(conn: &mut Connection) -> std::result::Result<(), StorageOpenError> {
        Migrations::from_slice(&[M::up(MIGRATION_0001_SCHEMA)]).to_latest(conn)?;
        Ok(())
    }
}

impl PendingOperationStore for Storage {
    fn upsert(&mut self, op: UserOperation) -> Result<UserOperation, StorageError> {
        sql_upsert_pending_operation(&self.conn, &op)?;
        Ok(op)
    }

    fn list_all(&mut self) -> Result<Vec<UserOperation>, StorageError> {
        Ok(sql_select_pending_operations(&self.conn)?)
    }
}
