// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use rusqlite::{Connection, Result, Row, params};

use mempool_core::user_op::UserOperation;

// Primary-key conflicts are resolved inside the statement: only nonce and init_code change.
const SQL_UPSERT_PENDING_OPERATION: &str = include_str!("queries/upsert_pending_operation.sql");
const SQL_SELECT_PENDING_OPERATIONS: &str =
    "SELECT sender, nonce, init_code FROM pending_operations";

pub(super) fn sql_upsert_pending_operation(
    conn: &Connection,
    op: &UserOperation,
) -> Result<usize> {
    let mut stmt = conn.prepare_cached(SQL_UPSERT_PENDING_OPERATION)?;
    stmt.execute(params![
        op.sender.as_str(),
        op.nonce.as_str(),
        op.init_code.as_str()
    ])
}

pub(super) fn sql_select_pending_operations(conn: &Connection) -> Result<Vec<UserOperation>> {
    let mut stmt = conn.prepare_cached(SQL_SELECT_PENDING_OPERATIONS)?;
    let mapped = stmt.query_map([], convert_row_to_user_operation)?;
    mapped.collect()
}

fn convert_row_to_user_operation(row: &Row<'_>) -> Result<UserOperation> {
    Ok(UserOperation {
        sender: row.get(0)?,
        nonce: row.get(1)?,
        init_code: row.get(2)?,
    })
}
