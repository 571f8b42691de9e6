//! Import history

use rusqlite::{params, Connection, Row};

use super::{now, parse_datetime, ImportRun, NewImportRun, StoreResult};

fn from_row(row: &Row) -> rusqlite::Result<ImportRun> {
    Ok(ImportRun {
        id: row.get(0)?,
        vendor_id: row.get(1)?,
        vendor: row.get(2)?,
        root_name: row.get(3)?,
        actor: row.get(4)?,
        file_name: row.get(5)?,
        sha256: row.get(6)?,
        encoding: row.get(7)?,
        override_existing: row.get(8)?,
        commands_seen: row.get::<_, i64>(9)? as usize,
        commands_created: row.get::<_, i64>(10)? as usize,
        commands_updated: row.get::<_, i64>(11)? as usize,
        commands_skipped: row.get::<_, i64>(12)? as usize,
        nodes_seen: row.get::<_, i64>(13)? as usize,
        nodes_created: row.get::<_, i64>(14)? as usize,
        created: parse_datetime(row.get(15)?),
    })
}

/// Record a committed import, returning its id
pub fn record(conn: &Connection, run: &NewImportRun) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO imports
            (vendor_id, root_name, actor, file_name, sha256, encoding, override,
             commands_seen, commands_created, commands_updated, commands_skipped,
             nodes_seen, nodes_created, created)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            run.vendor_id,
            run.root_name,
            run.actor,
            run.file_name,
            run.sha256,
            run.encoding,
            run.override_existing,
            run.commands_seen as i64,
            run.commands_created as i64,
            run.commands_updated as i64,
            run.commands_skipped as i64,
            run.nodes_seen as i64,
            run.nodes_created as i64,
            now(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Imports, newest first
pub fn list(conn: &Connection, vendor_id: Option<i64>) -> StoreResult<Vec<ImportRun>> {
    let mut stmt = conn.prepare(
        "SELECT i.id, i.vendor_id, v.name, i.root_name, i.actor, i.file_name, i.sha256,
                i.encoding, i.override, i.commands_seen, i.commands_created,
                i.commands_updated, i.commands_skipped, i.nodes_seen, i.nodes_created,
                i.created
         FROM imports i JOIN vendors v ON v.id = i.vendor_id
         WHERE (?1 IS NULL OR i.vendor_id = ?1)
         ORDER BY i.id DESC",
    )?;
    let rows = stmt.query_map(params![vendor_id], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
