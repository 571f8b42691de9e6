//! Platform (OS) rows

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    ensure_owner, is_unique_violation, now, parse_datetime, require_text, vendors, Platform,
    StoreError, StoreResult, NAME_MAX_LENGTH,
};
use crate::core::actor::Actor;

const COLUMNS: &str = "id, vendor_id, name, created_by, created";

fn from_row(row: &Row) -> rusqlite::Result<Platform> {
    Ok(Platform {
        id: row.get(0)?,
        vendor_id: row.get(1)?,
        name: row.get(2)?,
        created_by: row.get(3)?,
        created: parse_datetime(row.get(4)?),
    })
}

fn insert(conn: &Connection, vendor_id: i64, name: &str, actor: &Actor) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO platforms (vendor_id, name, created_by, created) VALUES (?1, ?2, ?3, ?4)",
        params![vendor_id, name, actor.username, now()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Create a platform under a vendor; names are unique per vendor
pub fn create(conn: &Connection, vendor_id: i64, name: &str, actor: &Actor) -> StoreResult<Platform> {
    let name = name.trim();
    require_text("platform name", name, NAME_MAX_LENGTH)?;
    let vendor = vendors::get(conn, vendor_id)?;

    match insert(conn, vendor_id, name, actor) {
        Ok(id) => get(conn, id),
        Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict {
            entity: "platform",
            name: name.to_string(),
            scope: format!(" for vendor '{}'", vendor.name),
        }),
        Err(e) => Err(e.into()),
    }
}

pub fn get(conn: &Connection, id: i64) -> StoreResult<Platform> {
    conn.query_row(
        &format!("SELECT {} FROM platforms WHERE id = ?1", COLUMNS),
        params![id],
        from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("platform", id))
}

/// Case-insensitive lookup within a vendor
pub fn find(conn: &Connection, vendor_id: i64, name: &str) -> StoreResult<Option<Platform>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {} FROM platforms WHERE vendor_id = ?1 AND name = ?2",
                COLUMNS
            ),
            params![vendor_id, name.trim()],
            from_row,
        )
        .optional()?)
}

/// Fetch or create; the flag is true when a row was inserted
///
/// A concurrent insert of the same key is treated as "already exists".
pub fn get_or_create(
    conn: &Connection,
    vendor_id: i64,
    name: &str,
    actor: &Actor,
) -> StoreResult<(Platform, bool)> {
    if let Some(existing) = find(conn, vendor_id, name)? {
        return Ok((existing, false));
    }

    match insert(conn, vendor_id, name.trim(), actor) {
        Ok(id) => Ok((get(conn, id)?, true)),
        Err(e) if is_unique_violation(&e) => {
            let existing = find(conn, vendor_id, name)?
                .ok_or_else(|| StoreError::not_found("platform", name))?;
            Ok((existing, false))
        }
        Err(e) => Err(e.into()),
    }
}

/// List platforms, optionally restricted to a vendor and/or creator
pub fn list(
    conn: &Connection,
    vendor_id: Option<i64>,
    created_by: Option<&str>,
) -> StoreResult<Vec<Platform>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM platforms
         WHERE (?1 IS NULL OR vendor_id = ?1) AND (?2 IS NULL OR created_by = ?2)
         ORDER BY vendor_id, name",
        COLUMNS
    ))?;
    let rows = stmt.query_map(params![vendor_id, created_by], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Delete a platform (owner-scoped); its commands keep existing without one
pub fn delete(conn: &Connection, id: i64, actor: &Actor) -> StoreResult<Platform> {
    let platform = get(conn, id)?;
    ensure_owner("platform", id, &platform.created_by, actor)?;
    conn.execute("DELETE FROM platforms WHERE id = ?1", params![id])?;
    Ok(platform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::{Store, SENTINEL_PLATFORM};

    #[test]
    fn test_get_or_create_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let actor = Actor::member("alice");
        let vendor = vendors::create(store.conn(), "Cisco", &actor).unwrap();

        let (first, created) =
            get_or_create(store.conn(), vendor.id, SENTINEL_PLATFORM, &actor).unwrap();
        assert!(created);

        let (second, created) = get_or_create(store.conn(), vendor.id, "n/a", &actor).unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_same_name_allowed_across_vendors() {
        let store = Store::open_in_memory().unwrap();
        let actor = Actor::member("alice");
        let cisco = vendors::create(store.conn(), "Cisco", &actor).unwrap();
        let arista = vendors::create(store.conn(), "Arista", &actor).unwrap();

        create(store.conn(), cisco.id, "IOS-XE", &actor).unwrap();
        create(store.conn(), arista.id, "IOS-XE", &actor).unwrap();

        let err = create(store.conn(), cisco.id, "ios-xe", &actor).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(list(store.conn(), Some(cisco.id), None).unwrap().len(), 1);
    }
}
