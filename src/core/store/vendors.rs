//! Vendor rows

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    ensure_owner, is_unique_violation, now, parse_datetime, require_text, StoreError, StoreResult,
    Vendor, NAME_MAX_LENGTH,
};
use crate::core::actor::Actor;

const COLUMNS: &str = "id, name, created_by, created, updated";

fn from_row(row: &Row) -> rusqlite::Result<Vendor> {
    Ok(Vendor {
        id: row.get(0)?,
        name: row.get(1)?,
        created_by: row.get(2)?,
        created: parse_datetime(row.get(3)?),
        updated: parse_datetime(row.get(4)?),
    })
}

/// Create a vendor; names are unique case-insensitively
pub fn create(conn: &Connection, name: &str, actor: &Actor) -> StoreResult<Vendor> {
    let name = name.trim();
    require_text("vendor name", name, NAME_MAX_LENGTH)?;

    let ts = now();
    match conn.execute(
        "INSERT INTO vendors (name, created_by, created, updated) VALUES (?1, ?2, ?3, ?3)",
        params![name, actor.username, ts],
    ) {
        Ok(_) => get(conn, conn.last_insert_rowid()),
        Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict {
            entity: "vendor",
            name: name.to_string(),
            scope: String::new(),
        }),
        Err(e) => Err(e.into()),
    }
}

pub fn get(conn: &Connection, id: i64) -> StoreResult<Vendor> {
    conn.query_row(
        &format!("SELECT {} FROM vendors WHERE id = ?1", COLUMNS),
        params![id],
        from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("vendor", id))
}

/// Case-insensitive lookup by name
pub fn find_by_name(conn: &Connection, name: &str) -> StoreResult<Option<Vendor>> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM vendors WHERE name = ?1", COLUMNS),
            params![name.trim()],
            from_row,
        )
        .optional()?)
}

/// Resolve a vendor given either its numeric id or its name
pub fn resolve(conn: &Connection, key: &str) -> StoreResult<Vendor> {
    if let Ok(id) = key.parse::<i64>() {
        if let Ok(vendor) = get(conn, id) {
            return Ok(vendor);
        }
    }
    find_by_name(conn, key)?.ok_or_else(|| StoreError::not_found("vendor", key))
}

/// List vendors ordered by name, optionally only those created by `created_by`
pub fn list(conn: &Connection, created_by: Option<&str>) -> StoreResult<Vec<Vendor>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM vendors WHERE (?1 IS NULL OR created_by = ?1) ORDER BY name",
        COLUMNS
    ))?;
    let rows = stmt.query_map(params![created_by], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Delete a vendor and everything it owns (owner-scoped)
pub fn delete(conn: &Connection, id: i64, actor: &Actor) -> StoreResult<Vendor> {
    let vendor = get(conn, id)?;
    ensure_owner("vendor", id, &vendor.created_by, actor)?;
    conn.execute("DELETE FROM vendors WHERE id = ?1", params![id])?;
    Ok(vendor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::Store;

    #[test]
    fn test_create_and_find_case_insensitive() {
        let store = Store::open_in_memory().unwrap();
        let alice = Actor::member("alice");

        let cisco = create(store.conn(), "  Cisco ", &alice).unwrap();
        assert_eq!(cisco.name, "Cisco");
        assert_eq!(cisco.created_by, "alice");

        let found = find_by_name(store.conn(), "CISCO").unwrap().unwrap();
        assert_eq!(found.id, cisco.id);
        assert_eq!(resolve(store.conn(), &cisco.id.to_string()).unwrap().id, cisco.id);
    }

    #[test]
    fn test_duplicate_name_conflicts() {
        let store = Store::open_in_memory().unwrap();
        let alice = Actor::member("alice");
        create(store.conn(), "Juniper", &alice).unwrap();

        let err = create(store.conn(), "juniper", &alice).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_delete_is_owner_scoped() {
        let store = Store::open_in_memory().unwrap();
        let alice = Actor::member("alice");
        let bob = Actor::member("bob");
        let vendor = create(store.conn(), "Arista", &alice).unwrap();

        let err = delete(store.conn(), vendor.id, &bob).unwrap_err();
        assert!(matches!(err, StoreError::NotOwner { .. }));

        delete(store.conn(), vendor.id, &Actor::admin("root")).unwrap();
        assert!(find_by_name(store.conn(), "Arista").unwrap().is_none());
    }

    #[test]
    fn test_list_mine() {
        let store = Store::open_in_memory().unwrap();
        create(store.conn(), "B-Vendor", &Actor::member("alice")).unwrap();
        create(store.conn(), "A-Vendor", &Actor::member("bob")).unwrap();

        let all = list(store.conn(), None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "A-Vendor");

        let mine = list(store.conn(), Some("alice")).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "B-Vendor");
    }
}
