//! Grouping node rows (the category/tag hierarchy)

use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    ensure_owner, is_unique_violation, now, parse_datetime, require_text, vendors, GroupingNode,
    NodeTree, StoreError, StoreResult, NAME_MAX_LENGTH,
};
use crate::core::actor::Actor;

const COLUMNS: &str = "id, vendor_id, parent_id, name, created_by, created, updated";

fn from_row(row: &Row) -> rusqlite::Result<GroupingNode> {
    Ok(GroupingNode {
        id: row.get(0)?,
        vendor_id: row.get(1)?,
        parent_id: row.get(2)?,
        name: row.get(3)?,
        created_by: row.get(4)?,
        created: parse_datetime(row.get(5)?),
        updated: parse_datetime(row.get(6)?),
    })
}

fn insert(
    conn: &Connection,
    vendor_id: i64,
    parent_id: Option<i64>,
    name: &str,
    actor: &Actor,
) -> rusqlite::Result<i64> {
    let ts = now();
    conn.execute(
        "INSERT INTO nodes (vendor_id, parent_id, name, created_by, created, updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![vendor_id, parent_id, name, actor.username, ts],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Check that `parent_id` names a node of the same vendor
fn check_parent(conn: &Connection, vendor_id: i64, parent_id: Option<i64>) -> StoreResult<()> {
    if let Some(pid) = parent_id {
        let parent = get(conn, pid)?;
        if parent.vendor_id != vendor_id {
            return Err(StoreError::invalid(
                "parent",
                format!("node '{}' belongs to another vendor", parent.name),
            ));
        }
    }
    Ok(())
}

fn conflict_scope(conn: &Connection, vendor_id: i64, parent_id: Option<i64>) -> String {
    match parent_id {
        Some(pid) => match get(conn, pid) {
            Ok(parent) => format!(" under '{}'", parent.name),
            Err(_) => String::new(),
        },
        None => match vendors::get(conn, vendor_id) {
            Ok(vendor) => format!(" at the root of vendor '{}'", vendor.name),
            Err(_) => String::new(),
        },
    }
}

/// Create a node; `(name, vendor, parent)` is unique case-insensitively
pub fn create(
    conn: &Connection,
    vendor_id: i64,
    parent_id: Option<i64>,
    name: &str,
    actor: &Actor,
) -> StoreResult<GroupingNode> {
    let name = name.trim();
    require_text("node name", name, NAME_MAX_LENGTH)?;
    vendors::get(conn, vendor_id)?;
    check_parent(conn, vendor_id, parent_id)?;

    match insert(conn, vendor_id, parent_id, name, actor) {
        Ok(id) => get(conn, id),
        Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict {
            entity: "node",
            name: name.to_string(),
            scope: conflict_scope(conn, vendor_id, parent_id),
        }),
        Err(e) => Err(e.into()),
    }
}

pub fn get(conn: &Connection, id: i64) -> StoreResult<GroupingNode> {
    conn.query_row(
        &format!("SELECT {} FROM nodes WHERE id = ?1", COLUMNS),
        params![id],
        from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("node", id))
}

/// Case-insensitive lookup of `name` directly under `parent_id` (None = root level)
pub fn find(
    conn: &Connection,
    vendor_id: i64,
    parent_id: Option<i64>,
    name: &str,
) -> StoreResult<Option<GroupingNode>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {} FROM nodes WHERE vendor_id = ?1 AND parent_id IS ?2 AND name = ?3",
                COLUMNS
            ),
            params![vendor_id, parent_id, name.trim()],
            from_row,
        )
        .optional()?)
}

/// Fetch or create; the flag is true when a row was inserted
///
/// Losing an insert race to another writer re-fetches the winner's row.
pub fn get_or_create(
    conn: &Connection,
    vendor_id: i64,
    parent_id: Option<i64>,
    name: &str,
    actor: &Actor,
) -> StoreResult<(GroupingNode, bool)> {
    let name = name.trim();
    require_text("node name", name, NAME_MAX_LENGTH)?;

    let (node, created) = match find(conn, vendor_id, parent_id, name)? {
        Some(existing) => (existing, false),
        None => match insert(conn, vendor_id, parent_id, name, actor) {
            Ok(id) => (get(conn, id)?, true),
            Err(e) if is_unique_violation(&e) => {
                let existing = find(conn, vendor_id, parent_id, name)?
                    .ok_or_else(|| StoreError::not_found("node", name))?;
                (existing, false)
            }
            Err(e) => return Err(e.into()),
        },
    };

    if parent_id == Some(node.id) {
        return Err(StoreError::invalid(
            "parent",
            format!("node '{}' would be its own parent", node.name),
        ));
    }

    Ok((node, created))
}

/// List nodes ordered by name
pub fn list(
    conn: &Connection,
    vendor_id: Option<i64>,
    created_by: Option<&str>,
) -> StoreResult<Vec<GroupingNode>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM nodes
         WHERE (?1 IS NULL OR vendor_id = ?1) AND (?2 IS NULL OR created_by = ?2)
         ORDER BY name, id",
        COLUMNS
    ))?;
    let rows = stmt.query_map(params![vendor_id, created_by], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Slash-separated path from the root, e.g. `Main/Switching`
pub fn path(conn: &Connection, id: i64) -> StoreResult<String> {
    let mut parts = Vec::new();
    let mut seen = HashSet::new();
    let mut next = Some(id);

    while let Some(current) = next {
        if !seen.insert(current) {
            return Err(StoreError::invalid(
                "parent",
                format!("cycle detected at node {}", current),
            ));
        }
        let node = get(conn, current)?;
        parts.push(node.name);
        next = node.parent_id;
    }

    parts.reverse();
    Ok(parts.join("/"))
}

/// The whole hierarchy of a vendor
pub fn tree(conn: &Connection, vendor_id: i64) -> StoreResult<NodeTree> {
    Ok(NodeTree::build(list(conn, Some(vendor_id), None)?))
}

/// Delete a node with its subtree and the commands filed under it (owner-scoped)
pub fn delete(conn: &Connection, id: i64, actor: &Actor) -> StoreResult<GroupingNode> {
    let node = get(conn, id)?;
    ensure_owner("node", id, &node.created_by, actor)?;
    conn.execute("DELETE FROM nodes WHERE id = ?1", params![id])?;
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::{Store, Vendor};

    fn setup() -> (Store, Vendor, Actor) {
        let store = Store::open_in_memory().unwrap();
        let actor = Actor::member("alice");
        let vendor = vendors::create(store.conn(), "Cisco", &actor).unwrap();
        (store, vendor, actor)
    }

    #[test]
    fn test_root_nodes_are_deduplicated() {
        let (store, vendor, actor) = setup();
        create(store.conn(), vendor.id, None, "Main", &actor).unwrap();

        let err = create(store.conn(), vendor.id, None, "MAIN", &actor).unwrap_err();
        assert!(err.is_conflict());

        let (node, created) = get_or_create(store.conn(), vendor.id, None, "main", &actor).unwrap();
        assert!(!created);
        assert_eq!(node.name, "Main");
    }

    #[test]
    fn test_same_name_under_different_parents() {
        let (store, vendor, actor) = setup();
        let a = create(store.conn(), vendor.id, None, "A", &actor).unwrap();
        let b = create(store.conn(), vendor.id, None, "B", &actor).unwrap();

        let under_a = create(store.conn(), vendor.id, Some(a.id), "Routing", &actor).unwrap();
        let under_b = create(store.conn(), vendor.id, Some(b.id), "Routing", &actor).unwrap();
        assert_ne!(under_a.id, under_b.id);

        assert_eq!(path(store.conn(), under_b.id).unwrap(), "B/Routing");
    }

    #[test]
    fn test_parent_must_share_vendor() {
        let (store, vendor, actor) = setup();
        let other = vendors::create(store.conn(), "Juniper", &actor).unwrap();
        let foreign = create(store.conn(), other.id, None, "Junos", &actor).unwrap();

        let err = create(store.conn(), vendor.id, Some(foreign.id), "X", &actor).unwrap_err();
        assert!(matches!(err, StoreError::Invalid { field: "parent", .. }));
    }

    #[test]
    fn test_delete_cascades_to_children() {
        let (store, vendor, actor) = setup();
        let root = create(store.conn(), vendor.id, None, "Main", &actor).unwrap();
        let child = create(store.conn(), vendor.id, Some(root.id), "Child", &actor).unwrap();

        let err = delete(store.conn(), root.id, &Actor::member("mallory")).unwrap_err();
        assert!(matches!(err, StoreError::NotOwner { .. }));

        delete(store.conn(), root.id, &actor).unwrap();
        assert!(get(store.conn(), child.id).is_err());
    }
}
