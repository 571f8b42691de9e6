//! Command rows

use std::sync::OnceLock;

use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};

use super::{
    ensure_owner, is_unique_violation, limit_text, nodes, now, parse_datetime, platforms,
    require_text, vendors, Command, CommandFilter, CommandUpdate, CommandView, NewCommand,
    StoreError, StoreResult, COMMAND_MAX_LENGTH, DESCRIPTION_MAX_LENGTH, EXAMPLE_MAX_LENGTH,
    VERSION_MAX_LENGTH,
};
use crate::core::actor::Actor;

const COLUMNS: &str = "c.id, c.vendor_id, c.command, c.description, c.example, c.version, \
                       c.platform_id, c.node_id, c.method, c.created_by, c.created, c.updated";

/// Version strings such as `15.2.3`, `15.2(3)` or `15.2(3)T`
fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d+(\.\d+)+(\([0-9]+\))?([A-Za-z])?$").expect("version pattern is valid")
    })
}

fn from_row(row: &Row) -> rusqlite::Result<Command> {
    let method: String = row.get(8)?;
    Ok(Command {
        id: row.get(0)?,
        vendor_id: row.get(1)?,
        command: row.get(2)?,
        description: row.get(3)?,
        example: row.get(4)?,
        version: row.get(5)?,
        platform_id: row.get(6)?,
        node_id: row.get(7)?,
        method: method.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, e.into())
        })?,
        created_by: row.get(9)?,
        created: parse_datetime(row.get(10)?),
        updated: parse_datetime(row.get(11)?),
    })
}

fn view_from_row(row: &Row) -> rusqlite::Result<CommandView> {
    Ok(CommandView {
        command: from_row(row)?,
        vendor: row.get(12)?,
        platform: row.get(13)?,
        node: row.get(14)?,
    })
}

/// Check a version string against the accepted format
pub fn validate_version(version: &str) -> StoreResult<()> {
    limit_text("version", Some(version), VERSION_MAX_LENGTH)?;
    if version_pattern().is_match(version) {
        Ok(())
    } else {
        Err(StoreError::invalid(
            "version",
            format!(
                "'{}' is not a valid version number (e.g., 15.2.3, 15.2(3)T)",
                version
            ),
        ))
    }
}

/// Node and platform must belong to the command's vendor
fn check_relations(
    conn: &Connection,
    vendor_id: i64,
    platform_id: Option<i64>,
    node_id: Option<i64>,
) -> StoreResult<()> {
    if let Some(pid) = platform_id {
        if platforms::get(conn, pid)?.vendor_id != vendor_id {
            return Err(StoreError::invalid(
                "platform",
                "platform vendor must match the command vendor",
            ));
        }
    }
    if let Some(nid) = node_id {
        if nodes::get(conn, nid)?.vendor_id != vendor_id {
            return Err(StoreError::invalid(
                "node",
                "node vendor must match the command vendor",
            ));
        }
    }
    Ok(())
}

fn check_text(
    command: &str,
    description: Option<&str>,
    example: Option<&str>,
) -> StoreResult<()> {
    require_text("command", command, COMMAND_MAX_LENGTH)?;
    limit_text("description", description, DESCRIPTION_MAX_LENGTH)?;
    limit_text("example", example, EXAMPLE_MAX_LENGTH)
}

/// Insert a command; `(command, vendor)` is unique case-insensitively
pub fn insert(conn: &Connection, new: &NewCommand, actor: &Actor) -> StoreResult<Command> {
    let command = new.command.trim();
    check_text(command, new.description.as_deref(), new.example.as_deref())?;
    if let Some(ref version) = new.version {
        validate_version(version)?;
    }
    let vendor = vendors::get(conn, new.vendor_id)?;
    check_relations(conn, new.vendor_id, new.platform_id, new.node_id)?;

    let ts = now();
    let result = conn.execute(
        "INSERT INTO commands
            (vendor_id, command, description, example, version, platform_id, node_id,
             method, created_by, created, updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            new.vendor_id,
            command,
            new.description,
            new.example,
            new.version,
            new.platform_id,
            new.node_id,
            new.method.as_str(),
            actor.username,
            ts,
        ],
    );

    match result {
        Ok(_) => get(conn, conn.last_insert_rowid()),
        Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict {
            entity: "command",
            name: command.to_string(),
            scope: format!(" for vendor '{}'", vendor.name),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Overwrite description, example, node and platform of an existing command
pub fn overwrite(conn: &Connection, id: i64, update: &CommandUpdate) -> StoreResult<Command> {
    let existing = get(conn, id)?;
    check_text(
        &existing.command,
        update.description.as_deref(),
        update.example.as_deref(),
    )?;
    check_relations(conn, existing.vendor_id, update.platform_id, update.node_id)?;

    conn.execute(
        "UPDATE commands
         SET description = ?2, example = ?3, platform_id = ?4, node_id = ?5, updated = ?6
         WHERE id = ?1",
        params![
            id,
            update.description,
            update.example,
            update.platform_id,
            update.node_id,
            now(),
        ],
    )?;
    get(conn, id)
}

pub fn get(conn: &Connection, id: i64) -> StoreResult<Command> {
    conn.query_row(
        &format!("SELECT {} FROM commands c WHERE c.id = ?1", COLUMNS),
        params![id],
        from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("command", id))
}

/// Case-insensitive lookup of a command within a vendor
pub fn find(conn: &Connection, vendor_id: i64, command: &str) -> StoreResult<Option<Command>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {} FROM commands c WHERE c.vendor_id = ?1 AND c.command = ?2",
                COLUMNS
            ),
            params![vendor_id, command.trim()],
            from_row,
        )
        .optional()?)
}

/// LIKE pattern matching `needle` literally anywhere in the column
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Build the WHERE clause shared by `list` and `count`
fn filter_clause(filter: &CommandFilter) -> (String, Vec<Box<dyn ToSql>>) {
    let mut sql = String::from(" WHERE 1=1");
    let mut params_vec: Vec<Box<dyn ToSql>> = vec![];

    if let Some(ref search) = filter.search {
        sql.push_str(" AND c.command LIKE ? ESCAPE '\\'");
        params_vec.push(Box::new(contains_pattern(search)));
    }

    if let Some(ref vendor) = filter.vendor {
        sql.push_str(" AND v.name = ?");
        params_vec.push(Box::new(vendor.clone()));
    }

    if let Some(ref platform) = filter.platform {
        sql.push_str(" AND p.name = ?");
        params_vec.push(Box::new(platform.clone()));
    }

    if let Some(ref node) = filter.node {
        sql.push_str(" AND n.name = ?");
        params_vec.push(Box::new(node.clone()));
    }

    if let Some(ref version) = filter.version {
        sql.push_str(" AND c.version LIKE ? ESCAPE '\\'");
        params_vec.push(Box::new(contains_pattern(version)));
    }

    if let Some(method) = filter.method {
        sql.push_str(" AND c.method = ?");
        params_vec.push(Box::new(method.as_str()));
    }

    if let Some(ref created_by) = filter.created_by {
        sql.push_str(" AND c.created_by = ?");
        params_vec.push(Box::new(created_by.clone()));
    }

    (sql, params_vec)
}

const JOINS: &str = " FROM commands c
    JOIN vendors v ON v.id = c.vendor_id
    LEFT JOIN platforms p ON p.id = c.platform_id
    LEFT JOIN nodes n ON n.id = c.node_id";

/// List commands with filters, newest first
pub fn list(conn: &Connection, filter: &CommandFilter) -> StoreResult<Vec<CommandView>> {
    let (where_sql, params_vec) = filter_clause(filter);
    let mut sql = format!(
        "SELECT {}, v.name, p.name, n.name{}{} ORDER BY c.created DESC, c.id DESC",
        COLUMNS, JOINS, where_sql
    );

    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
        if let Some(offset) = filter.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
    }

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), view_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Number of commands matching a filter (limit/offset ignored)
pub fn count(conn: &Connection, filter: &CommandFilter) -> StoreResult<usize> {
    let (where_sql, params_vec) = filter_clause(filter);
    let sql = format!("SELECT COUNT(*){}{}", JOINS, where_sql);
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let n: i64 = conn.query_row(&sql, params_refs.as_slice(), |row| row.get(0))?;
    Ok(n as usize)
}

/// Fetch one command with its relation names
pub fn view(conn: &Connection, id: i64) -> StoreResult<CommandView> {
    conn.query_row(
        &format!(
            "SELECT {}, v.name, p.name, n.name{} WHERE c.id = ?1",
            COLUMNS, JOINS
        ),
        params![id],
        view_from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("command", id))
}

/// Delete a command (owner-scoped)
pub fn delete(conn: &Connection, id: i64, actor: &Actor) -> StoreResult<Command> {
    let command = get(conn, id)?;
    ensure_owner("command", id, &command.created_by, actor)?;
    conn.execute("DELETE FROM commands WHERE id = ?1", params![id])?;
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::{Method, Store, Vendor};

    fn setup() -> (Store, Vendor, Actor) {
        let store = Store::open_in_memory().unwrap();
        let actor = Actor::member("alice");
        let vendor = vendors::create(store.conn(), "Cisco", &actor).unwrap();
        (store, vendor, actor)
    }

    fn new_command(vendor_id: i64, command: &str) -> NewCommand {
        NewCommand {
            vendor_id,
            command: command.to_string(),
            description: None,
            example: None,
            version: None,
            platform_id: None,
            node_id: None,
            method: Method::Singular,
        }
    }

    #[test]
    fn test_version_format() {
        assert!(validate_version("15.2.3").is_ok());
        assert!(validate_version("15.2(3)T").is_ok());
        assert!(validate_version("15.2(3)").is_ok());
        assert!(validate_version("15").is_err());
        assert!(validate_version("v15.2").is_err());
        assert!(validate_version("1.2.3.4.5.6.7.8.9.10.11").is_err());
    }

    #[test]
    fn test_command_unique_per_vendor_case_insensitive() {
        let (store, vendor, actor) = setup();
        insert(store.conn(), &new_command(vendor.id, "show vlan"), &actor).unwrap();

        let err = insert(store.conn(), &new_command(vendor.id, "SHOW VLAN"), &actor).unwrap_err();
        assert!(err.is_conflict());

        let other = vendors::create(store.conn(), "Arista", &actor).unwrap();
        insert(store.conn(), &new_command(other.id, "show vlan"), &actor).unwrap();

        let found = find(store.conn(), vendor.id, "Show Vlan").unwrap().unwrap();
        assert_eq!(found.command, "show vlan");
    }

    #[test]
    fn test_relations_must_share_vendor() {
        let (store, vendor, actor) = setup();
        let other = vendors::create(store.conn(), "Juniper", &actor).unwrap();
        let foreign = nodes::create(store.conn(), other.id, None, "Junos", &actor).unwrap();

        let mut cmd = new_command(vendor.id, "show version");
        cmd.node_id = Some(foreign.id);
        let err = insert(store.conn(), &cmd, &actor).unwrap_err();
        assert!(matches!(err, StoreError::Invalid { field: "node", .. }));
    }

    #[test]
    fn test_length_limits() {
        let (store, vendor, actor) = setup();
        let mut cmd = new_command(vendor.id, "show run");
        cmd.description = Some("x".repeat(DESCRIPTION_MAX_LENGTH + 1));
        let err = insert(store.conn(), &cmd, &actor).unwrap_err();
        assert!(matches!(err, StoreError::Invalid { field: "description", .. }));
    }

    #[test]
    fn test_overwrite_replaces_fields() {
        let (store, vendor, actor) = setup();
        let node = nodes::create(store.conn(), vendor.id, None, "Main", &actor).unwrap();
        let mut cmd = new_command(vendor.id, "show ip route");
        cmd.description = Some("old".to_string());
        cmd.example = Some("show ip route 10.0.0.0".to_string());
        let created = insert(store.conn(), &cmd, &actor).unwrap();

        let updated = overwrite(
            store.conn(),
            created.id,
            &CommandUpdate {
                description: Some("new".to_string()),
                example: None,
                platform_id: None,
                node_id: Some(node.id),
            },
        )
        .unwrap();

        assert_eq!(updated.description.as_deref(), Some("new"));
        assert_eq!(updated.example, None);
        assert_eq!(updated.node_id, Some(node.id));
        assert_eq!(updated.method, Method::Singular);
    }

    #[test]
    fn test_list_filters() {
        let (store, vendor, actor) = setup();
        let node = nodes::create(store.conn(), vendor.id, None, "Routing", &actor).unwrap();
        let mut routed = new_command(vendor.id, "show ip route");
        routed.node_id = Some(node.id);
        routed.version = Some("15.2.1".to_string());
        insert(store.conn(), &routed, &actor).unwrap();
        insert(store.conn(), &new_command(vendor.id, "show vlan"), &Actor::member("bob")).unwrap();

        let all = list(store.conn(), &CommandFilter::default()).unwrap();
        assert_eq!(all.len(), 2);

        let by_search = list(
            store.conn(),
            &CommandFilter {
                search: Some("IP".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(by_search.len(), 1);
        assert_eq!(by_search[0].node.as_deref(), Some("Routing"));
        assert_eq!(by_search[0].vendor, "Cisco");

        let by_node = CommandFilter {
            node: Some("routing".to_string()),
            vendor: Some("CISCO".to_string()),
            version: Some("15.2".to_string()),
            ..Default::default()
        };
        assert_eq!(count(store.conn(), &by_node).unwrap(), 1);

        let by_owner = CommandFilter {
            created_by: Some("bob".to_string()),
            ..Default::default()
        };
        assert_eq!(list(store.conn(), &by_owner).unwrap()[0].command.command, "show vlan");
    }

    #[test]
    fn test_search_wildcards_are_literal() {
        let (store, vendor, actor) = setup();
        insert(store.conn(), &new_command(vendor.id, "show ipXroute"), &actor).unwrap();
        insert(store.conn(), &new_command(vendor.id, "show ip_route"), &actor).unwrap();
        insert(store.conn(), &new_command(vendor.id, "show 100% load"), &actor).unwrap();

        let search = |needle: &str| {
            list(
                store.conn(),
                &CommandFilter {
                    search: Some(needle.to_string()),
                    ..Default::default()
                },
            )
            .unwrap()
            .into_iter()
            .map(|v| v.command.command)
            .collect::<Vec<_>>()
        };

        assert_eq!(search("ip_route"), vec!["show ip_route"]);
        assert_eq!(search("%"), vec!["show 100% load"]);
        assert_eq!(contains_pattern(r"a\b"), r"%a\\b%");
    }

    #[test]
    fn test_list_pagination() {
        let (store, vendor, actor) = setup();
        for i in 0..5 {
            insert(store.conn(), &new_command(vendor.id, &format!("cmd {}", i)), &actor).unwrap();
        }

        let page = list(
            store.conn(),
            &CommandFilter {
                limit: Some(2),
                offset: Some(4),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(count(store.conn(), &CommandFilter::default()).unwrap(), 5);
    }
}
