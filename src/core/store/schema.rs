//! Database schema initialization

use rusqlite::{params, OptionalExtension};

use super::{Store, StoreResult, SCHEMA_VERSION};

impl Store {
    /// Installed schema version, `None` for a fresh database
    pub(super) fn schema_version(&self) -> StoreResult<Option<i32>> {
        let has_table: bool = self.conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            [],
            |row| row.get(0),
        )?;
        if !has_table {
            return Ok(None);
        }

        Ok(self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?)
    }

    /// Initialize database schema
    pub(super) fn init_schema(&mut self) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Vendors own everything else
            CREATE TABLE IF NOT EXISTS vendors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL COLLATE NOCASE UNIQUE,
                created_by TEXT NOT NULL,
                created TEXT NOT NULL,
                updated TEXT NOT NULL
            );

            -- Platforms (OS) per vendor, including the "N/A" sentinel
            CREATE TABLE IF NOT EXISTS platforms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                vendor_id INTEGER NOT NULL REFERENCES vendors(id) ON DELETE CASCADE,
                name TEXT NOT NULL COLLATE NOCASE,
                created_by TEXT NOT NULL,
                created TEXT NOT NULL,
                UNIQUE (vendor_id, name)
            );

            -- Grouping nodes (categories/tags), self-referential hierarchy
            CREATE TABLE IF NOT EXISTS nodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                vendor_id INTEGER NOT NULL REFERENCES vendors(id) ON DELETE CASCADE,
                parent_id INTEGER REFERENCES nodes(id) ON DELETE CASCADE,
                name TEXT NOT NULL COLLATE NOCASE,
                created_by TEXT NOT NULL,
                created TEXT NOT NULL,
                updated TEXT NOT NULL
            );
            -- Root nodes have a NULL parent, which a plain UNIQUE would not dedupe
            CREATE UNIQUE INDEX IF NOT EXISTS idx_nodes_key
                ON nodes(vendor_id, IFNULL(parent_id, 0), name);
            CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id);

            -- Commands
            CREATE TABLE IF NOT EXISTS commands (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                vendor_id INTEGER NOT NULL REFERENCES vendors(id) ON DELETE CASCADE,
                command TEXT NOT NULL COLLATE NOCASE,
                description TEXT,
                example TEXT,
                version TEXT,
                platform_id INTEGER REFERENCES platforms(id) ON DELETE SET NULL,
                node_id INTEGER REFERENCES nodes(id) ON DELETE CASCADE,
                method TEXT NOT NULL CHECK (method IN ('SINGULAR', 'BULK')),
                created_by TEXT NOT NULL,
                created TEXT NOT NULL,
                updated TEXT NOT NULL,
                UNIQUE (vendor_id, command)
            );
            CREATE INDEX IF NOT EXISTS idx_commands_node ON commands(node_id);
            CREATE INDEX IF NOT EXISTS idx_commands_platform ON commands(platform_id);
            CREATE INDEX IF NOT EXISTS idx_commands_created_by ON commands(created_by);

            -- One row per committed CSV import
            CREATE TABLE IF NOT EXISTS imports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                vendor_id INTEGER NOT NULL REFERENCES vendors(id) ON DELETE CASCADE,
                root_name TEXT,
                actor TEXT NOT NULL,
                file_name TEXT,
                sha256 TEXT NOT NULL,
                encoding TEXT NOT NULL,
                override INTEGER NOT NULL,
                commands_seen INTEGER NOT NULL,
                commands_created INTEGER NOT NULL,
                commands_updated INTEGER NOT NULL,
                commands_skipped INTEGER NOT NULL,
                nodes_seen INTEGER NOT NULL,
                nodes_created INTEGER NOT NULL,
                created TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_imports_vendor ON imports(vendor_id);
            "#,
        )?;

        tx.execute("DELETE FROM schema_version", [])?;
        tx.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;
        tx.commit()?;

        tracing::debug!("initialized store schema v{}", SCHEMA_VERSION);
        Ok(())
    }
}
