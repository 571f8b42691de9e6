//! Upsert reconciler
//!
//! Applies a parsed CSV to the store inside one transaction. Every grouping
//! node and every command gets its own savepoint, so a failing item rolls
//! back alone and is reported instead of aborting the import. Anything
//! failing outside a savepoint aborts and rolls back the whole import.

use std::collections::HashMap;

use rusqlite::Connection;

use crate::core::actor::Actor;
use crate::core::store::{
    commands, history, nodes, platforms, CommandUpdate, GroupingNode, Method, NewCommand,
    NewImportRun, Store, StoreError, StoreResult, Vendor, SENTINEL_PLATFORM,
};

use super::parser::{CommandRecord, NodeRecord, ParsedImport};
use super::report::ImportReport;
use super::ImportError;

/// Root every CSV grouping is nested under
#[derive(Debug, Clone)]
pub enum RootSelector {
    /// Get-or-create a root node with this name
    Name(String),
    /// Use an existing node
    Existing(GroupingNode),
}

/// Facts about the uploaded file kept in the import history
#[derive(Debug, Clone)]
pub struct UploadInfo {
    pub file_name: Option<String>,
    pub sha256: String,
    pub encoding: String,
    pub lossy: bool,
}

impl Default for UploadInfo {
    fn default() -> Self {
        Self {
            file_name: None,
            sha256: String::new(),
            encoding: "UTF-8".to_string(),
            lossy: false,
        }
    }
}

/// Fold a name the way the store's NOCASE collation does
fn fold(name: &str) -> String {
    name.to_ascii_lowercase()
}

enum Upsert {
    Created,
    Updated,
    Duplicate,
}

/// Result of one command inside its savepoint
struct CommandResult {
    upsert: Upsert,
    node_name: Option<String>,
    /// Grouping node created on the fly for this command
    created_node: Option<GroupingNode>,
}

pub struct Reconciler<'a> {
    store: &'a mut Store,
    vendor: Vendor,
    root: Option<RootSelector>,
    actor: &'a Actor,
    override_existing: bool,
    upload: UploadInfo,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        store: &'a mut Store,
        vendor: Vendor,
        root: Option<RootSelector>,
        actor: &'a Actor,
        override_existing: bool,
    ) -> Self {
        Self {
            store,
            vendor,
            root,
            actor,
            override_existing,
            upload: UploadInfo::default(),
        }
    }

    pub fn with_upload(mut self, upload: UploadInfo) -> Self {
        self.upload = upload;
        self
    }

    /// Apply the import and commit
    pub fn reconcile(self, parsed: &ParsedImport) -> Result<ImportReport, ImportError> {
        self.run(parsed, false)
    }

    /// Do all the work of `reconcile`, then roll back
    pub fn preview(self, parsed: &ParsedImport) -> Result<ImportReport, ImportError> {
        self.run(parsed, true)
    }

    fn run(self, parsed: &ParsedImport, dry_run: bool) -> Result<ImportReport, ImportError> {
        let Reconciler {
            store,
            vendor,
            root,
            actor,
            override_existing,
            upload,
        } = self;

        let mut report = ImportReport::new(&vendor.name, override_existing, dry_run);
        report.encoding = Some(upload.encoding.clone());
        report.lossy_decode = upload.lossy;
        report.warnings = parsed.warnings.clone();
        report.nodes.seen = parsed.nodes.len();
        report.commands.seen = parsed.commands.len();

        tracing::info!(
            vendor = %vendor.name,
            nodes = parsed.nodes.len(),
            commands = parsed.commands.len(),
            override_existing,
            dry_run,
            "reconciling import"
        );

        let mut tx = store.transaction()?;

        let root = resolve_root(&tx, &vendor, root, actor, &mut report)?;
        report.root = root.as_ref().map(|r| r.name.clone());

        let mut ctx = Context {
            vendor: &vendor,
            root: root.as_ref(),
            actor,
            override_existing,
            known_nodes: HashMap::new(),
            platform_id: None,
        };

        for record in &parsed.nodes {
            let sp = tx.savepoint()?;
            match ctx.reconcile_node(&sp, record) {
                Ok(Some((node, true))) => {
                    sp.commit()?;
                    tracing::debug!(node = %node.name, "created grouping node");
                    report.node_created(&node.name, ctx.root_name());
                    ctx.remember(node);
                }
                Ok(Some((node, false))) => {
                    sp.commit()?;
                    ctx.remember(node);
                }
                Ok(None) => sp.commit()?,
                Err(e) => {
                    drop(sp);
                    tracing::warn!(node = %record.name, error = %e, "grouping node failed");
                    report.node_failed(&record.name, e);
                }
            }
        }

        if !parsed.commands.is_empty() {
            let (platform, _) =
                platforms::get_or_create(&tx, vendor.id, SENTINEL_PLATFORM, actor)?;
            ctx.platform_id = Some(platform.id);
        }

        for record in &parsed.commands {
            let sp = tx.savepoint()?;
            match ctx.reconcile_command(&sp, record) {
                Ok(result) => {
                    sp.commit()?;
                    if let Some(node) = result.created_node {
                        report.node_created(&node.name, ctx.root_name());
                        ctx.remember(node);
                    }
                    let node = result.node_name.as_deref();
                    match result.upsert {
                        Upsert::Created => report.command_created(&record.command, node),
                        Upsert::Updated => report.command_updated(&record.command, node),
                        Upsert::Duplicate => {
                            tracing::debug!(command = %record.command, "duplicate command skipped");
                            report.command_duplicate(&record.command)
                        }
                    }
                }
                Err(e) => {
                    drop(sp);
                    tracing::warn!(command = %record.command, error = %e, "command failed");
                    report.command_failed(&record.command, e);
                }
            }
        }

        if dry_run {
            tx.rollback()?;
            tracing::info!("dry run; import rolled back");
        } else {
            let run_id = history::record(
                &tx,
                &NewImportRun {
                    vendor_id: vendor.id,
                    root_name: report.root.clone(),
                    actor: actor.username.clone(),
                    file_name: upload.file_name.clone(),
                    sha256: upload.sha256.clone(),
                    encoding: upload.encoding.clone(),
                    override_existing,
                    commands_seen: report.commands.seen,
                    commands_created: report.commands.created,
                    commands_updated: report.commands.updated,
                    commands_skipped: report.commands.skipped,
                    nodes_seen: report.nodes.seen,
                    nodes_created: report.nodes.created,
                },
            )?;
            tx.commit()?;
            report.run_id = Some(run_id);
            tracing::info!(
                run_id,
                created = report.commands.created,
                updated = report.commands.updated,
                skipped = report.commands.skipped,
                "import committed"
            );
        }

        Ok(report)
    }
}

/// Resolve or create the root node before any other mutation
fn resolve_root(
    conn: &Connection,
    vendor: &Vendor,
    root: Option<RootSelector>,
    actor: &Actor,
    report: &mut ImportReport,
) -> Result<Option<GroupingNode>, ImportError> {
    match root {
        None => Ok(None),
        Some(RootSelector::Existing(node)) => {
            if node.vendor_id != vendor.id {
                return Err(ImportError::RootVendorMismatch {
                    root: node.name,
                    vendor: vendor.name.clone(),
                });
            }
            Ok(Some(node))
        }
        Some(RootSelector::Name(name)) => {
            match nodes::get_or_create(conn, vendor.id, None, &name, actor) {
                Ok((node, created)) => {
                    if created {
                        tracing::debug!(root = %node.name, "created root node");
                        report.node_created(&node.name, None);
                    }
                    Ok(Some(node))
                }
                Err(StoreError::Invalid { message, .. }) => {
                    Err(ImportError::InvalidRoot { name, message })
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}

/// State shared across items of one import
struct Context<'r> {
    vendor: &'r Vendor,
    root: Option<&'r GroupingNode>,
    actor: &'r Actor,
    override_existing: bool,
    /// Committed nodes under the root, keyed by folded name
    known_nodes: HashMap<String, GroupingNode>,
    platform_id: Option<i64>,
}

impl Context<'_> {
    fn root_id(&self) -> Option<i64> {
        self.root.map(|r| r.id)
    }

    fn root_name(&self) -> Option<&str> {
        self.root.map(|r| r.name.as_str())
    }

    fn is_root_name(&self, name: &str) -> bool {
        self.root.is_some_and(|r| fold(&r.name) == fold(name))
    }

    fn remember(&mut self, node: GroupingNode) {
        self.known_nodes.insert(fold(&node.name), node);
    }

    /// `None` when the record names the root itself
    fn reconcile_node(
        &self,
        conn: &Connection,
        record: &NodeRecord,
    ) -> StoreResult<Option<(GroupingNode, bool)>> {
        if self.is_root_name(&record.name) {
            return Ok(None);
        }
        if let Some(node) = self.known_nodes.get(&fold(&record.name)) {
            return Ok(Some((node.clone(), false)));
        }
        nodes::get_or_create(conn, self.vendor.id, self.root_id(), &record.name, self.actor)
            .map(Some)
    }

    fn reconcile_command(
        &self,
        conn: &Connection,
        record: &CommandRecord,
    ) -> StoreResult<CommandResult> {
        let (node, created_node) = self.resolve_node(conn, record.grouping_hint.as_deref())?;
        let node_id = node.as_ref().map(|n| n.id);
        let node_name = node.map(|n| n.name);

        let upsert = match commands::find(conn, self.vendor.id, &record.command)? {
            Some(existing) => self.upsert_existing(conn, existing.id, record, node_id)?,
            None => self.insert_new(conn, record, node_id)?,
        };

        Ok(CommandResult {
            upsert,
            node_name,
            created_node,
        })
    }

    /// Insert a command `find` did not see; a conflict means another writer won
    fn insert_new(
        &self,
        conn: &Connection,
        record: &CommandRecord,
        node_id: Option<i64>,
    ) -> StoreResult<Upsert> {
        let new = NewCommand {
            vendor_id: self.vendor.id,
            command: record.command.clone(),
            description: record.description.clone(),
            example: record.example.clone(),
            version: None,
            platform_id: self.platform_id,
            node_id,
            method: Method::Bulk,
        };
        match commands::insert(conn, &new, self.actor) {
            Ok(_) => Ok(Upsert::Created),
            Err(e) if e.is_conflict() => {
                let existing = commands::find(conn, self.vendor.id, &record.command)?.ok_or(e)?;
                self.upsert_existing(conn, existing.id, record, node_id)
            }
            Err(e) => Err(e),
        }
    }

    fn upsert_existing(
        &self,
        conn: &Connection,
        id: i64,
        record: &CommandRecord,
        node_id: Option<i64>,
    ) -> StoreResult<Upsert> {
        if !self.override_existing {
            return Ok(Upsert::Duplicate);
        }
        commands::overwrite(
            conn,
            id,
            &CommandUpdate {
                description: record.description.clone(),
                example: record.example.clone(),
                platform_id: self.platform_id,
                node_id,
            },
        )?;
        Ok(Upsert::Updated)
    }

    /// Node a command is filed under, plus the node if it had to be created
    fn resolve_node(
        &self,
        conn: &Connection,
        hint: Option<&str>,
    ) -> StoreResult<(Option<GroupingNode>, Option<GroupingNode>)> {
        let hint = match hint {
            Some(h) if !self.is_root_name(h) => h,
            _ => return Ok((self.root.cloned(), None)),
        };

        if let Some(node) = self.known_nodes.get(&fold(hint)) {
            return Ok((Some(node.clone()), None));
        }

        let (node, created) =
            nodes::get_or_create(conn, self.vendor.id, self.root_id(), hint, self.actor)?;
        let created_node = created.then(|| node.clone());
        Ok((Some(node), created_node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::vendors;
    use crate::import::parser::parse_csv;

    const SAMPLE: &str = "\
Switching,,,
show vlan,List VLANs,show vlan brief,
Routing,,,
show ip route,List routes,,
";

    fn setup() -> (Store, Vendor, Actor) {
        let store = Store::open_in_memory().unwrap();
        let actor = Actor::member("alice");
        let vendor = vendors::create(store.conn(), "Cisco", &actor).unwrap();
        (store, vendor, actor)
    }

    fn import(
        store: &mut Store,
        vendor: &Vendor,
        actor: &Actor,
        text: &str,
        override_existing: bool,
    ) -> ImportReport {
        let parsed = parse_csv(text, Some("Main"));
        Reconciler::new(
            store,
            vendor.clone(),
            Some(RootSelector::Name("Main".to_string())),
            actor,
            override_existing,
        )
        .reconcile(&parsed)
        .unwrap()
    }

    fn command_count(store: &Store) -> i64 {
        store
            .conn()
            .query_row("SELECT COUNT(*) FROM commands", [], |r| r.get(0))
            .unwrap()
    }

    fn node_count(store: &Store) -> i64 {
        store
            .conn()
            .query_row("SELECT COUNT(*) FROM nodes", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_builds_tree_under_root() {
        let (mut store, vendor, actor) = setup();
        let report = import(&mut store, &vendor, &actor, SAMPLE, false);

        assert_eq!(report.root.as_deref(), Some("Main"));
        assert_eq!(report.commands.created, 2);
        assert_eq!(report.nodes.seen, 2);
        // Main, Switching, Routing
        assert_eq!(report.nodes.created, 3);
        assert!(report.run_id.is_some());

        let conn = store.conn();
        let main = nodes::find(conn, vendor.id, None, "main").unwrap().unwrap();
        let switching = nodes::find(conn, vendor.id, Some(main.id), "Switching")
            .unwrap()
            .unwrap();
        let routing = nodes::find(conn, vendor.id, Some(main.id), "Routing")
            .unwrap()
            .unwrap();

        let vlan = commands::find(conn, vendor.id, "show vlan").unwrap().unwrap();
        assert_eq!(vlan.node_id, Some(switching.id));
        assert_eq!(vlan.method, Method::Bulk);
        let route = commands::find(conn, vendor.id, "SHOW IP ROUTE").unwrap().unwrap();
        assert_eq!(route.node_id, Some(routing.id));
        assert_eq!(route.method, Method::Bulk);

        let na = platforms::find(conn, vendor.id, SENTINEL_PLATFORM).unwrap().unwrap();
        assert_eq!(vlan.platform_id, Some(na.id));
    }

    #[test]
    fn test_second_run_is_all_duplicates() {
        let (mut store, vendor, actor) = setup();
        import(&mut store, &vendor, &actor, SAMPLE, false);
        let nodes_before = node_count(&store);

        let report = import(&mut store, &vendor, &actor, SAMPLE, false);
        assert_eq!(report.commands.created, 0);
        assert_eq!(report.commands.skipped, 2);
        assert_eq!(report.nodes.created, 0);
        assert_eq!(report.failed_count(), 0);
        assert_eq!(node_count(&store), nodes_before);
        assert_eq!(command_count(&store), 2);
        assert!(report.skipped_commands[0].reason.contains("duplicate"));
    }

    #[test]
    fn test_override_updates_in_place() {
        let (mut store, vendor, actor) = setup();
        import(&mut store, &vendor, &actor, SAMPLE, false);

        let changed = "\
Routing,,,
SHOW VLAN,,Moved and described,show vlan id 10
";
        let report = import(&mut store, &vendor, &actor, changed, true);
        assert_eq!(report.commands.updated, 1);
        assert_eq!(report.commands.created, 0);
        assert_eq!(command_count(&store), 2);

        let conn = store.conn();
        let vlan = commands::find(conn, vendor.id, "show vlan").unwrap().unwrap();
        assert_eq!(vlan.description.as_deref(), Some("Moved and described"));
        assert_eq!(vlan.example.as_deref(), Some("show vlan id 10"));
        let routing = nodes::get(conn, vlan.node_id.unwrap()).unwrap();
        assert_eq!(routing.name, "Routing");
    }

    #[test]
    fn test_duplicate_within_one_file() {
        let (mut store, vendor, actor) = setup();
        let text = "Routing,,,\nshow ip route,,first,\nshow ip route,,second,\n";
        let report = import(&mut store, &vendor, &actor, text, false);
        assert_eq!(report.commands.created, 1);
        assert_eq!(report.commands.skipped, 1);

        let route = commands::find(store.conn(), vendor.id, "show ip route")
            .unwrap()
            .unwrap();
        assert_eq!(route.description.as_deref(), Some("first"));
    }

    #[test]
    fn test_failed_command_does_not_abort() {
        let (mut store, vendor, actor) = setup();
        let long = "x".repeat(300);
        let text = format!("Routing,,,\n{},,too long,\nshow ip route,,ok,\n", long);
        let report = import(&mut store, &vendor, &actor, &text, false);

        assert_eq!(report.commands.created, 1);
        assert_eq!(report.failed_count(), 1);
        assert!(report.skipped_commands[0].reason.contains("at most 255"));
        assert_eq!(command_count(&store), 1);
    }

    #[test]
    fn test_grouping_named_like_root_maps_to_root() {
        let (mut store, vendor, actor) = setup();
        let text = "MAIN,,,\nshow clock,,Current time,\n";
        let report = import(&mut store, &vendor, &actor, text, false);

        assert_eq!(report.nodes.created, 1);
        let conn = store.conn();
        let main = nodes::find(conn, vendor.id, None, "Main").unwrap().unwrap();
        let clock = commands::find(conn, vendor.id, "show clock").unwrap().unwrap();
        assert_eq!(clock.node_id, Some(main.id));
    }

    #[test]
    fn test_without_root_nodes_are_top_level() {
        let (mut store, vendor, actor) = setup();
        let parsed = parse_csv("Routing,,,\nshow ip route,,List routes,\n", None);
        let report = Reconciler::new(&mut store, vendor.clone(), None, &actor, false)
            .reconcile(&parsed)
            .unwrap();

        assert_eq!(report.root, None);
        assert_eq!(report.created_nodes[0].parent, None);
        let routing = nodes::find(store.conn(), vendor.id, None, "Routing")
            .unwrap()
            .unwrap();
        assert!(routing.is_root());
    }

    #[test]
    fn test_preview_leaves_store_unchanged() {
        let (mut store, vendor, actor) = setup();
        let parsed = parse_csv(SAMPLE, Some("Main"));
        let report = Reconciler::new(
            &mut store,
            vendor.clone(),
            Some(RootSelector::Name("Main".to_string())),
            &actor,
            false,
        )
        .preview(&parsed)
        .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.commands.created, 2);
        assert_eq!(report.nodes.created, 3);
        assert_eq!(report.run_id, None);
        assert_eq!(command_count(&store), 0);
        assert_eq!(node_count(&store), 0);
        assert!(history::list(store.conn(), None).unwrap().is_empty());
    }

    #[test]
    fn test_existing_root_of_other_vendor_is_rejected() {
        let (mut store, vendor, actor) = setup();
        let other = vendors::create(store.conn(), "Juniper", &actor).unwrap();
        let (foreign, _) = nodes::get_or_create(store.conn(), other.id, None, "Main", &actor).unwrap();

        let parsed = parse_csv(SAMPLE, Some("Main"));
        let err = Reconciler::new(
            &mut store,
            vendor,
            Some(RootSelector::Existing(foreign)),
            &actor,
            false,
        )
        .reconcile(&parsed)
        .unwrap_err();
        assert!(matches!(err, ImportError::RootVendorMismatch { .. }));
        assert_eq!(command_count(&store), 0);
    }

    #[test]
    fn test_history_recorded_on_commit() {
        let (mut store, vendor, actor) = setup();
        let parsed = parse_csv(SAMPLE, Some("Main"));
        Reconciler::new(
            &mut store,
            vendor.clone(),
            Some(RootSelector::Name("Main".to_string())),
            &actor,
            false,
        )
        .with_upload(UploadInfo {
            file_name: Some("cisco.csv".to_string()),
            sha256: "abc".to_string(),
            ..UploadInfo::default()
        })
        .reconcile(&parsed)
        .unwrap();

        let runs = history::list(store.conn(), Some(vendor.id)).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].file_name.as_deref(), Some("cisco.csv"));
        assert_eq!(runs[0].commands_created, 2);
        assert_eq!(runs[0].root_name.as_deref(), Some("Main"));
    }

    #[test]
    fn test_insert_conflict_falls_back_to_existing_row() {
        let (store, vendor, actor) = setup();
        let conn = store.conn();
        // Row written by a concurrent import after this one's lookup
        commands::insert(
            conn,
            &NewCommand {
                vendor_id: vendor.id,
                command: "show vlan".to_string(),
                description: Some("old".to_string()),
                example: None,
                version: None,
                platform_id: None,
                node_id: None,
                method: Method::Singular,
            },
            &Actor::member("bob"),
        )
        .unwrap();

        let record = CommandRecord {
            command: "SHOW VLAN".to_string(),
            description: Some("List VLANs".to_string()),
            example: None,
            grouping_hint: None,
        };
        let mut ctx = Context {
            vendor: &vendor,
            root: None,
            actor: &actor,
            override_existing: false,
            known_nodes: HashMap::new(),
            platform_id: None,
        };

        let upsert = ctx.insert_new(conn, &record, None).unwrap();
        assert!(matches!(upsert, Upsert::Duplicate));

        ctx.override_existing = true;
        let upsert = ctx.insert_new(conn, &record, None).unwrap();
        assert!(matches!(upsert, Upsert::Updated));

        assert_eq!(command_count(&store), 1);
        let row = commands::find(conn, vendor.id, "show vlan").unwrap().unwrap();
        assert_eq!(row.description.as_deref(), Some("List VLANs"));
        assert_eq!(row.created_by, "bob");
    }
}
