//! Streaming CSV parser building grouping and command records

use std::collections::HashSet;

use csv::ReaderBuilder;
use serde::Serialize;

use super::classify::{classify, is_banner, RowClass, SkipReason};

/// A grouping node discovered in the CSV
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub name: String,
    /// The caller-supplied root every CSV node is filed under
    pub parent_hint: Option<String>,
}

/// A command discovered in the CSV
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    pub command: String,
    pub description: Option<String>,
    pub example: Option<String>,
    /// Heading the command appeared under, if any
    pub grouping_hint: Option<String>,
}

/// A row that could not be read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    /// 1-based row number
    pub row: usize,
    pub message: String,
}

/// Parser output
#[derive(Debug, Clone, Default)]
pub struct ParsedImport {
    /// Distinct nodes in first-seen order
    pub nodes: Vec<NodeRecord>,
    /// Commands in file order, duplicates included
    pub commands: Vec<CommandRecord>,
    pub warnings: Vec<ParseWarning>,
    pub rows_read: usize,
}

/// Accumulates records while rows are fed in
struct TreeBuilder<'a> {
    root_hint: Option<&'a str>,
    current_grouping: Option<String>,
    seen_nodes: HashSet<(String, Option<String>)>,
    seen_content: bool,
    out: ParsedImport,
}

impl<'a> TreeBuilder<'a> {
    fn new(root_hint: Option<&'a str>) -> Self {
        Self {
            root_hint,
            current_grouping: None,
            seen_nodes: HashSet::new(),
            seen_content: false,
            out: ParsedImport::default(),
        }
    }

    fn push_row<S: AsRef<str>>(&mut self, row_num: usize, row: &[S]) {
        self.out.rows_read += 1;

        let class = classify(row);
        if class == RowClass::Skip(SkipReason::Blank) {
            return;
        }

        // Only the first non-blank row may be the warning banner
        let first = !self.seen_content;
        self.seen_content = true;
        if first && is_banner(row) {
            tracing::debug!(row = row_num, "skipping warning banner");
            return;
        }

        match class {
            RowClass::Grouping { name } => self.push_grouping(name),
            RowClass::Command {
                command,
                description,
                example,
            } => self.out.commands.push(CommandRecord {
                command,
                description,
                example,
                grouping_hint: self.current_grouping.clone(),
            }),
            RowClass::Skip(reason) => {
                tracing::debug!(row = row_num, ?reason, "skipping row");
            }
        }
    }

    fn push_grouping(&mut self, name: String) {
        if name.is_empty() {
            return;
        }
        self.current_grouping = Some(name.clone());

        let parent_hint = self.root_hint.map(str::to_string);
        if self.seen_nodes.insert((name.clone(), parent_hint.clone())) {
            self.out.nodes.push(NodeRecord { name, parent_hint });
        }
    }

    fn warn(&mut self, row_num: usize, message: String) {
        tracing::warn!(row = row_num, "{}", message);
        self.out.warnings.push(ParseWarning {
            row: row_num,
            message,
        });
    }

    fn finish(self) -> ParsedImport {
        self.out
    }
}

/// Build records from already-split rows
pub fn parse_rows<S: AsRef<str>>(rows: &[Vec<S>], root_hint: Option<&str>) -> ParsedImport {
    let mut builder = TreeBuilder::new(root_hint);
    for (idx, row) in rows.iter().enumerate() {
        builder.push_row(idx + 1, row.as_slice());
    }
    builder.finish()
}

/// Read CSV text and build records
///
/// Records the CSV reader cannot decode become warnings; parsing continues
/// with the next record.
pub fn parse_csv(text: &str, root_hint: Option<&str>) -> ParsedImport {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut builder = TreeBuilder::new(root_hint);
    let mut record = csv::StringRecord::new();
    let mut row_num = 0;

    loop {
        row_num += 1;
        match rdr.read_record(&mut record) {
            Ok(true) => {
                let row_num = record
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(row_num);
                let cells: Vec<&str> = record.iter().collect();
                builder.push_row(row_num, cells.as_slice());
            }
            Ok(false) => break,
            Err(e) => {
                let line = e
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(row_num);
                builder.warn(line, format!("unreadable CSV record: {}", e));
                if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                    break;
                }
            }
        }
    }

    let parsed = builder.finish();
    tracing::info!(
        rows = parsed.rows_read,
        nodes = parsed.nodes.len(),
        commands = parsed.commands.len(),
        warnings = parsed.warnings.len(),
        "parsed CSV"
    );
    parsed
}
