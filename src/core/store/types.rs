//! Store type definitions
//!
//! Rows as read back from the store, plus the input structs used to
//! create and filter them.

use chrono::{DateTime, Utc};
use serde::Serialize;

// =========================================================================
// Field limits
// =========================================================================

pub const NAME_MAX_LENGTH: usize = 122;
pub const COMMAND_MAX_LENGTH: usize = 255;
pub const DESCRIPTION_MAX_LENGTH: usize = 500;
pub const EXAMPLE_MAX_LENGTH: usize = 255;
pub const VERSION_MAX_LENGTH: usize = 20;

/// Platform assigned to imported commands that carry no platform column
pub const SENTINEL_PLATFORM: &str = "N/A";

// =========================================================================
// Rows
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vendor {
    pub id: i64,
    pub name: String,
    pub created_by: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Platform {
    pub id: i64,
    pub vendor_id: i64,
    pub name: String,
    pub created_by: String,
    pub created: DateTime<Utc>,
}

/// A category/tag in a vendor's hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupingNode {
    pub id: i64,
    pub vendor_id: i64,
    /// `None` for root nodes
    pub parent_id: Option<i64>,
    pub name: String,
    pub created_by: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl GroupingNode {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// How a command entered the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// Created one at a time
    Singular,
    /// Created by a CSV import
    Bulk,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Singular => "SINGULAR",
            Method::Bulk => "BULK",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SINGULAR" => Ok(Method::Singular),
            "BULK" => Ok(Method::Bulk),
            _ => Err(format!("Unknown method: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    pub id: i64,
    pub vendor_id: i64,
    pub command: String,
    pub description: Option<String>,
    pub example: Option<String>,
    pub version: Option<String>,
    pub platform_id: Option<i64>,
    pub node_id: Option<i64>,
    pub method: Method,
    pub created_by: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// A command joined with the display names of its relations
#[derive(Debug, Clone, Serialize)]
pub struct CommandView {
    #[serde(flatten)]
    pub command: Command,
    pub vendor: String,
    pub platform: Option<String>,
    pub node: Option<String>,
}

/// A committed CSV import
#[derive(Debug, Clone, Serialize)]
pub struct ImportRun {
    pub id: i64,
    pub vendor_id: i64,
    pub vendor: String,
    pub root_name: Option<String>,
    pub actor: String,
    pub file_name: Option<String>,
    pub sha256: String,
    pub encoding: String,
    pub override_existing: bool,
    pub commands_seen: usize,
    pub commands_created: usize,
    pub commands_updated: usize,
    pub commands_skipped: usize,
    pub nodes_seen: usize,
    pub nodes_created: usize,
    pub created: DateTime<Utc>,
}

// =========================================================================
// Inputs
// =========================================================================

/// Fields for a new command row
#[derive(Debug, Clone)]
pub struct NewCommand {
    pub vendor_id: i64,
    pub command: String,
    pub description: Option<String>,
    pub example: Option<String>,
    pub version: Option<String>,
    pub platform_id: Option<i64>,
    pub node_id: Option<i64>,
    pub method: Method,
}

/// Fields replaced when an import overrides an existing command
#[derive(Debug, Clone)]
pub struct CommandUpdate {
    pub description: Option<String>,
    pub example: Option<String>,
    pub platform_id: Option<i64>,
    pub node_id: Option<i64>,
}

/// Filter for command listings
///
/// Name filters match case-insensitively and exactly; `search` and
/// `version` match substrings.
#[derive(Debug, Default, Clone)]
pub struct CommandFilter {
    pub search: Option<String>,
    pub vendor: Option<String>,
    pub platform: Option<String>,
    pub node: Option<String>,
    pub version: Option<String>,
    pub method: Option<Method>,
    pub created_by: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Import bookkeeping written alongside the imported rows
#[derive(Debug, Clone)]
pub struct NewImportRun {
    pub vendor_id: i64,
    pub root_name: Option<String>,
    pub actor: String,
    pub file_name: Option<String>,
    pub sha256: String,
    pub encoding: String,
    pub override_existing: bool,
    pub commands_seen: usize,
    pub commands_created: usize,
    pub commands_updated: usize,
    pub commands_skipped: usize,
    pub nodes_seen: usize,
    pub nodes_created: usize,
}
