//! CSV import of vendor command taxonomies
//!
//! Pipeline: [`decode`] the upload, [`parser::parse_csv`] it into node and
//! command records (rows are classified by [`classify`], cells cleaned by
//! [`normalize`]), then apply the records with a [`reconcile::Reconciler`].
//! [`import_csv`] runs the whole pipeline after validating the request.

pub mod classify;
pub mod decode;
pub mod normalize;
pub mod parser;
pub mod reconcile;
pub mod report;

pub use decode::{decode, Decoded};
pub use parser::{parse_csv, parse_rows, CommandRecord, NodeRecord, ParseWarning, ParsedImport};
pub use reconcile::{Reconciler, RootSelector, UploadInfo};
pub use report::{ImportReport, SkipOutcome};

use miette::Diagnostic;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::actor::Actor;
use crate::core::store::{nodes, vendors, Store, StoreError};

/// Errors that reject or abort an import
///
/// Per-row problems never surface here; they are part of the report.
#[derive(Debug, Error, Diagnostic)]
pub enum ImportError {
    #[error("uploaded file is empty")]
    #[diagnostic(code(pxo::import::empty), help("export the sheet as CSV and try again"))]
    EmptyUpload,

    #[error("vendor not found: {0}")]
    #[diagnostic(
        code(pxo::import::vendor),
        help("create it first with `pxo vendor add`")
    )]
    VendorNotFound(String),

    #[error("root node not found: {0}")]
    #[diagnostic(code(pxo::import::root))]
    RootNotFound(i64),

    #[error("root node '{root}' does not belong to vendor '{vendor}'")]
    #[diagnostic(
        code(pxo::import::root_vendor),
        help("pick a root node of the same vendor, or pass --root <name> to create one")
    )]
    RootVendorMismatch { root: String, vendor: String },

    #[error("invalid root name '{name}': {message}")]
    #[diagnostic(code(pxo::import::root_name))]
    InvalidRoot { name: String, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

impl From<rusqlite::Error> for ImportError {
    fn from(e: rusqlite::Error) -> Self {
        ImportError::Store(e.into())
    }
}

impl ImportError {
    /// True for errors caused by the request rather than the system
    pub fn is_input_error(&self) -> bool {
        !matches!(self, ImportError::Store(_))
    }
}

/// Root grouping for an import
#[derive(Debug, Clone)]
pub enum RootRef {
    /// Get-or-create a root node with this name
    Name(String),
    /// Use an existing node by id
    Id(i64),
}

/// Everything needed to run one import
#[derive(Debug, Clone)]
pub struct ImportRequest<'a> {
    pub bytes: &'a [u8],
    pub file_name: Option<String>,
    /// Vendor id or name
    pub vendor: String,
    pub root: Option<RootRef>,
    pub actor: &'a Actor,
    pub override_existing: bool,
    pub dry_run: bool,
}

/// Validate, decode, parse and reconcile an upload
pub fn import_csv(store: &mut Store, req: &ImportRequest<'_>) -> Result<ImportReport, ImportError> {
    let vendor = match vendors::resolve(store.conn(), &req.vendor) {
        Ok(v) => v,
        Err(StoreError::NotFound { .. }) => {
            return Err(ImportError::VendorNotFound(req.vendor.clone()))
        }
        Err(e) => return Err(e.into()),
    };

    let root = match &req.root {
        None => None,
        Some(RootRef::Name(name)) => Some(RootSelector::Name(name.trim().to_string())),
        Some(RootRef::Id(id)) => {
            let node = match nodes::get(store.conn(), *id) {
                Ok(n) => n,
                Err(StoreError::NotFound { .. }) => return Err(ImportError::RootNotFound(*id)),
                Err(e) => return Err(e.into()),
            };
            if node.vendor_id != vendor.id {
                return Err(ImportError::RootVendorMismatch {
                    root: node.name,
                    vendor: vendor.name,
                });
            }
            Some(RootSelector::Existing(node))
        }
    };

    let decoded = decode(req.bytes)?;
    let sha256 = format!("{:x}", Sha256::digest(req.bytes));

    let root_hint = root.as_ref().map(|r| match r {
        RootSelector::Name(name) => name.clone(),
        RootSelector::Existing(node) => node.name.clone(),
    });
    let parsed = parse_csv(&decoded.text, root_hint.as_deref());

    let upload = UploadInfo {
        file_name: req.file_name.clone(),
        sha256,
        encoding: decoded.encoding.to_string(),
        lossy: decoded.lossy,
    };
    let reconciler = Reconciler::new(store, vendor, root, req.actor, req.override_existing)
        .with_upload(upload);

    if req.dry_run {
        reconciler.preview(&parsed)
    } else {
        reconciler.reconcile(&parsed)
    }
}

/// Blank upload template
pub fn csv_template() -> String {
    [
        "WARNING!! Keep the column order. Heading rows have text in the first column only.,,,",
        "Command,Description,Example,Category",
        "System,,,",
        "show version,,Display the running software version,show version",
        "",
    ]
    .join("\n")
}
