//! `pxo history` command - List committed imports

use miette::Result;

use crate::cli::helpers::{or_dash, print_list};
use crate::cli::{GlobalOpts, OutputFormat, Session};
use crate::core::store::{history, vendors};

#[derive(clap::Args, Debug)]
pub struct HistoryArgs {
    /// Restrict to a vendor (id or name)
    #[arg(long)]
    pub vendor: Option<String>,

    /// Show at most this many imports
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

pub fn run(args: HistoryArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let conn = session.store.conn();

    let vendor_id = match args.vendor {
        Some(ref key) => Some(vendors::resolve(conn, key)?.id),
        None => None,
    };
    let mut runs = history::list(conn, vendor_id)?;
    if let Some(limit) = args.limit {
        runs.truncate(limit);
    }

    if runs.is_empty() && !session.format.is_structured() {
        if !global.quiet {
            println!("No imports recorded.");
        }
        return Ok(());
    }

    let rows = runs
        .iter()
        .map(|r| {
            let digest = if session.format == OutputFormat::Auto {
                r.sha256.chars().take(12).collect()
            } else {
                r.sha256.clone()
            };
            vec![
                r.id.to_string(),
                r.created.format("%Y-%m-%d %H:%M").to_string(),
                r.vendor.clone(),
                or_dash(r.root_name.as_deref()),
                or_dash(r.file_name.as_deref()),
                r.actor.clone(),
                format!(
                    "{}/{}/{}",
                    r.commands_created, r.commands_updated, r.commands_skipped
                ),
                r.nodes_created.to_string(),
                if r.override_existing { "yes" } else { "no" }.to_string(),
                digest,
            ]
        })
        .collect();

    print_list(
        session.format,
        &runs,
        &[
            "ID",
            "WHEN",
            "VENDOR",
            "ROOT",
            "FILE",
            "BY",
            "CREATED/UPDATED/SKIPPED",
            "NODES",
            "OVERRIDE",
            "SHA256",
        ],
        rows,
    )
}
