//! `pxo platform` command - Platform (OS) management

use clap::Subcommand;
use console::style;
use miette::Result;
use serde::Serialize;

use crate::cli::helpers::{confirm, print_list, print_structured};
use crate::cli::{GlobalOpts, Session};
use crate::core::store::{platforms, vendors, Platform};

#[derive(Subcommand, Debug)]
pub enum PlatformCommands {
    /// Add a platform to a vendor
    Add(AddArgs),

    /// List platforms
    List(ListArgs),

    /// Delete a platform (its commands keep no platform)
    Rm(RmArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Platform name, e.g. "IOS-XE"
    pub name: String,

    /// Vendor id or name
    #[arg(long)]
    pub vendor: String,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Restrict to a vendor (id or name)
    #[arg(long)]
    pub vendor: Option<String>,

    /// Only platforms created by the acting user
    #[arg(long)]
    pub mine: bool,
}

#[derive(clap::Args, Debug)]
pub struct RmArgs {
    /// Platform id
    pub id: i64,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// A platform with its vendor's name
#[derive(Serialize)]
struct PlatformRow {
    #[serde(flatten)]
    platform: Platform,
    vendor: String,
}

pub fn run(cmd: PlatformCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        PlatformCommands::Add(args) => run_add(args, global),
        PlatformCommands::List(args) => run_list(args, global),
        PlatformCommands::Rm(args) => run_rm(args, global),
    }
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let conn = session.store.conn();
    let vendor = vendors::resolve(conn, &args.vendor)?;
    let platform = platforms::create(conn, vendor.id, &args.name, &session.actor)?;

    if print_structured(&platform, session.format)? {
        return Ok(());
    }
    if !global.quiet {
        println!(
            "{} Created platform {} for {} (id {})",
            style("✓").green(),
            style(&platform.name).cyan(),
            style(&vendor.name).cyan(),
            platform.id
        );
    }
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let conn = session.store.conn();

    let vendor_id = match args.vendor {
        Some(ref key) => Some(vendors::resolve(conn, key)?.id),
        None => None,
    };
    let mine = args.mine.then_some(session.actor.username.as_str());

    let vendor_names: std::collections::HashMap<i64, String> = vendors::list(conn, None)?
        .into_iter()
        .map(|v| (v.id, v.name))
        .collect();
    let list: Vec<PlatformRow> = platforms::list(conn, vendor_id, mine)?
        .into_iter()
        .map(|platform| PlatformRow {
            vendor: vendor_names
                .get(&platform.vendor_id)
                .cloned()
                .unwrap_or_default(),
            platform,
        })
        .collect();

    if list.is_empty() && !session.format.is_structured() {
        if !global.quiet {
            println!("No platforms found.");
        }
        return Ok(());
    }

    let rows = list
        .iter()
        .map(|row| {
            vec![
                row.platform.id.to_string(),
                row.vendor.clone(),
                row.platform.name.clone(),
                row.platform.created_by.clone(),
            ]
        })
        .collect();
    print_list(session.format, &list, &["ID", "VENDOR", "NAME", "CREATED BY"], rows)
}

fn run_rm(args: RmArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let conn = session.store.conn();
    let platform = platforms::get(conn, args.id)?;

    if !confirm(&format!("Delete platform '{}'?", platform.name), args.yes)? {
        println!("Aborted.");
        return Ok(());
    }

    platforms::delete(conn, platform.id, &session.actor)?;
    if !global.quiet {
        println!(
            "{} Deleted platform {}",
            style("✓").green(),
            style(&platform.name).cyan()
        );
    }
    Ok(())
}
