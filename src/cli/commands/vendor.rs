//! `pxo vendor` command - Vendor management

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{confirm, print_list, print_structured};
use crate::cli::{GlobalOpts, Session};
use crate::core::store::vendors;

#[derive(Subcommand, Debug)]
pub enum VendorCommands {
    /// Add a vendor
    Add(AddArgs),

    /// List vendors
    List(ListArgs),

    /// Delete a vendor with all its nodes, platforms and commands
    Rm(RmArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Vendor name (unique, case-insensitive)
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only vendors created by the acting user
    #[arg(long)]
    pub mine: bool,
}

#[derive(clap::Args, Debug)]
pub struct RmArgs {
    /// Vendor id or name
    pub vendor: String,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run(cmd: VendorCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        VendorCommands::Add(args) => run_add(args, global),
        VendorCommands::List(args) => run_list(args, global),
        VendorCommands::Rm(args) => run_rm(args, global),
    }
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let vendor = vendors::create(session.store.conn(), &args.name, &session.actor)?;

    if print_structured(&vendor, session.format)? {
        return Ok(());
    }
    if !global.quiet {
        println!(
            "{} Created vendor {} (id {})",
            style("✓").green(),
            style(&vendor.name).cyan(),
            vendor.id
        );
    }
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let mine = args.mine.then_some(session.actor.username.as_str());
    let list = vendors::list(session.store.conn(), mine)?;

    if list.is_empty() && !session.format.is_structured() {
        if !global.quiet {
            println!("No vendors found.");
        }
        return Ok(());
    }

    let rows = list
        .iter()
        .map(|v| {
            vec![
                v.id.to_string(),
                v.name.clone(),
                v.created_by.clone(),
                v.created.format("%Y-%m-%d").to_string(),
            ]
        })
        .collect();
    print_list(session.format, &list, &["ID", "NAME", "CREATED BY", "CREATED"], rows)
}

fn run_rm(args: RmArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let conn = session.store.conn();
    let vendor = vendors::resolve(conn, &args.vendor)?;

    let prompt = format!(
        "Delete vendor '{}' and everything filed under it?",
        vendor.name
    );
    if !confirm(&prompt, args.yes)? {
        println!("Aborted.");
        return Ok(());
    }

    let deleted = vendors::delete(conn, vendor.id, &session.actor)?;
    if !global.quiet {
        println!(
            "{} Deleted vendor {}",
            style("✓").green(),
            style(&deleted.name).cyan()
        );
    }
    Ok(())
}
