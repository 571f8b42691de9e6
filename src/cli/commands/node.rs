//! `pxo node` command - Grouping node (category/tag) management

use clap::Subcommand;
use console::style;
use miette::Result;
use serde::Serialize;

use crate::cli::helpers::{
    confirm, escape_csv, escape_tsv, or_dash, print_list, print_structured,
};
use crate::cli::{GlobalOpts, OutputFormat, Session};
use crate::core::store::{nodes, vendors, GroupingNode};

#[derive(Subcommand, Debug)]
pub enum NodeCommands {
    /// Add a grouping node
    Add(AddArgs),

    /// List grouping nodes
    List(ListArgs),

    /// Show a vendor's hierarchy
    Tree(TreeArgs),

    /// Delete a node with its subtree and the commands filed under it
    Rm(RmArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Node name
    pub name: String,

    /// Vendor id or name
    #[arg(long)]
    pub vendor: String,

    /// Parent node id (default: a root node)
    #[arg(long)]
    pub parent: Option<i64>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Restrict to a vendor (id or name)
    #[arg(long)]
    pub vendor: Option<String>,

    /// Only nodes created by the acting user
    #[arg(long)]
    pub mine: bool,
}

#[derive(clap::Args, Debug)]
pub struct TreeArgs {
    /// Vendor id or name
    #[arg(long)]
    pub vendor: String,
}

#[derive(clap::Args, Debug)]
pub struct RmArgs {
    /// Node id
    pub id: i64,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Serialize)]
struct NodeRow {
    #[serde(flatten)]
    node: GroupingNode,
    path: String,
}

pub fn run(cmd: NodeCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        NodeCommands::Add(args) => run_add(args, global),
        NodeCommands::List(args) => run_list(args, global),
        NodeCommands::Tree(args) => run_tree(args, global),
        NodeCommands::Rm(args) => run_rm(args, global),
    }
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let conn = session.store.conn();
    let vendor = vendors::resolve(conn, &args.vendor)?;
    let node = nodes::create(conn, vendor.id, args.parent, &args.name, &session.actor)?;

    if print_structured(&node, session.format)? {
        return Ok(());
    }
    if !global.quiet {
        println!(
            "{} Created node {} (id {})",
            style("✓").green(),
            style(nodes::path(conn, node.id)?).cyan(),
            node.id
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

    let mut list = Vec::new();
    for node in nodes::list(conn, vendor_id, mine)? {
        let path = nodes::path(conn, node.id)?;
        list.push(NodeRow { node, path });
    }

    if list.is_empty() && !session.format.is_structured() {
        if !global.quiet {
            println!("No nodes found.");
        }
        return Ok(());
    }

    let rows = list
        .iter()
        .map(|row| {
            vec![
                row.node.id.to_string(),
                row.path.clone(),
                or_dash(row.node.parent_id.map(|p| p.to_string()).as_deref()),
                row.node.created_by.clone(),
            ]
        })
        .collect();
    print_list(session.format, &list, &["ID", "PATH", "PARENT", "CREATED BY"], rows)
}

fn run_tree(args: TreeArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let conn = session.store.conn();
    let vendor = vendors::resolve(conn, &args.vendor)?;
    let tree = nodes::tree(conn, vendor.id)?;

    if print_structured(&tree.entries(), session.format)? {
        return Ok(());
    }

    match session.format {
        OutputFormat::Tsv | OutputFormat::Csv => {
            let sep = if session.format == OutputFormat::Tsv { "\t" } else { "," };
            println!("{}", ["id", "depth", "name"].join(sep));
            tree.walk(|depth, node| {
                let name = if sep == "," {
                    escape_csv(&node.name)
                } else {
                    escape_tsv(&node.name)
                };
                println!("{}{sep}{}{sep}{}", node.id, depth, name, sep = sep);
            });
        }
        _ => {
            if tree.is_empty() {
                println!("No nodes for {}.", style(&vendor.name).cyan());
                return Ok(());
            }
            println!("{}", style(&vendor.name).bold());
            tree.walk(|depth, node| {
                println!(
                    "{}└─ {} {}",
                    "   ".repeat(depth),
                    node.name,
                    style(format!("#{}", node.id)).dim()
                );
            });
            println!();
            println!("{} node(s)", style(tree.len()).cyan());
        }
    }
    Ok(())
}

fn run_rm(args: RmArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let conn = session.store.conn();
    let node = nodes::get(conn, args.id)?;
    let path = nodes::path(conn, node.id)?;

    let prompt = format!("Delete node '{}', its subtree and its commands?", path);
    if !confirm(&prompt, args.yes)? {
        println!("Aborted.");
        return Ok(());
    }

    nodes::delete(conn, node.id, &session.actor)?;
    if !global.quiet {
        println!("{} Deleted node {}", style("✓").green(), style(&path).cyan());
    }
    Ok(())
}
