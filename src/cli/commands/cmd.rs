//! `pxo cmd` command - Command management

use clap::{Subcommand, ValueEnum};
use console::style;
use miette::Result;
use serde::Serialize;

use crate::cli::helpers::{
    confirm, escape_csv, escape_tsv, or_dash, print_list, print_structured, truncate_str,
};
use crate::cli::{GlobalOpts, OutputFormat, Session};
use crate::core::store::{
    commands, platforms, vendors, CommandFilter, CommandView, Method, NewCommand, StoreError,
};

#[derive(Subcommand, Debug)]
pub enum CmdCommands {
    /// Add a command by hand
    Add(AddArgs),

    /// List commands with filters and pagination
    List(ListArgs),

    /// Show one command
    Show(ShowArgs),

    /// Delete a command
    Rm(RmArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Command text, e.g. "show ip route"
    pub command: String,

    /// Vendor id or name
    #[arg(long)]
    pub vendor: String,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Usage example
    #[arg(long, short = 'e')]
    pub example: Option<String>,

    /// Software version, e.g. 15.2(3)T
    #[arg(long)]
    pub version: Option<String>,

    /// Platform name (must exist for the vendor)
    #[arg(long)]
    pub platform: Option<String>,

    /// Grouping node id
    #[arg(long)]
    pub node: Option<i64>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum MethodFilter {
    Singular,
    Bulk,
}

impl From<MethodFilter> for Method {
    fn from(m: MethodFilter) -> Self {
        match m {
            MethodFilter::Singular => Method::Singular,
            MethodFilter::Bulk => Method::Bulk,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Substring of the command text (case-insensitive)
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Vendor name (case-insensitive, exact)
    #[arg(long)]
    pub vendor: Option<String>,

    /// Platform name (case-insensitive, exact)
    #[arg(long)]
    pub platform: Option<String>,

    /// Grouping node name (case-insensitive, exact)
    #[arg(long)]
    pub node: Option<String>,

    /// Substring of the version
    #[arg(long)]
    pub version: Option<String>,

    /// How the command was created
    #[arg(long, value_enum)]
    pub method: Option<MethodFilter>,

    /// Only commands created by the acting user
    #[arg(long)]
    pub mine: bool,

    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Rows per page (max 100)
    #[arg(long, visible_alias = "limit")]
    pub page_size: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Command id
    pub id: i64,
}

#[derive(clap::Args, Debug)]
pub struct RmArgs {
    /// Command id
    pub id: i64,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// One page of a listing
#[derive(Serialize)]
struct Page<'a> {
    count: usize,
    page: usize,
    page_size: usize,
    results: &'a [CommandView],
}

pub fn run(cmd: CmdCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CmdCommands::Add(args) => run_add(args, global),
        CmdCommands::List(args) => run_list(args, global),
        CmdCommands::Show(args) => run_show(args, global),
        CmdCommands::Rm(args) => run_rm(args, global),
    }
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let conn = session.store.conn();
    let vendor = vendors::resolve(conn, &args.vendor)?;

    let platform_id = match args.platform {
        Some(ref name) => Some(
            platforms::find(conn, vendor.id, name)?
                .ok_or_else(|| StoreError::not_found("platform", name))?
                .id,
        ),
        None => None,
    };

    let command = commands::insert(
        conn,
        &NewCommand {
            vendor_id: vendor.id,
            command: args.command,
            description: args.description,
            example: args.example,
            version: args.version,
            platform_id,
            node_id: args.node,
            method: Method::Singular,
        },
        &session.actor,
    )?;

    let view = commands::view(conn, command.id)?;
    if print_structured(&view, session.format)? {
        return Ok(());
    }
    if !global.quiet {
        println!(
            "{} Created command {} for {} (id {})",
            style("✓").green(),
            style(&command.command).cyan(),
            style(&vendor.name).cyan(),
            command.id
        );
    }
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let conn = session.store.conn();

    let page = args.page.max(1);
    let page_size = session.config.page_size(args.page_size);

    let filter = CommandFilter {
        search: args.search,
        vendor: args.vendor,
        platform: args.platform,
        node: args.node,
        version: args.version,
        method: args.method.map(Method::from),
        created_by: args.mine.then(|| session.actor.username.clone()),
        limit: Some(page_size),
        offset: Some((page - 1) * page_size),
    };

    let total = commands::count(conn, &filter)?;
    let list = commands::list(conn, &filter)?;

    if session.format.is_structured() {
        let body = Page {
            count: total,
            page,
            page_size,
            results: &list,
        };
        print_structured(&body, session.format)?;
        return Ok(());
    }

    if list.is_empty() && session.format == OutputFormat::Auto {
        if !global.quiet {
            println!("No commands found.");
        }
        return Ok(());
    }

    let rows = list
        .iter()
        .map(|v| {
            vec![
                v.command.id.to_string(),
                v.vendor.clone(),
                match session.format {
                    OutputFormat::Auto => truncate_str(&v.command.command, 40),
                    _ => v.command.command.clone(),
                },
                or_dash(v.node.as_deref()),
                or_dash(v.platform.as_deref()),
                or_dash(v.command.version.as_deref()),
                v.command.method.to_string(),
            ]
        })
        .collect();
    print_list(
        session.format,
        &list,
        &["ID", "VENDOR", "COMMAND", "NODE", "PLATFORM", "VERSION", "METHOD"],
        rows,
    )?;

    if session.format == OutputFormat::Auto && !global.quiet {
        let pages = total.div_ceil(page_size).max(1);
        println!(
            "Page {} of {} ({} command(s))",
            style(page).cyan(),
            pages,
            style(total).cyan()
        );
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let view = commands::view(session.store.conn(), args.id)?;

    if print_structured(&view, session.format)? {
        return Ok(());
    }

    let c = &view.command;
    let fields = [
        ("id", c.id.to_string()),
        ("command", c.command.clone()),
        ("vendor", view.vendor.clone()),
        ("node", or_dash(view.node.as_deref())),
        ("platform", or_dash(view.platform.as_deref())),
        ("version", or_dash(c.version.as_deref())),
        ("description", or_dash(c.description.as_deref())),
        ("example", or_dash(c.example.as_deref())),
        ("method", c.method.to_string()),
        ("created_by", c.created_by.clone()),
        ("created", c.created.to_rfc3339()),
        ("updated", c.updated.to_rfc3339()),
    ];

    match session.format {
        OutputFormat::Tsv => {
            for (k, v) in fields {
                println!("{}\t{}", k, escape_tsv(&v));
            }
        }
        OutputFormat::Csv => {
            for (k, v) in fields {
                println!("{},{}", k, escape_csv(&v));
            }
        }
        _ => {
            for (k, v) in fields {
                println!("{:<12} {}", style(k).bold(), v);
            }
        }
    }
    Ok(())
}

fn run_rm(args: RmArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let conn = session.store.conn();
    let command = commands::get(conn, args.id)?;

    if !confirm(&format!("Delete command '{}'?", command.command), args.yes)? {
        println!("Aborted.");
        return Ok(());
    }

    commands::delete(conn, command.id, &session.actor)?;
    if !global.quiet {
        println!(
            "{} Deleted command {}",
            style("✓").green(),
            style(&command.command).cyan()
        );
    }
    Ok(())
}
