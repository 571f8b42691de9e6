//! `pxo import` command - Import commands from a CSV export

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::{escape_csv, escape_tsv, print_structured};
use crate::cli::{GlobalOpts, OutputFormat, Session};
use crate::import::{csv_template, import_csv, ImportReport, ImportRequest, RootRef, SkipOutcome};

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// CSV file to import
    #[arg(required_unless_present = "template")]
    pub file: Option<PathBuf>,

    /// Vendor id or name (must exist)
    #[arg(long, required_unless_present = "template")]
    pub vendor: Option<String>,

    /// Root grouping name; created if missing
    #[arg(long, conflicts_with = "root_id")]
    pub root: Option<String>,

    /// Existing root grouping node id
    #[arg(long)]
    pub root_id: Option<i64>,

    /// Overwrite commands that already exist for the vendor
    #[arg(long = "override")]
    pub override_existing: bool,

    /// Run the import and roll it back
    #[arg(long)]
    pub dry_run: bool,

    /// Print a CSV template and exit
    #[arg(long, conflicts_with_all = ["file", "vendor"])]
    pub template: bool,
}

pub fn run(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    if args.template {
        print!("{}", csv_template());
        eprintln!();
        eprintln!(
            "{} Template generated. Redirect to file: pxo import --template > commands.csv",
            style("→").blue()
        );
        return Ok(());
    }

    let file = args
        .file
        .clone()
        .ok_or_else(|| miette::miette!("CSV file required. Usage: pxo import FILE --vendor NAME"))?;
    let vendor = args
        .vendor
        .clone()
        .ok_or_else(|| miette::miette!("--vendor is required"))?;

    if !file.exists() {
        return Err(miette::miette!("File not found: {}", file.display()));
    }
    let bytes = std::fs::read(&file).into_diagnostic()?;

    let mut session = Session::open(global)?;

    let root = match (args.root.clone(), args.root_id) {
        (Some(name), _) => Some(RootRef::Name(name)),
        (None, Some(id)) => Some(RootRef::Id(id)),
        (None, None) => None,
    };

    let show_progress = !global.quiet && session.format == OutputFormat::Auto;
    if show_progress {
        println!(
            "{} Importing {} for {}{}",
            style("→").blue(),
            style(file.display()).yellow(),
            style(&vendor).cyan(),
            if args.dry_run {
                style(" (dry run)").dim().to_string()
            } else {
                String::new()
            }
        );
        println!();
    }

    let request = ImportRequest {
        bytes: &bytes,
        file_name: file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned()),
        vendor,
        root,
        actor: &session.actor,
        override_existing: args.override_existing,
        dry_run: args.dry_run,
    };
    let report = import_csv(&mut session.store, &request)?;

    if print_structured(&report, session.format)? {
        return Ok(());
    }

    match session.format {
        OutputFormat::Tsv => print_items(&report, "\t", escape_tsv),
        OutputFormat::Csv => print_items(&report, ",", escape_csv),
        _ => {
            if !global.quiet {
                print_summary(&report, global.verbose > 0);
            }
        }
    }
    Ok(())
}

/// One line per reported item
fn print_items(report: &ImportReport, sep: &str, escape: fn(&str) -> String) {
    println!("{}", ["outcome", "name", "node", "reason"].join(sep));
    let line = |cells: [&str; 4]| {
        let cells: Vec<String> = cells.iter().map(|c| escape(c)).collect();
        println!("{}", cells.join(sep));
    };

    for n in &report.created_nodes {
        line(["node_created", n.name.as_str(), n.parent.as_deref().unwrap_or(""), ""]);
    }
    for n in &report.failed_nodes {
        line(["node_failed", n.name.as_str(), "", n.reason.as_str()]);
    }
    for c in &report.created_commands {
        line(["created", c.command.as_str(), c.node.as_deref().unwrap_or(""), c.reason.as_str()]);
    }
    for c in &report.updated_commands {
        line(["updated", c.command.as_str(), c.node.as_deref().unwrap_or(""), c.reason.as_str()]);
    }
    for s in &report.skipped_commands {
        let outcome = match s.outcome {
            SkipOutcome::Duplicate => "duplicate",
            SkipOutcome::Failed => "failed",
        };
        line([outcome, s.command.as_str(), "", s.reason.as_str()]);
    }
}

fn print_summary(report: &ImportReport, itemized: bool) {
    if report.lossy_decode {
        println!(
            "{} File was not valid {}; undecodable bytes were replaced",
            style("!").yellow(),
            report.encoding.as_deref().unwrap_or("text")
        );
    }
    for w in &report.warnings {
        println!("{} Row {}: {}", style("!").yellow(), w.row, w.message);
    }
    for n in &report.failed_nodes {
        println!("{} Node {}: {}", style("✗").red(), style(&n.name).cyan(), n.reason);
    }
    for s in &report.skipped_commands {
        match s.outcome {
            SkipOutcome::Failed => {
                println!("{} {}: {}", style("✗").red(), style(&s.command).cyan(), s.reason)
            }
            SkipOutcome::Duplicate if itemized => {
                println!("{} {}: {}", style("-").dim(), s.command, style(&s.reason).dim())
            }
            SkipOutcome::Duplicate => {}
        }
    }
    if itemized {
        for n in &report.created_nodes {
            match n.parent {
                Some(ref parent) => println!("{} node {}/{}", style("+").green(), parent, n.name),
                None => println!("{} node {}", style("+").green(), n.name),
            }
        }
        for c in &report.created_commands {
            println!(
                "{} {} {}",
                style("+").green(),
                c.command,
                style(c.node.as_deref().unwrap_or("")).dim()
            );
        }
        for c in &report.updated_commands {
            println!(
                "{} {} {}",
                style("~").yellow(),
                c.command,
                style(c.node.as_deref().unwrap_or("")).dim()
            );
        }
    }

    println!();
    println!("{}", style("─".repeat(50)).dim());
    println!("{}", style("Import Summary").bold());
    println!("{}", style("─".repeat(50)).dim());
    if let Some(ref root) = report.root {
        println!("  Root:             {}", style(root).cyan());
    }
    println!("  Commands seen:    {}", style(report.commands.seen).cyan());
    println!("  Created:          {}", style(report.commands.created).green());
    if report.commands.updated > 0 {
        println!("  Updated:          {}", style(report.commands.updated).yellow());
    }
    if report.commands.skipped > 0 {
        let failed = report.failed_count();
        println!(
            "  Skipped:          {} ({} duplicate, {} failed)",
            style(report.commands.skipped).dim(),
            report.commands.skipped - failed,
            failed
        );
    }
    println!(
        "  Nodes:            {} seen, {} created",
        report.nodes.seen,
        style(report.nodes.created).green()
    );

    if report.is_noop() {
        println!();
        println!("{}", style("Nothing new to import.").dim());
    }
    if report.dry_run {
        println!();
        println!("{}", style("Dry run complete. Nothing was saved.").yellow());
    } else if let Some(id) = report.run_id {
        println!();
        println!(
            "{} Import #{} recorded. See {}",
            style("✓").green(),
            id,
            style("pxo history").yellow()
        );
    }
}
