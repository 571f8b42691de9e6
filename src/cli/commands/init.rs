//! `pxo init` command - Initialize a new workspace

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::GlobalOpts;
use crate::core::{Config, Store, Workspace, WorkspaceError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Rewrite the config even if .pxo/ already exists (the store is kept)
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        if !global.quiet {
            println!(
                "{} Created directory {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
    }

    let workspace = if args.force {
        Workspace::init_force(&path)
    } else {
        Workspace::init(&path)
    };

    match workspace {
        Ok(workspace) => {
            let config = Config::load(Some(&workspace));
            let db_path = config.database_path(&workspace);
            Store::open(&db_path)?;

            if !global.quiet {
                println!(
                    "{} Initialized pxo workspace at {}",
                    style("✓").green(),
                    style(workspace.root().display()).cyan()
                );
                println!("  store:  {}", style(db_path.display()).dim());
                println!("  config: {}", style(workspace.config_path().display()).dim());
                println!();
                println!("Next steps:");
                println!("  {} Add a vendor", style("pxo vendor add Cisco").yellow());
                println!(
                    "  {} Import its commands",
                    style("pxo import export.csv --vendor Cisco --root Main").yellow()
                );
            }
            Ok(())
        }
        Err(WorkspaceError::AlreadyExists(path)) => {
            println!(
                "{} pxo workspace already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!("Use {} to reinitialize", style("pxo init --force").yellow());
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}
