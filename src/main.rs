use clap::Parser;
use miette::Result;
use pxo::cli::{Cli, Commands, GlobalOpts};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    init_tracing(&cli.global);
    let global = cli.global;

    match cli.command {
        Commands::Init(args) => pxo::cli::commands::init::run(args, &global),
        Commands::Vendor(cmd) => pxo::cli::commands::vendor::run(cmd, &global),
        Commands::Platform(cmd) => pxo::cli::commands::platform::run(cmd, &global),
        Commands::Node(cmd) => pxo::cli::commands::node::run(cmd, &global),
        Commands::Cmd(cmd) => pxo::cli::commands::cmd::run(cmd, &global),
        Commands::Import(args) => pxo::cli::commands::import::run(args, &global),
        Commands::History(args) => pxo::cli::commands::history::run(args, &global),
        Commands::Completions(args) => pxo::cli::commands::completions::run(args),
    }
}

/// Log to stderr; `-v` raises the level, `RUST_LOG` overrides it
fn init_tracing(global: &GlobalOpts) {
    if global.quiet {
        return;
    }

    let filter = match global.verbose {
        0 => "warn",
        1 => "warn,pxo=info",
        2 => "info,pxo=debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
