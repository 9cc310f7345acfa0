use std::sync::Arc;

use clap::Parser;
use cli::{Args, Commands};
use logging::setup_logging;
use miette::IntoDiagnostic;
use tracing::{info, warn};
use wharf_config::Config;
use wharf_dump::{dump_loop, gc_run, run_dump, DumpContext, DumpOptions, Shutdown};
use wharf_events::{EventSinkHandle, NullSink};
use wharf_feed::FeedReader;
use wharf_store::Database;

mod cli;
mod logging;

const DEFAULT_CONFIG_PATH: &str = "/etc/wharf/config.toml";

async fn handle_cli() -> miette::Result<()> {
    let args = Args::parse();

    setup_logging(&args);

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;

    match args.command {
        Commands::Dump { force, gc, package } => {
            let events: EventSinkHandle = Arc::new(NullSink);
            let mut ctx = DumpContext::new(config, events)?;

            if gc {
                match gc_run(&mut ctx)? {
                    Some(removed) => info!("Garbage collection done, {removed} packages removed"),
                    None => info!("Garbage collection skipped, nothing to do"),
                }
                return Ok(());
            }

            let options = DumpOptions {
                force,
                packages: package,
            };

            // Forced or targeted runs are one-shot; the scheduled path is
            // the bounded long-running loop with signal-driven shutdown.
            if options.force || options.packages.is_some() {
                match run_dump(&mut ctx, &options)? {
                    Some(summary) => info!(
                        "Dump done: {} dumped, {} unchanged, {} failed",
                        summary.dumped, summary.unchanged, summary.failed
                    ),
                    None => info!("Dump skipped, nothing to do"),
                }
            } else {
                let shutdown = Shutdown::new();
                let signal = shutdown.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        warn!("Interrupt received, finishing the current pass");
                        signal.cancel();
                    }
                });

                match dump_loop(&mut ctx, &shutdown, &options).await? {
                    Some(outcome) => info!(
                        "Dump loop done after {} passes: {} dumped, {} unchanged, {} failed",
                        outcome.passes,
                        outcome.summary.dumped,
                        outcome.summary.unchanged,
                        outcome.summary.failed
                    ),
                    None => info!("Dump skipped, nothing to do"),
                }
            }
        }
        Commands::Changes { since } => {
            let mut db = Database::open(config.db_path())?;
            let response = db.with_conn(|conn| FeedReader::changes(conn, since))?;
            println!("{}", serde_json::to_string(&response).into_diagnostic()?);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli().await {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}
