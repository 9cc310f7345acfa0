use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output logs as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Provide custom config file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Regenerate metadata documents for stale packages
    Dump {
        /// Regenerate the whole catalog regardless of staleness
        #[arg(required = false, short, long)]
        force: bool,

        /// Collect orphaned documents instead of dumping
        #[arg(required = false, short, long)]
        gc: bool,

        /// Restrict the run to specific packages (vendor/package)
        #[arg(required = false, short, long)]
        package: Option<Vec<String>>,
    },

    /// Query the change feed like a mirror would
    Changes {
        /// Cursor returned by a previous query
        #[arg(required = true, long)]
        since: i64,
    },
}
