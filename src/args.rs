use std::path::PathBuf;

use structopt::clap::AppSettings;
use structopt::StructOpt;

use crate::revision::target::Target;

#[derive(Debug, StructOpt)]
#[structopt(
name = "pricing-migrations",
version = env ! ("CARGO_PKG_VERSION"),
about = "Schema migrations for the pricing tables, with a revision ledger compatible with alembic_version.",
setting = AppSettings::ColoredHelp,
)]
pub struct Args {
    /// Activate verbose mode
    #[structopt(short = "v", long = "verbose")]
    pub verbose: bool,

    /// Activate quiet mode
    #[structopt(short = "q", long = "quiet")]
    pub quiet: bool,

    /// Path of the configuration file
    #[structopt(short = "c", long = "config", default_value = "config.toml", parse(from_os_str))]
    pub config: PathBuf,

    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Apply revisions up to the target
    Upgrade {
        /// Print the SQL instead of running it
        #[structopt(long = "sql")]
        sql: bool,

        /// Starting revision for --sql, defaults to the oldest known revision
        #[structopt(long = "from", requires = "sql")]
        from: Option<Target>,

        /// head, heads, +N, a revision id, prefix or branch label
        #[structopt(default_value = "head")]
        target: Target,
    },

    /// Revert revisions down to the target
    Downgrade {
        /// Print the SQL instead of running it
        #[structopt(long = "sql")]
        sql: bool,

        /// Starting revision for --sql
        #[structopt(long = "from", requires = "sql")]
        from: Option<Target>,

        /// base, -N, a revision id, prefix or branch label
        target: Target,
    },

    /// Write the target into the version table without running revisions
    Stamp { target: Target },

    /// Show the revisions recorded in the database
    Current,

    /// Show the head revisions
    Heads,

    /// List revisions, newest first
    History,
}
