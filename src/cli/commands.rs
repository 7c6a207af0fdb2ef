use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `strata` - offline, version-stepped schema and data migration.
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(version)]
#[command(about = "Migrate the strata store to the current schema version.", long_about = None)]
pub struct Cli {
    /// Configuration file (default: <working-path>/strata.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the live database (default: ~/.strata, env: STRATA_WORKING_PATH)
    #[arg(long, global = true)]
    pub working_path: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Migrate the stored database to the current schema version
    Migrate {
        /// Stored version to start from (detected when omitted)
        #[arg(long)]
        from: Option<u32>,
    },

    /// Prepare the database for startup: create, migrate or leave it as is
    Init,

    /// Show the stored version, the supported range and the database paths
    Status,

    /// Print the schema effective at a version as JSON
    Schema {
        /// Schema version (default: current)
        version: Option<u32>,

        /// Only print this table
        #[arg(long)]
        table: Option<String>,

        /// Compare the registry against the authoritative current schema
        #[arg(long)]
        check: bool,
    },
}
