use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "incidentdash")]
#[command(version, about = "Track, filter and export reported AI incidents")]
#[command(propagate_version = true)]
pub struct Cli {
    /// SQLite file holding the incident collection (overrides config and INCIDENTDASH_DB)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List incidents matching the given filters
    List(FilterArgs),

    /// Show a single incident by id
    Show { id: i64 },

    /// Report a new incident
    Create {
        /// Incident title
        title: String,

        /// What happened
        #[arg(long, short = 'd')]
        description: String,

        /// Low, Medium or High
        #[arg(long, short = 's', default_value = "Low")]
        severity: String,
    },

    /// Edit an existing incident; omitted fields keep their value
    Update {
        id: i64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, short = 'd')]
        description: Option<String>,

        #[arg(long, short = 's')]
        severity: Option<String>,
    },

    /// Delete an incident
    Delete { id: i64 },

    /// Delete several incidents at once
    #[command(name = "bulk-delete")]
    BulkDelete {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<i64>,
    },

    /// Totals, severity distribution and the trailing-week timeline
    Stats,

    /// Text analysis of the current collection
    Summary,

    /// Write the filtered list as CSV
    Export {
        #[command(flatten)]
        filters: FilterArgs,

        /// Directory receiving incidents_YYYY-MM-DD.csv
        #[arg(long, short = 'o', default_value = ".")]
        out: PathBuf,
    },

    /// Load the demo incidents
    Seed {
        /// Replace a non-empty collection
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Case-insensitive substring of title or description
    #[arg(long, short = 'q')]
    pub search: Option<String>,

    /// Severity to include (can be specified multiple times)
    #[arg(long = "severity", short = 's')]
    pub severities: Vec<String>,

    /// First local calendar day to include (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// Last local calendar day to include (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,

    /// newest or oldest
    #[arg(long, default_value = "newest")]
    pub sort: String,
}
