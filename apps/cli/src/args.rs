use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pulse_app::{FetchParams, QueryParams};
use pulse_core::DayOfWeekMetric;

/// repo-pulse: GitHub commit history ingestion and statistics
#[derive(Parser, Debug)]
#[command(name = "repo-pulse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML config file (created with defaults if missing)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Repository owner (defaults to the configured repository)
    #[arg(long)]
    pub owner: Option<String>,

    /// Repository name (defaults to the configured repository)
    #[arg(long)]
    pub name: Option<String>,

    /// Window start, YYYY-MM-DD or RFC 3339 (default: 365 days ago)
    #[arg(long)]
    pub start: Option<String>,

    /// Window end, YYYY-MM-DD or RFC 3339 (default: yesterday)
    #[arg(long)]
    pub end: Option<String>,
}

impl ScopeArgs {
    pub fn query(&self) -> QueryParams {
        QueryParams {
            owner: self.owner.clone(),
            name: self.name.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ingest commit history for a window, then refresh its statistics
    Fetch {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Always hit the API even if a completed ingestion covers the window
        #[arg(long)]
        no_cache: bool,

        /// Include every stored commit of the window in the output
        #[arg(long)]
        with_commits: bool,
    },

    /// Recompute z-scores and word frequencies from stored commits
    Recompute {
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// List distinct commit authors
    Authors {
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// List commits whose z-score exceeds a threshold
    Deviations {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Z-score threshold (default 2.0)
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Sum a change metric per weekday
    DayOfWeek {
        #[command(flatten)]
        scope: ScopeArgs,

        /// commits, additions, deletions or total_changes
        #[arg(long, default_value = "commits")]
        metric: DayOfWeekMetric,

        /// Only count commits by this author
        #[arg(long)]
        author: Option<String>,
    },

    /// Show the most frequent words in commit messages
    Words {
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Show ingestion ledger entries for a repository
    Ledger {
        /// Repository owner (defaults to the configured repository)
        #[arg(long)]
        owner: Option<String>,

        /// Repository name (defaults to the configured repository)
        #[arg(long)]
        name: Option<String>,
    },
}

pub fn fetch_params(scope: &ScopeArgs, no_cache: bool) -> FetchParams {
    FetchParams {
        query: scope.query(),
        use_cache: !no_cache,
    }
}
