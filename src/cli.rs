use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "resume-subs",
    version,
    about = "Find the first watched video in a lazily loading subscriptions feed"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Replay(ReplayArgs),
    Rules(RulesArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    #[arg(long)]
    pub trace: PathBuf,

    #[arg(long, default_value = ".cache/resume-subs")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long)]
    pub rules_path: Option<PathBuf>,

    /// Date used to pick active signature rules; defaults to today.
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    #[arg(long, default_value_t = 50)]
    pub early_skew_max: i64,

    #[arg(long, default_value_t = 10)]
    pub late_skew_max: i64,

    #[arg(long, default_value_t = 1_000)]
    pub throttle_ms: u64,

    #[arg(long, default_value_t = 15_000)]
    pub settle_ms: u64,

    #[arg(long, default_value_t = 10)]
    pub max_ancestor_hops: usize,

    /// Virtual time after which the page counts as hung.
    #[arg(long, default_value_t = 600_000)]
    pub deadline_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub struct RulesArgs {
    #[arg(long)]
    pub rules_path: Option<PathBuf>,

    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/resume-subs")]
    pub cache_root: PathBuf,
}
