//! CLI for the fanout bulk downloader.

mod commands;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fanout_core::config;
use fanout_core::links::{FileMap, LinkSet};
use std::path::PathBuf;
use url::Url;

use commands::{run_check, run_links};

/// Process exit status when every link was downloaded.
pub const EXIT_COMPLETE: i32 = 0;
/// Process exit status when the retry budget ran out with links left.
pub const EXIT_EXHAUSTED: i32 = 2;

/// Top-level CLI for the fanout bulk downloader.
#[derive(Debug, Parser)]
#[command(name = "fanout")]
#[command(about = "fanout: parallel bulk downloader with round-based retry", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download every link, retrying failures in rounds, and report files to the coordinator.
    Run(RunArgs),

    /// Validate the inputs and show what a run would fetch, without downloading.
    Check(InputArgs),
}

/// Inputs shared by `run` and `check`.
#[derive(Debug, Args)]
pub struct InputArgs {
    /// File with one link per line (blank lines and `#` comments are skipped).
    #[arg(long, value_name = "FILE")]
    pub links: PathBuf,

    /// JSON object mapping each link to a path relative to --dest.
    #[arg(long, value_name = "FILE")]
    pub file_map: PathBuf,

    /// Destination prefix for every mapped path.
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub dest: PathBuf,

    /// Base URL for links (and FileMap keys) that are not absolute.
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,
}

impl InputArgs {
    /// Load the link set and FileMap, resolving relative links against --base-url.
    pub fn load(&self) -> Result<(LinkSet, FileMap)> {
        let base = self
            .base_url
            .as_deref()
            .map(|b| Url::parse(b).with_context(|| format!("invalid --base-url {:?}", b)))
            .transpose()?;
        let links = LinkSet::load(&self.links, base.as_ref())?;
        let file_map = FileMap::load(&self.file_map, base.as_ref())?;
        Ok((links, file_map))
    }
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// File with extra request headers, one `Name: value` per line.
    #[arg(long, value_name = "FILE")]
    pub headers: Option<PathBuf>,

    /// Ask servers for HTTP/2.
    #[arg(long)]
    pub http2: bool,

    /// Retry rounds after the first (overrides config).
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Batches in flight at once (overrides config).
    #[arg(long, value_name = "N")]
    pub process_cap: Option<usize>,

    /// Links per batch and threads per batch (overrides config).
    #[arg(long, value_name = "N")]
    pub thread_cap: Option<usize>,

    /// Links per batch; capped at the thread cap.
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Mark the run for conversion by the downstream consumer.
    #[arg(long)]
    pub convert: bool,

    /// Coordinator address, e.g. 127.0.0.1:5050 (overrides config).
    #[arg(long, value_name = "ADDR")]
    pub coordinator: Option<String>,

    /// Seed for candidate shuffling, for reproducible batch layout.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,
}

impl CliCommand {
    /// Parse arguments, run the command, and return the process exit status.
    pub fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run(args) => run_links(&cfg, &args),
            CliCommand::Check(input) => run_check(&input),
        }
    }
}

#[cfg(test)]
mod tests;
