//! `fanout run` – download a link set and report it to the coordinator.

use anyhow::{Context, Result};
use fanout_core::config::FanoutConfig;
use fanout_core::fetch::CurlFetcher;
use fanout_core::links::{parse_headers, FileMap, LinkSet};
use fanout_core::queue::SocketReporter;
use fanout_core::scheduler::{run_download, PoolCaps, RunOutcome, RunRequest};

use crate::cli::{RunArgs, EXIT_COMPLETE, EXIT_EXHAUSTED};

pub fn run_links(cfg: &FanoutConfig, args: &RunArgs) -> Result<i32> {
    let (links, file_map) = args.input.load()?;
    let req = build_request(cfg, args, links, file_map)?;

    let mut coordinator = cfg.coordinator.clone();
    if let Some(addr) = &args.coordinator {
        coordinator.addr = addr.clone();
    }
    let reporter = SocketReporter::new(&coordinator)
        .context("coordinator settings")?
        .with_post_policy(cfg.report_policy());

    let report = run_download(&req, &CurlFetcher::new(), &reporter)?;

    println!(
        "downloaded {}/{} in {} round(s), took {:.2?}",
        report.downloaded_count,
        report.total_links,
        report.rounds.len(),
        report.elapsed
    );
    if !report.stop_delivered {
        eprintln!("warning: coordinator at {} did not receive the stop notification", reporter.addr());
    }

    match report.outcome {
        RunOutcome::Complete => Ok(EXIT_COMPLETE),
        RunOutcome::Exhausted { abandoned } => {
            eprintln!(
                "{} link(s) still failing after {} retries:",
                abandoned.len(),
                report.retry_count
            );
            for link in &abandoned {
                eprintln!("  {}", link);
            }
            Ok(EXIT_EXHAUSTED)
        }
    }
}

fn build_request(
    cfg: &FanoutConfig,
    args: &RunArgs,
    links: LinkSet,
    file_map: FileMap,
) -> Result<RunRequest> {
    let mut req = RunRequest::new(links, file_map, &args.input.dest).with_config(cfg);
    req.caps = PoolCaps::new(
        args.process_cap.unwrap_or(cfg.process_cap),
        args.thread_cap.unwrap_or(cfg.thread_cap),
    );
    if let Some(n) = args.max_retries {
        req.max_retries = n;
    }
    req.batch_size = args.batch_size;
    req.convert = args.convert;
    req.shuffle_seed = args.seed;
    req.options.http2 = args.http2;
    if let Some(path) = &args.headers {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read headers file {}", path.display()))?;
        req.options.headers = parse_headers(&text);
    }
    Ok(req)
}
