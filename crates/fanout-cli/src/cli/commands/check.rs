//! `fanout check` – validate inputs and count what is already on disk.

use anyhow::{Context, Result};

use crate::cli::{InputArgs, EXIT_COMPLETE};

pub fn run_check(input: &InputArgs) -> Result<i32> {
    let (links, file_map) = input.load()?;
    file_map
        .ensure_covers(&links)
        .context("file map does not cover the link set")?;

    let mut present = 0usize;
    for link in links.iter() {
        if file_map.destination(&input.dest, link)?.exists() {
            present += 1;
        }
    }
    println!(
        "{} link(s), {} already present under {}, {} to fetch",
        links.total_count(),
        present,
        input.dest.display(),
        links.total_count() - present
    );
    Ok(EXIT_COMPLETE)
}
