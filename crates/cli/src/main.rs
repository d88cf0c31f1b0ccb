///! # CLI - Shoal Dataset Inspector
///!
///! A REPL-style shell over a memory-mapped dataset. On startup it maps every
///! dataset file, then reads commands from stdin and answers block lookups on
///! stdout. Works interactively or scripted (pipe commands via stdin).
///!
///! ## Commands
///!
///! ```text
///! GET name       Resolve a block (region, offset, size, count, preview)
///! LIST           List every resolvable block name
///! FILES          List the dataset files that were mapped
///! FILEINDEX      Print the absolute spatial-index path
///! STATS          Print allocator debug info
///! EXIT / QUIT    Shut down
///! ```
///!
///! ## Configuration
///!
///! All settings are controlled via environment variables:
///!
///! ```text
///! SHOAL_BASE_PATH   dataset base path   (default: "data/dataset")
///! SHOAL_LOG         tracing filter      (default: "info")
///! ```
///!
///! ## Example
///!
///! ```text
///! $ SHOAL_BASE_PATH=data/region cargo run -p cli
///! Shoal started (base=data/region, files=15, regions=16, blocks=16)
///! > GET coordinates
///! region=4 offset=0 size=4096 count=512 [00 01 02 03 ...]
///! > EXIT
///! bye
///! ```

mod commands;

use anyhow::Result;
use commands::{execute, Step};
use config::{env_or, StorageConfig};
use datafacade::MmapMemoryAllocator;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the tracing filter.
const LOG_ENV: &str = "SHOAL_LOG";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_or(LOG_ENV, "info")))
        .with_writer(io::stderr)
        .init();

    let config = StorageConfig::from_env();

    let allocator = MmapMemoryAllocator::new(&config)?;
    let index = allocator.get_index();

    println!(
        "Shoal started (base={}, files={}, regions={}, blocks={})",
        config.base_path().display(),
        allocator.mapped_files().len(),
        index.num_regions(),
        index.num_blocks()
    );
    println!("Commands: GET name | LIST | FILES | FILEINDEX | STATS | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        match execute(&allocator, &line) {
            Some(Step::Continue(out)) => println!("{}", out),
            Some(Step::Exit(out)) => {
                println!("{}", out);
                break;
            }
            None => {}
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    tracing::debug!("shutting down");
    Ok(())
}
