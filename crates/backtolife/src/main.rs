//! backtolife: turn a process recovered from a memory image into a CRIU
//! checkpoint image set.
//!
//! Reads the snapshot manifest the analysis stage produced, finds the
//! requested PID, and writes `pages-1.img`, `pagemap-<pid>.json`,
//! `mm-<pid>.json` and `procfiles.json` into the dump directory.

mod memory;
mod plugins;
mod process;
mod snapshot;

use anyhow::Context;
use clap::Parser;
use plugins::backtolife::{self, DumpOptions};
use snapshot::Snapshot;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "backtolife")]
#[command(about = "Generate CRIU image files for a process recovered from a memory image", long_about = None)]
struct Args {
    /// Snapshot manifest (.json or .json.xz) describing the recovered processes
    #[arg(short = 'f', long, value_name = "FILE")]
    snapshot: PathBuf,

    /// PID of the process to dump
    #[arg(short, long)]
    pid: Option<u64>,

    /// Output directory
    #[arg(short = 'D', long, value_name = "DIR", default_value = "./")]
    dump_dir: PathBuf,

    /// Raw memory image, overriding the one named in the manifest
    #[arg(short, long, value_name = "FILE")]
    image: Option<PathBuf>,

    /// Do not register open files whose path a mapping already registered
    #[arg(long)]
    dedup_files: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Checked before the manifest is read; a usage error touches nothing.
    let pid = backtolife::require_pid(args.pid)?;

    let snapshot = Snapshot::load(&args.snapshot, args.image.as_deref())
        .with_context(|| format!("loading snapshot {}", args.snapshot.display()))?;

    let options = DumpOptions {
        dedup_open_files: args.dedup_files,
    };
    backtolife::run_snapshot(&snapshot, Some(pid), options, &args.dump_dir)
        .inspect_err(|e| tracing::error!("Dump of PID {} failed: {}", pid, e))
        .with_context(|| format!("dumping PID {} into {}", pid, args.dump_dir.display()))?;

    Ok(())
}
