#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line driver for the Bomberland rule engine.
//!
//! `replay` feeds recorded snapshots, one JSON document per line, through the
//! engine and prints the packets it would send, one JSON line per tick.
//! `print-tuning` prints the effective tuning. Logs go to stderr so stdout
//! only ever carries engine output.

mod config;

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::PathBuf,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use bomberland_core::{OutgoingPacket, Snapshot, UnitAction};
use bomberland_system_rules::{LiveTick, RuleEngine, TickError, TickScheduler};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Time the threaded replay waits for one tick before giving up.
const DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "bomberland-agent", about = "Rule-based Bomberland agent", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the engine over recorded snapshots
    Replay {
        /// JSON-lines file with one snapshot per line
        #[arg(long)]
        snapshots: PathBuf,
        /// TOML file overriding tuning defaults
        #[arg(long)]
        tuning: Option<PathBuf>,
        /// Compute ticks on the background scheduler
        #[arg(long)]
        threaded: bool,
    },
    /// Print the effective tuning as TOML
    PrintTuning {
        /// TOML file overriding tuning defaults
        #[arg(long)]
        tuning: Option<PathBuf>,
    },
}

/// One line of replay output.
#[derive(Serialize)]
struct TickLine {
    tick: u32,
    packets: Vec<OutgoingPacket>,
}

impl TickLine {
    fn new(tick: u32, actions: &[UnitAction]) -> Self {
        Self {
            tick,
            packets: actions.iter().filter_map(OutgoingPacket::from_action).collect(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Replay {
            snapshots,
            tuning,
            threaded,
        } => {
            let tuning = config::load_tuning(tuning.as_deref())?;
            let file = File::open(&snapshots)
                .with_context(|| format!("failed to open {}", snapshots.display()))?;
            let engine = RuleEngine::new(tuning);
            let stdout = io::stdout();
            let mut out = stdout.lock();
            if threaded {
                replay_threaded(engine, BufReader::new(file), &mut out)
            } else {
                replay_inline(engine, BufReader::new(file), &mut out)
            }
        }
        Command::PrintTuning { tuning } => {
            let tuning = config::load_tuning(tuning.as_deref())?;
            print!("{}", config::render_tuning(&tuning)?);
            Ok(())
        }
    }
}

/// Decodes the next snapshot, skipping blank lines and warning about lines
/// that are not snapshots.
fn next_snapshot(number: usize, line: io::Result<String>) -> Result<Option<Snapshot>> {
    let line = line.with_context(|| format!("failed to read snapshot line {number}"))?;
    if line.trim().is_empty() {
        return Ok(None);
    }
    match Snapshot::from_json(&line) {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(error) => {
            warn!(line = number, %error, "skipping undecodable snapshot");
            Ok(None)
        }
    }
}

fn emit(out: &mut impl Write, line: &TickLine) -> Result<()> {
    serde_json::to_writer(&mut *out, line).context("failed to encode packets")?;
    writeln!(out).context("failed to write packets")
}

fn replay_inline(mut engine: RuleEngine, input: impl BufRead, out: &mut impl Write) -> Result<()> {
    let live = LiveTick::new();
    let mut ticks = 0_usize;
    for (index, line) in input.lines().enumerate() {
        let Some(snapshot) = next_snapshot(index + 1, line)? else {
            continue;
        };
        live.advance(snapshot.tick);
        let actions = match engine.tick(&snapshot, &live.guard(snapshot.tick)) {
            Ok(outcome) => outcome.actions,
            Err(TickError::Snapshot(error)) => {
                warn!(tick = snapshot.tick, %error, "ignoring malformed snapshot");
                Vec::new()
            }
            Err(TickError::Cancelled(cancelled)) => bail!("inline replay cancelled: {cancelled}"),
        };
        emit(out, &TickLine::new(snapshot.tick, &actions))?;
        ticks += 1;
    }
    info!(ticks, "replay finished");
    Ok(())
}

fn replay_threaded(engine: RuleEngine, input: impl BufRead, out: &mut impl Write) -> Result<()> {
    let scheduler = TickScheduler::spawn(engine);
    let mut ticks = 0_usize;
    for (index, line) in input.lines().enumerate() {
        let Some(snapshot) = next_snapshot(index + 1, line)? else {
            continue;
        };
        let tick = snapshot.tick;
        if !scheduler.submit(snapshot) {
            bail!("scheduler stopped before tick {tick}");
        }
        let dispatch = scheduler
            .dispatches()
            .recv_timeout(DISPATCH_TIMEOUT)
            .with_context(|| format!("no dispatch for tick {tick}"))?;
        emit(out, &TickLine::new(dispatch.tick, &dispatch.actions))?;
        ticks += 1;
    }
    let _ = scheduler.shutdown();
    info!(ticks, "threaded replay finished");
    Ok(())
}
