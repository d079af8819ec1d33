use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rime_core::{ADAPT_THRESHOLD, EngineConfig, Frame, FrameManager, new_frame_id};
use rime_store::{
    DEFAULT_CONFIG_FILE, DEFAULT_SNAPSHOT_FILE, SnapshotStore, read_tokens, write_frame_events,
    write_frame_summary, write_manager_events, write_manager_summary,
};

#[derive(Parser)]
#[command(name = "rime", about = "RIME belief-frame engine CLI")]
struct Cli {
    /// Snapshot file (default: $RIME_DATA_DIR/rime_state.json)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Engine config file (default: $RIME_DATA_DIR/rime.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed unprocessed tokens from a file into the manager and save
    Run {
        /// Delimited input, one token per record in the first column
        input: PathBuf,

        /// Seed for frame id generation (random if omitted)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the manager summary as JSON
    Summary,

    /// Show manager statistics
    Stats,

    /// Write the tabular summary and event exports
    Export {
        /// Axiom and contradiction table
        #[arg(long)]
        summary: PathBuf,

        /// Event log table
        #[arg(long)]
        events: PathBuf,
    },

    /// Run a single standalone frame over a whole input file
    Frame {
        /// Delimited input, one token per record in the first column
        input: PathBuf,

        /// Axiom and contradiction table
        #[arg(long)]
        summary: PathBuf,

        /// Per-evaluation trace table
        #[arg(long)]
        events: PathBuf,

        /// Contradictions needed before the frame adapts
        #[arg(long, default_value_t = ADAPT_THRESHOLD)]
        threshold: usize,

        /// Frame id (random if omitted)
        #[arg(long)]
        id: Option<String>,
    },
}

fn data_dir() -> PathBuf {
    std::env::var("RIME_DATA_DIR")
        .ok()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn snapshot_store(cli: &Cli) -> SnapshotStore {
    let path = cli
        .state
        .clone()
        .unwrap_or_else(|| data_dir().join(DEFAULT_SNAPSHOT_FILE));
    SnapshotStore::new(path)
}

fn engine_config(cli: &Cli) -> Result<EngineConfig> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| data_dir().join(DEFAULT_CONFIG_FILE));
    rime_store::load_config(&path).with_context(|| format!("failed to load {}", path.display()))
}

fn load_manager(cli: &Cli) -> Result<(SnapshotStore, FrameManager)> {
    let store = snapshot_store(cli);
    let mgr = store
        .load(engine_config(cli)?)
        .with_context(|| format!("failed to load snapshot {}", store.path().display()))?;
    Ok((store, mgr))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Run { input, seed } => cmd_run(&cli, input, *seed),
        Commands::Summary => cmd_summary(&cli),
        Commands::Stats => cmd_stats(&cli),
        Commands::Export { summary, events } => cmd_export(&cli, summary, events),
        Commands::Frame {
            input,
            summary,
            events,
            threshold,
            id,
        } => cmd_frame(input, summary, events, *threshold, id.as_deref()),
    }
}

fn rng_from(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn cmd_run(cli: &Cli, input: &Path, seed: Option<u64>) -> Result<()> {
    let (store, mut mgr) = load_manager(cli)?;
    let tokens =
        read_tokens(input).with_context(|| format!("failed to read {}", input.display()))?;

    let skip = usize::try_from(mgr.processed_index).unwrap_or(usize::MAX);
    if skip > tokens.len() {
        tracing::warn!(
            "snapshot has processed {} tokens but {} holds only {}",
            mgr.processed_index,
            input.display(),
            tokens.len()
        );
    }
    let pending = tokens.get(skip..).unwrap_or_default();
    tracing::debug!("skipping {} already-processed tokens", skip.min(tokens.len()));

    let mut rng = rng_from(seed);
    for token in pending {
        mgr.process_input(token, &mut rng);
    }

    store.save(&mgr).context("failed to save snapshot")?;

    println!(
        "processed {} tokens. tick={}, frames={}, active={}",
        pending.len(),
        mgr.tick,
        mgr.frames.len(),
        mgr.active_frame.as_deref().unwrap_or("none")
    );
    Ok(())
}

fn cmd_summary(cli: &Cli) -> Result<()> {
    let (_, mgr) = load_manager(cli)?;
    let json =
        serde_json::to_string_pretty(&mgr.summarize()).context("failed to serialize summary")?;
    println!("{json}");
    Ok(())
}

fn cmd_stats(cli: &Cli) -> Result<()> {
    let (store, mgr) = load_manager(cli)?;

    println!("snapshot:   {}", store.path().display());
    println!("tick:       {}", mgr.tick);
    println!("processed:  {}", mgr.processed_index);
    println!("frames:     {}", mgr.frames.len());
    println!(
        "active:     {}",
        mgr.active_frame.as_deref().unwrap_or("none")
    );
    println!("events:     {}", mgr.event_log.len());
    if let Some(active) = mgr.active() {
        println!(
            "score:      {} ({} axioms, {} contradictions)",
            active.score(),
            active.axioms.len(),
            active.contradictions.len()
        );
    }
    Ok(())
}

fn cmd_export(cli: &Cli, summary: &Path, events: &Path) -> Result<()> {
    let (_, mgr) = load_manager(cli)?;

    write_manager_summary(&mgr, create(summary)?)
        .with_context(|| format!("failed to write {}", summary.display()))?;
    write_manager_events(&mgr, create(events)?)
        .with_context(|| format!("failed to write {}", events.display()))?;

    println!(
        "exported {} frames to {}, {} events to {}",
        mgr.frames.len(),
        summary.display(),
        mgr.event_log.len(),
        events.display()
    );
    Ok(())
}

fn cmd_frame(
    input: &Path,
    summary: &Path,
    events: &Path,
    threshold: usize,
    id: Option<&str>,
) -> Result<()> {
    let tokens =
        read_tokens(input).with_context(|| format!("failed to read {}", input.display()))?;

    let id = match id {
        Some(id) => id.to_string(),
        None => new_frame_id(&mut SmallRng::from_os_rng()),
    };
    let mut frame = Frame::with_threshold(id, threshold);
    frame.process_stream(&tokens);

    write_frame_summary(&frame, create(summary)?)
        .with_context(|| format!("failed to write {}", summary.display()))?;
    write_frame_events(&frame, create(events)?)
        .with_context(|| format!("failed to write {}", events.display()))?;

    println!("frame {} complete. score: {}", frame.id, frame.score());
    Ok(())
}
