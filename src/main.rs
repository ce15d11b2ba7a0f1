use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use tiltscroll_lib::{
    init_logging, load_trace, replay_session, JsonCorpus, ReplayOptions, RunConfig, ScrollEngine,
};

#[derive(Parser, Debug)]
#[command(about = "Replay a recorded tilt trace through the scroll engine")]
struct Args {
    /// Run configuration JSON; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Corpus JSON: { "<Category>": { "<ordinal><variant>": "text" } }
    #[arg(long)]
    corpus: PathBuf,

    /// Trace in JSON lines (sample / advance events)
    #[arg(long)]
    trace: PathBuf,

    /// Where to write the session export; stdout when omitted
    #[arg(long)]
    out: Option<PathBuf>,

    /// Seed for the starting variant; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Advance as soon as each passage is completed
    #[arg(long, default_value_t = false)]
    auto_advance: bool,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    let corpus = JsonCorpus::load(&args.corpus)?;
    let events = load_trace(&args.trace)?;
    log::info!(
        "replaying {} trace events with {} passages in the corpus",
        events.len(),
        corpus.len()
    );

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut engine = ScrollEngine::new(config, Box::new(corpus), &mut rng);

    let export = replay_session(
        &mut engine,
        &events,
        ReplayOptions {
            auto_advance: args.auto_advance,
        },
    )?;
    let json = export
        .to_json_pretty()
        .context("failed to serialize the session export")?;

    match &args.out {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("failed to write export to {}", path.display()))?;
            log::info!("session {} written to {}", export.session_id, path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
