use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use trellis_client::{Engine, Modal, Navigation, RecordingHost, RecordingTransport};
use trellis_dom::to_markup;
use trellis_protocol::{NodeScripts, OutboundBlock, ScriptCall};
use url::Url;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Transcript JSON file
    pub transcript: PathBuf,

    /// Skip printing the final page markup
    #[arg(long)]
    pub no_markup: bool,
}

/// A recorded session: the page as first served plus every inbound batch
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub initial_content: String,
    #[serde(default)]
    pub initialisers: NodeScripts,
    #[serde(default)]
    pub doc_init_script: Option<ScriptCall>,
    #[serde(default)]
    pub batches: Vec<Vec<Value>>,
}

#[derive(Debug)]
pub struct Replay {
    pub blocks: Vec<OutboundBlock>,
    /// `(batch index, error)` for every batch that was halted
    pub halted: Vec<(usize, String)>,
    /// Initialiser and document script calls that found no handler
    pub skipped_scripts: usize,
    pub navigations: Vec<Navigation>,
    pub modals: Vec<Modal>,
    pub dependencies: Vec<String>,
    pub alerts: Vec<String>,
    pub markup: String,
}

/// Run a transcript through an engine with no script handlers registered
pub fn run_transcript(transcript: &Transcript, config: &Config) -> Result<Replay> {
    let location = Url::parse(&config.location)
        .with_context(|| format!("Invalid location {:?}", config.location))?;
    let mut engine = Engine::new(
        config.engine.clone(),
        &transcript.initial_content,
        RecordingTransport::new(),
        RecordingHost::new(location),
    )?;

    let report = engine.initialise(&transcript.initialisers, transcript.doc_init_script.as_ref());
    let skipped_scripts = report.script_failures.len();

    let mut halted = Vec::new();
    for (index, batch) in transcript.batches.iter().enumerate() {
        tracing::debug!(index, messages = batch.len(), "replaying batch");
        if let Err(failure) = engine.receive_block(batch.clone()) {
            halted.push((index, failure.to_string()));
        }
    }
    let host = engine.host();
    Ok(Replay {
        blocks: engine.transport().blocks.clone(),
        halted,
        skipped_scripts,
        navigations: host.navigations.clone(),
        modals: host.modals.clone(),
        dependencies: host.dependencies.clone(),
        alerts: engine.alerts().iter().map(|alert| alert.body.headline()).collect(),
        markup: to_markup(engine.store().tree(), engine.store().document()),
    })
}

pub fn replay(args: ReplayArgs, config: &Config) -> Result<()> {
    let content = fs::read_to_string(&args.transcript)
        .with_context(|| format!("Cannot read {}", args.transcript.display()))?;
    let transcript: Transcript = serde_json::from_str(&content)
        .with_context(|| format!("Invalid transcript {}", args.transcript.display()))?;

    println!(
        "{} {} ({} batches)",
        "Replaying".bright_blue().bold(),
        args.transcript.display(),
        transcript.batches.len()
    );
    let replay = run_transcript(&transcript, config)?;

    println!();
    println!("Outbound blocks ({}):", replay.blocks.len());
    for block in &replay.blocks {
        println!("  {}", serde_json::to_string(block)?);
    }

    for (index, failure) in &replay.halted {
        println!("  {} batch {index} halted: {}", "✗".red(), failure.red());
    }
    for modal in &replay.modals {
        println!("  {} {}", "modal".yellow(), modal.message());
    }
    for navigation in &replay.navigations {
        match navigation {
            Navigation::Reload => println!("  {} reload", "navigate".cyan()),
            Navigation::Replace(url) => println!("  {} {url}", "navigate".cyan()),
        }
    }
    for dependency in &replay.dependencies {
        println!("  {} {dependency}", "dependency".cyan());
    }
    for alert in &replay.alerts {
        println!("  {} {alert}", "alert".yellow());
    }
    if replay.skipped_scripts > 0 {
        println!(
            "{}",
            format!("  {} initialisation script calls had no handler", replay.skipped_scripts).dimmed()
        );
    }

    if !args.no_markup {
        println!();
        println!("{}", replay.markup);
    }

    Ok(())
}
