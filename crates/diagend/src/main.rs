//! diagend - event-driven entrypoint for the Diagen pipeline.
//!
//! Reads one inbound action-group event (from a file or stdin), runs the
//! generation pipeline, and prints the structured response envelope.

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::Level;

use diagen_core::{
    AgentEvent, EventHandler, FsObjectStore, HttpSynthesizer, PipelineConfig, ServiceMap,
    StaticSynthesizer, SynthesizerConfig,
};

#[derive(Parser, Debug)]
#[command(name = "diagend", version, about = "Render LLM-authored diagram scripts")]
struct Cli {
    /// Path to the inbound event JSON ("-" reads stdin)
    #[arg(long, default_value = "-")]
    event: String,

    /// Mapping table JSON file; the bundled table is used when omitted
    #[arg(long, env = "DIAGEN_MAPPING")]
    mapping: Option<PathBuf>,

    /// Root directory of the local object store
    #[arg(long, env = "DIAGEN_STORE_ROOT", default_value = "diagen-store")]
    store_root: PathBuf,

    /// Use a pre-generated script file instead of calling the model
    #[arg(long)]
    script_file: Option<PathBuf>,

    /// Emit newline-delimited JSON log lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    diagen_core::init_tracing(cli.json_logs, Level::INFO);

    // The mapping table loads once at startup; a malformed table is a
    // fatal startup error, not a per-request one.
    let services = match &cli.mapping {
        Some(path) => ServiceMap::load(path)
            .with_context(|| format!("loading mapping table {}", path.display()))?,
        None => ServiceMap::builtin(),
    };

    let config = PipelineConfig::from_env();
    let store = FsObjectStore::new(&cli.store_root)
        .with_context(|| format!("opening object store {}", cli.store_root.display()))?;

    let event_json = if cli.event == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("reading event from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(&cli.event)
            .with_context(|| format!("reading event {}", cli.event))?
    };
    let event: AgentEvent = serde_json::from_str(&event_json).context("parsing event")?;

    let response = match &cli.script_file {
        Some(path) => {
            let script = std::fs::read_to_string(path)
                .with_context(|| format!("reading script {}", path.display()))?;
            let handler =
                EventHandler::new(config, services, StaticSynthesizer::new(script), store);
            handler.handle(&event).await
        }
        None => {
            let synthesizer = HttpSynthesizer::new(SynthesizerConfig::from_env());
            let handler = EventHandler::new(config, services, synthesizer, store);
            handler.handle(&event).await
        }
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
