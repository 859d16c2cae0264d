//! Main application entry point

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use anyhow::{Context, Result};
use clap::Parser;
use sg_core::events::events::{AnnotationsUpdated, FetchFailed};
use sg_core::AppState;
use sg_views::{ModuleConfig, SpanGraphModule};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod demo;
mod render;

use demo::{DemoFile, SimulatedService};
use render::{format_annotations, TextRenderer};

/// Span-graph annotation viewer for the terminal
#[derive(Parser, Debug)]
#[command(name = "spangraph", version, about)]
struct Cli {
    /// Demo file with the dataset spec, model specs and examples
    #[arg(short, long, default_value = "demos/sentences.json")]
    input: PathBuf,

    /// Module configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model to show predictions for; defaults to the first one
    #[arg(short, long)]
    model: Option<String>,

    /// Also show the dataset's own labels
    #[arg(long)]
    gold: bool,

    /// Example ids to select in order, "-" clears the selection;
    /// defaults to every example
    #[arg(short, long, value_delimiter = ',')]
    select: Vec<String>,

    /// Pause between selection changes
    #[arg(long, default_value_t = 50)]
    interval_ms: u64,

    #[arg(long, default_value_t = 20)]
    min_latency_ms: u64,

    #[arg(long, default_value_t = 200)]
    max_latency_ms: u64,

    /// Probability that a simulated fetch fails
    #[arg(long, default_value_t = 0.0)]
    failure_rate: f64,
}

fn load_config(path: &Path) -> Result<ModuleConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

/// Resolve once no load of `module` is in flight
async fn wait_until_idle(module: &SpanGraphModule) {
    let idle = Arc::new(Notify::new());
    let notify = Arc::clone(&idle);
    let _subscription = module.busy().subscribe(move |busy| {
        if !*busy {
            notify.notify_one();
        }
    });
    if module.is_busy() {
        idle.notified().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    info!("Starting span-graph viewer");

    let demo = DemoFile::load(&cli.input)?;
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ModuleConfig::default(),
    };

    let state = Arc::new(AppState::new());
    demo.register(&state)?;

    let model = cli
        .model
        .clone()
        .or_else(|| state.model_names().into_iter().next())
        .context("Demo file defines no models")?;
    state.set_current_model(&model)?;

    let updates = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&updates);
    state.event_bus.on::<AnnotationsUpdated, _>(move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
    });
    let failures = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&failures);
    state.event_bus.on::<FetchFailed, _>(move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    let service = Arc::new(SimulatedService::new(
        &demo,
        cli.min_latency_ms,
        cli.max_latency_ms,
        cli.failure_rate,
    ));

    let mut modules = Vec::new();
    if SpanGraphModule::should_display_predictions(&state) {
        let module = SpanGraphModule::predictions(
            Arc::clone(&state),
            service.clone(),
            Handle::current(),
            config.clone(),
        );
        module.attach_renderer(Arc::new(TextRenderer::new(format!("predictions: {}", model))));
        module.attach()?;
        modules.push(module);
    } else {
        warn!("No registered model produces span-graph fields");
    }

    if cli.gold {
        if SpanGraphModule::should_display_gold(&state) {
            let module = SpanGraphModule::gold(Arc::clone(&state), config.clone());
            module.attach_renderer(Arc::new(TextRenderer::new(format!("gold: {}", demo.dataset.name))));
            module.attach()?;
            modules.push(module);
        } else {
            warn!(dataset = %demo.dataset.name, "Dataset has no span-graph fields");
        }
    }

    let selections = if cli.select.is_empty() {
        demo.example_ids()
    } else {
        cli.select.clone()
    };

    for id in &selections {
        if id == "-" {
            info!("Clearing selection");
            state.selection.clear();
        } else if state.selection.select_id(id) {
            info!(example = %id, "Selected example");
        } else {
            warn!(example = %id, "Unknown example id");
        }
        tokio::time::sleep(Duration::from_millis(cli.interval_ms)).await;
    }

    for module in &modules {
        wait_until_idle(module).await;
    }

    println!("\n=== final state ===");
    for module in &modules {
        println!("[{}]\n{}", module.module_type(), format_annotations(&module.current_annotations()));
        module.detach();
    }
    info!(
        selections = selections.len(),
        fetches = service.call_count(),
        updates = updates.load(Ordering::Relaxed),
        failures = failures.load(Ordering::Relaxed),
        "Done"
    );

    Ok(())
}
