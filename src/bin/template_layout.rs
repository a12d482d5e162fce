//! Template Layout Binary
//!
//! Imports a template description, lays out the stage graph and its
//! timeline, and prints a JSON report on stdout.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `LAYOUT_CONFIG`: path to a JSON `LayoutSettings` file, same as `--config` (default: presets)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: pretty)
//!
//! Logs go to stderr so the report stays machine-readable.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin template_layout -- scenario.json
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stage_graph_kernel::{
    timeline_edge_names, LayoutSettings, Position, Template, TEMPLATE_SCHEMA_VERSION,
};

/// Lay out an attack-scenario template and print a JSON report.
#[derive(Parser, Debug)]
#[command(name = "template_layout")]
#[command(version)]
#[command(about = "Lay out a scenario template and report stage and timeline positions", long_about = None)]
struct Args {
    /// Path to the template description (JSON)
    template: PathBuf,

    /// Layout settings file (JSON); presets are used when absent
    #[arg(short, long, env = "LAYOUT_CONFIG")]
    config: Option<PathBuf>,
}

/// Initialize tracing with JSON or pretty format based on environment.
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "template_layout=info,stage_graph_kernel=info".into());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn load_settings(path: Option<&Path>) -> Result<LayoutSettings, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            info!(path = %path.display(), "layout settings loaded");
            Ok(LayoutSettings::from_json(&json)?)
        }
        None => Ok(LayoutSettings::default()),
    }
}

#[derive(Serialize)]
struct Report {
    schema_version: &'static str,
    template: String,
    valid: bool,
    errors: Vec<String>,
    fingerprint: String,
    stages: BTreeMap<String, Position>,
    timeline: BTreeMap<String, Position>,
    timeline_edges: Vec<(String, String)>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing();

    let settings = load_settings(args.config.as_deref())?;

    let json = std::fs::read_to_string(&args.template)?;
    let mut template = Template::from_json(&json)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        template = %template.name,
        stages = template.stages.len(),
        "template loaded"
    );

    let errors: Vec<String> = template.stages.errors().iter().map(ToString::to_string).collect();
    for error in &errors {
        warn!(error = %error, "template is not valid");
    }

    template.stages.layout_structure(&settings.tree);
    let timeline_layout = template.stages.layout_timeline(&settings.timeline);

    let graph = &template.stages;
    let stages = graph
        .nodes()
        .map(|(_, node)| (node.name().to_string(), node.position()))
        .collect();
    let timeline = timeline_layout
        .map(|result| {
            result
                .positions
                .into_iter()
                .filter_map(|(id, position)| graph.node(id).map(|n| (n.name().to_string(), position)))
                .collect()
        })
        .unwrap_or_default();

    let report = Report {
        schema_version: TEMPLATE_SCHEMA_VERSION,
        template: template.name.clone(),
        valid: errors.is_empty(),
        errors,
        fingerprint: graph.fingerprint(),
        stages,
        timeline,
        timeline_edges: timeline_edge_names(graph),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
