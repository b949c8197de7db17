//! SWITCHYARD CLI
//!
//! Compile rule sets and dry-run them from the shell.

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::{Args, Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use std::path::PathBuf;
use std::sync::Arc;
use switchyard_log::JsonLinesRecorder;
use switchyard_orchestrator::{OrchestrationConfig, OrchestrationRequest, Orchestrator};
use switchyard_plan::{Compiler, NodeSummary, parse};
use switchyard_rules::{FnRule, RuleRegistry};
use switchyard_runtime::RunMode;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "switchyard=info";

#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "SWITCHYARD - rule graph workflow orchestration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a rule set and print its nodes
    Plan(Source),
    /// Walk a rule set without running any rule and print the transcript
    DryRun(Source),
}

#[derive(Args, Debug)]
struct Source {
    /// Rule set text, e.g. "CHECK?QUOTE:DECLINE,QUOTE,DECLINE"
    #[arg(short, long, conflicts_with = "file", required_unless_present = "file")]
    rules: Option<String>,
    /// File holding rule set text
    #[arg(short, long)]
    file: Option<PathBuf>,
    /// Registered rule name; repeatable. Defaults to every rule the text names
    #[arg(long = "rule", value_name = "NAME")]
    declared: Vec<String>,
    /// Orchestration configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Emit JSON
    #[arg(long)]
    json: bool,
    /// Append recorded status events to this file as JSON lines (dry-run)
    #[arg(long, value_name = "PATH")]
    events_jsonl: Option<PathBuf>,
}

impl Source {
    fn text(&self) -> Result<String> {
        match (&self.rules, &self.file) {
            (Some(rules), _) => Ok(rules.clone()),
            (None, Some(path)) => std::fs::read_to_string(path)
                .wrap_err_with(|| format!("reading rule set from {}", path.display())),
            (None, None) => Err(eyre!("either --rules or --file is required")),
        }
    }

    fn config(&self) -> Result<OrchestrationConfig> {
        match &self.config {
            Some(path) => Ok(OrchestrationConfig::from_file(path)?),
            None => Ok(OrchestrationConfig::default()),
        }
    }

    /// Registry of always-true stand-ins for the declared rules
    fn registry(&self, text: &str) -> Result<Arc<RuleRegistry>> {
        let names: Vec<String> = if self.declared.is_empty() {
            parse(text)?
                .iter()
                .map(|step| step.rule_name().to_string())
                .collect()
        } else {
            self.declared.clone()
        };

        let mut registry = RuleRegistry::new();
        for name in names {
            if !registry.contains(&name) {
                registry.register(Arc::new(FnRule::constant(name, true)))?;
            }
        }
        Ok(Arc::new(registry))
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Plan(source) => plan(&source),
        Commands::DryRun(source) => dry_run(&source),
    }
}

fn plan(source: &Source) -> Result<()> {
    let text = source.text()?;
    let compiler = Compiler::new(source.registry(&text)?);
    let graph = compiler.compile(&text)?;

    if source.json {
        let doc = serde_json::json!({
            "source": graph.source(),
            "nodes": graph.describe(),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        println!("{}", graph.source());
        print!("{}", render_table(&graph.describe()));
    }
    Ok(())
}

fn dry_run(source: &Source) -> Result<()> {
    let text = source.text()?;
    let config = source.config()?.with_mode(RunMode::Test);
    let mut orchestrator = Orchestrator::new(source.registry(&text)?, config);
    if let Some(path) = &source.events_jsonl {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .wrap_err_with(|| format!("opening event log {}", path.display()))?;
        orchestrator = orchestrator.with_recorder(Arc::new(JsonLinesRecorder::new(file)));
    }

    let mut request = OrchestrationRequest::custom(text);
    let result = orchestrator.execute(&mut request);
    let ctx = request.context();

    if source.json {
        let doc = serde_json::json!({
            "ok": result.is_ok(),
            "steps": result.as_ref().ok().and_then(Option::as_ref).map(|r| r.steps),
            "transcript": ctx.test_results(),
            "events": ctx.status().events(),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        for entry in ctx.test_results() {
            println!("{entry}\n");
        }
        for event in ctx.status().events() {
            println!("{event}");
        }
    }

    match result {
        Ok(Some(result)) => {
            tracing::info!(steps = result.steps, "dry run complete");
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn render_table(nodes: &[NodeSummary]) -> String {
    let headers = ["NAME", "RULE", "ON TRUE", "ON FALSE"];
    let rows: Vec<[&str; 4]> = nodes
        .iter()
        .map(|n| [n.name.as_str(), n.rule.as_str(), n.on_true.as_str(), n.on_false.as_str()])
        .collect();

    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    for row in std::iter::once(&headers).chain(rows.iter()) {
        let line = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
