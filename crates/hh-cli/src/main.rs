//! hh4b CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hh_config::{Analysis, AnalysisConfig};
use hh_output::AnalysisOutput;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "hh4b")]
#[command(about = "VBF HH->4b event selection")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the selection over event chunks and write the merged outputs
    Run {
        /// Analysis file (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Event chunk files (JSON)
        #[arg(short, long, num_args = 1.., required = true)]
        events: Vec<PathBuf>,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Threads (0 = auto).
        #[arg(long, default_value = "0")]
        threads: usize,
    },

    /// Build the analysis without reading events and report configuration errors
    Validate {
        /// Analysis file (YAML)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// List the available cuts with their parameters
    Cuts {
        /// Also include the cuts defined by this analysis file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Run { config, events, output, threads } => {
            cmd_run(&config, &events, output.as_ref(), threads)
        }
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Cuts { config } => cmd_cuts(config.as_deref()),
    }
}

fn load_analysis(config: &Path) -> Result<Analysis> {
    tracing::info!(path = %config.display(), "loading analysis");
    Analysis::from_file(config).with_context(|| format!("invalid analysis {}", config.display()))
}

fn cmd_run(config: &Path, events: &[PathBuf], output: Option<&PathBuf>, threads: usize) -> Result<()> {
    if threads > 0 {
        // Best-effort; if a global pool already exists, keep going.
        let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
    }
    let analysis = load_analysis(config)?;

    let chunks = events
        .par_iter()
        .map(|path| {
            let table = hh_events::read_chunk(path)
                .with_context(|| format!("failed to read chunk {}", path.display()))?;
            let out = analysis
                .process(&table)
                .with_context(|| format!("failed to process chunk {}", path.display()))?;
            tracing::debug!(path = %path.display(), events = table.n_events(), "chunk done");
            Ok(out)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut total = AnalysisOutput::default();
    for chunk in chunks {
        total.merge(chunk)?;
    }
    tracing::info!(
        chunks = events.len(),
        events = total.cutflow.initial,
        preselected = total.cutflow.preselection,
        "selection done"
    );

    let value = serde_json::json!({
        "inputs": events.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        "cutflow": total.cutflow,
        "sumw": total.sumw,
        "histograms": total.histograms,
        "columns": total.columns,
    });
    write_json(output, value)
}

fn cmd_validate(config: &Path) -> Result<()> {
    let analysis = load_analysis(config)?;
    let categories = analysis.categories();
    let value = serde_json::json!({
        "preselection": categories.preselection().iter().map(|c| c.to_string()).collect::<Vec<_>>(),
        "categories": categories
            .regions()
            .iter()
            .map(|r| {
                let cuts: Vec<&str> = r.cuts().iter().map(|c| c.name()).collect();
                (r.name().to_string(), serde_json::json!(cuts))
            })
            .collect::<serde_json::Map<_, _>>(),
        "histograms": analysis.histograms().iter().map(|h| h.name.clone()).collect::<Vec<_>>(),
    });
    write_json(None, value)
}

fn cmd_cuts(config: Option<&Path>) -> Result<()> {
    let registry = match config {
        Some(path) => {
            let cfg = AnalysisConfig::from_file(path)?;
            cfg.registry()?
        }
        None => hh_select::CutRegistry::hh4b()?,
    };
    for (key, cut) in registry.iter() {
        println!("{key:<32} {cut}");
    }
    Ok(())
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
