//! isodep CLI: validate isolation configs and run them over events.
//!
//! Commands:
//! - `check`: validate a TOML config, print its fingerprint and sources
//! - `run`: evaluate a config over a JSON event file, write CSV or JSON
//! - `demo`: evaluate a config over seeded synthetic events

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use isodep_core::synthetic::EventGenerator;
use isodep_core::{CandIsolator, CandValueMap, Event, IsolatorConfig};

#[derive(Parser)]
#[command(name = "isodep", about = "isodep CLI: candidate isolation from deposit maps")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a TOML isolation config and print a summary.
    Check {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Evaluate a config over every event of a JSON event file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// JSON file holding an array of events.
        #[arg(long)]
        events: PathBuf,

        /// Output file. Defaults to stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
    },
    /// Evaluate a config over seeded synthetic events.
    Demo {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Number of events to generate.
        #[arg(long, default_value_t = 10)]
        events: usize,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Also write the generated events as JSON (usable with `run`).
        #[arg(long)]
        save_events: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Csv,
    Json,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => run_check(&config),
        Commands::Run {
            config,
            events,
            output,
            format,
        } => run_events(&config, &events, output.as_deref(), format),
        Commands::Demo {
            config,
            events,
            seed,
            save_events,
        } => run_demo(&config, events, seed, save_events.as_deref()),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_isolator(path: &Path) -> Result<(IsolatorConfig, CandIsolator)> {
    let config = IsolatorConfig::load(path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    let isolator = CandIsolator::from_config(&config)
        .with_context(|| format!("invalid config {}", path.display()))?;
    let fingerprint = config.fingerprint();
    info!(
        config = %path.display(),
        fingerprint = fingerprint.short(),
        sources = isolator.sources().len(),
        "isolator ready"
    );
    Ok((config, isolator))
}

fn run_check(path: &Path) -> Result<()> {
    let (config, isolator) = load_isolator(path)?;

    println!("Config:      {}", path.display());
    if let Some(label) = isolator.label() {
        println!("Label:       {label}");
    }
    println!("Fingerprint: {}", config.fingerprint());
    println!("Structure:   {}", config.structure_hash().short());
    println!("Universe:    {:?}", config.object_universe);
    println!("Zero energy: {:?}", config.zero_energy);
    println!();
    println!(
        "{:<16} {:<12} {:>7} {:<16} {}",
        "Source", "Mode", "DeltaR", "Weight", "Vetos"
    );
    println!("{}", "-".repeat(72));
    for source in isolator.sources() {
        let vetos: Vec<String> = source.vetos().iter().map(|v| v.to_string()).collect();
        let mut vetos = vetos.join(" ");
        if source.skip_default_veto() {
            vetos.push_str(" (default veto skipped)");
        }
        println!(
            "{:<16} {:<12} {:>7.3} {:<16} {}",
            source.source(),
            source.mode().as_str(),
            source.delta_r(),
            source.weight().to_string(),
            vetos
        );
    }
    Ok(())
}

fn read_events(path: &Path) -> Result<Vec<Event>> {
    let file =
        File::open(path).with_context(|| format!("failed to open events {}", path.display()))?;
    let events: Vec<Event> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse events {}", path.display()))?;
    Ok(events)
}

fn evaluate(isolator: &CandIsolator, events: &[Event]) -> Result<Vec<(u64, CandValueMap)>> {
    events
        .iter()
        .map(|event| {
            let values = isolator
                .produce(event)
                .with_context(|| format!("event {} failed", event.id))?;
            Ok((event.id, values))
        })
        .collect()
}

fn run_events(
    config_path: &Path,
    events_path: &Path,
    output: Option<&Path>,
    format: Format,
) -> Result<()> {
    let (config, isolator) = load_isolator(config_path)?;
    let events = read_events(events_path)?;
    if events.is_empty() {
        bail!("no events in {}", events_path.display());
    }
    info!(events = events.len(), "evaluating");

    let results = evaluate(&isolator, &events)?;

    let out: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    match format {
        Format::Csv => write_csv(&results, out)?,
        Format::Json => write_json(&config, &results, out)?,
    }

    if let Some(path) = output {
        info!(output = %path.display(), rows = row_count(&results), "results written");
    }
    Ok(())
}

fn run_demo(config_path: &Path, count: usize, seed: u64, save: Option<&Path>) -> Result<()> {
    let (_, isolator) = load_isolator(config_path)?;
    let events = EventGenerator::new(seed).events(count);

    if let Some(path) = save {
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &events)?;
        writer.flush()?;
        info!(path = %path.display(), events = events.len(), "synthetic events saved");
    }

    let results = evaluate(&isolator, &events)?;
    print_summary(&results);
    Ok(())
}

fn row_count(results: &[(u64, CandValueMap)]) -> usize {
    results.iter().map(|(_, values)| values.len()).sum()
}

fn print_summary(results: &[(u64, CandValueMap)]) {
    println!("{:<8} {:<16} {:>14}", "Event", "Candidate", "Value");
    println!("{}", "-".repeat(40));
    for (id, values) in results {
        if values.is_empty() {
            println!("{:<8} {:<16}", id, "(no candidates)");
            continue;
        }
        for (cand, value) in values.iter() {
            println!("{:<8} {:<16} {:>14.4}", id, cand.to_string(), value);
        }
    }

    let all: Vec<f64> = results
        .iter()
        .flat_map(|(_, values)| values.iter().map(|(_, v)| v))
        .collect();
    println!();
    println!("Events:     {}", results.len());
    println!("Candidates: {}", all.len());
    if !all.is_empty() {
        let mean = all.iter().sum::<f64>() / all.len() as f64;
        println!("Mean value: {mean:.4}");
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    event: u64,
    collection: &'a str,
    index: usize,
    value: f64,
}

fn write_csv<W: Write>(results: &[(u64, CandValueMap)], out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for (id, values) in results {
        for group in values.groups() {
            for (index, &value) in group.values.iter().enumerate() {
                writer.serialize(CsvRow {
                    event: *id,
                    collection: group.collection.as_str(),
                    index,
                    value,
                })?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: u64,
    values: &'a CandValueMap,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
    fingerprint: String,
    events: Vec<JsonEvent<'a>>,
}

fn write_json<W: Write>(
    config: &IsolatorConfig,
    results: &[(u64, CandValueMap)],
    mut out: W,
) -> Result<()> {
    let doc = JsonOutput {
        label: config.label.as_deref(),
        fingerprint: config.fingerprint().to_string(),
        events: results
            .iter()
            .map(|(id, values)| JsonEvent {
                event: *id,
                values,
            })
            .collect(),
    };
    serde_json::to_writer_pretty(&mut out, &doc)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
