//! expertise-convert: researcher CSV to expertise graph JSON.
//!
//! Reads config overrides from env vars:
//!   EXPERTISE_SIMILARITY_THRESHOLD merge threshold (default: 0.85)
//!   EXPERTISE_SIMILARITY_METRIC    levenshtein | jaro_winkler | exact
//!   EXPERTISE_TITLE_POLICY         longest_string | keep_existing

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use expertise_graph::{EngineConfig, ExpertiseEngine, InMemoryGraphSink, IngestReport, SourceRow};

#[derive(Parser, Debug)]
#[command(name = "expertise-convert")]
#[command(about = "Ingest researcher records and export a deduplicated expertise graph")]
struct Cli {
    /// Input CSV file
    input: PathBuf,

    /// JSON engine configuration; env overrides apply on top
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Leading lines to skip before the first record
    #[arg(long, default_value_t = 2)]
    skip_rows: usize,

    /// Field delimiter
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Quote character
    #[arg(long, default_value_t = '|')]
    quote: char,

    /// Stop after this many records
    #[arg(long)]
    limit: Option<usize>,

    /// Emit logs as JSON
    #[arg(long, env = "EXPERTISE_JSON_LOGS")]
    json_logs: bool,

    /// Write the graph snapshot here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = load_config(cli.config.as_deref())?;
    let mut engine = ExpertiseEngine::new(config).context("invalid engine configuration")?;

    let rows = read_rows(&cli)?;
    let report = engine.ingest_batch(rows)?;
    print_report(&report, cli.skip_rows);

    let sink = InMemoryGraphSink::new();
    let summary = engine.finish(&sink)?;
    tracing::info!(
        persons = summary.export.persons,
        stubs = summary.resolution.synthesized.len(),
        relationships = summary.export.relationships,
        "pipeline complete"
    );

    let snapshot = sink.snapshot()?;
    let digest = snapshot.digest()?;
    let json = serde_json::to_string_pretty(&snapshot)?;
    match &cli.output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("wrote {} (digest {digest})", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "expertise_graph=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let base = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            EngineConfig::from_json_str(&text)?
        }
        None => EngineConfig::default(),
    };
    Ok(base.with_env_overrides()?)
}

fn ascii_byte(value: char, flag: &str) -> Result<u8> {
    if !value.is_ascii() {
        bail!("--{flag} must be an ASCII character, got '{value}'");
    }
    Ok(value as u8)
}

fn read_rows(cli: &Cli) -> Result<Vec<SourceRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(ascii_byte(cli.delimiter, "delimiter")?)
        .quote(ascii_byte(cli.quote, "quote")?)
        .from_path(&cli.input)
        .with_context(|| format!("Failed to open CSV file: {}", cli.input.display()))?;

    let mut rows = Vec::new();
    for (idx, result) in reader.records().skip(cli.skip_rows).enumerate() {
        if cli.limit.is_some_and(|lim| idx >= lim) {
            break;
        }
        let line = idx + cli.skip_rows + 1;
        let record = result.with_context(|| format!("Failed to read line {line}"))?;
        let row = SourceRow::from_fields(record.iter())
            .with_context(|| format!("Malformed record on line {line}"))?;
        rows.push(row);
    }
    Ok(rows)
}

fn print_report(report: &IngestReport, offset: usize) {
    eprintln!(
        "ingested {} of {} records",
        report.accepted.len(),
        report.rows()
    );
    for rejection in &report.rejected {
        eprintln!("- line {}: rejected: {}", rejection.row + offset, rejection.reason);
    }
    for warning in &report.warnings {
        eprintln!("- line {}: {}", warning.row + offset, warning.kind);
    }
}
