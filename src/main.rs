//! Inspector IDs CLI
//!
//! Usage:
//!   inspector-ids [OPTIONS] [FILE]
//!
//! Without FILE (or with --all) every JSX/TSX file under the project's source
//! directory is instrumented in place.

use std::fs;
use std::path::PathBuf;

use clap::Parser;

use inspector_ids::{
    BatchReport, IdentityRecord, InstrumentConfig, InstrumentError, Instrumenter,
    RegistryScope, SuffixMode,
};

#[derive(Parser)]
#[command(name = "inspector-ids")]
#[command(about = "Add stable inspector identities to JSX elements")]
struct Cli {
    /// Single file to instrument
    input: Option<PathBuf>,

    /// Instrument every file under the source directory
    #[arg(short, long)]
    all: bool,

    /// Configuration file (TOML); defaults to inspector-ids.toml in the project root
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Project root that file paths are recorded relative to
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Suffix mode for new identifiers: counter or random
    #[arg(long)]
    mode: Option<SuffixMode>,

    /// Identifier uniqueness scope: file or global
    #[arg(long)]
    scope: Option<RegistryScope>,

    /// Report elements missing identities without writing files
    #[arg(long)]
    check: bool,

    /// Print the identity records of the run as JSON
    #[arg(long)]
    manifest: bool,

    /// Verbose logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<InstrumentConfig, InstrumentError> {
    let root = cli.root.clone().unwrap_or_else(|| PathBuf::from("."));
    let mut config = match &cli.config {
        Some(path) => InstrumentConfig::from_file(path)?,
        None => InstrumentConfig::discover(&root)?,
    };
    if cli.root.is_some() || cli.config.is_none() {
        config = config.with_project_root(root);
    }
    if let Some(mode) = cli.mode {
        config = config.with_suffix_mode(mode);
    }
    if let Some(scope) = cli.scope {
        config = config.with_scope(scope);
    }
    Ok(config)
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };

    let mut instrumenter = Instrumenter::new(config).with_dry_run(cli.check);
    let report = match (&cli.input, cli.all) {
        (Some(path), false) => instrumenter.process_file(path).map(|outcome| {
            let mut report = BatchReport::default();
            if outcome.modified {
                report.modified.push(outcome.path);
            } else {
                report.unchanged.push(outcome.path);
            }
            report.records = outcome.records;
            report
        }),
        _ => instrumenter.process_all(),
    };

    let report = match report {
        Ok(report) => report,
        Err(e) => {
            print_error(&e);
            std::process::exit(1);
        }
    };

    if cli.manifest {
        match serde_json::to_string_pretty(&report.records) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error writing manifest: {}", e);
                std::process::exit(1);
            }
        }
    } else if cli.check {
        print_missing(&report.records);
    } else {
        print_summary(&report);
    }

    for failed in &report.failed {
        eprintln!("Error: {}: {}", failed.path.display(), failed.message);
    }

    if cli.check && !report.records.is_empty() {
        std::process::exit(1);
    }
}

fn print_error(error: &InstrumentError) {
    match error {
        InstrumentError::Parse { path, source } => {
            let filename = path.display().to_string();
            match fs::read_to_string(path) {
                Ok(text) => eprint!("{}", source.format(&text, &filename)),
                Err(_) => eprintln!("Error: {}", error),
            }
        }
        _ => eprintln!("Error: {}", error),
    }
}

fn print_missing(records: &[IdentityRecord]) {
    for record in records {
        println!(
            "{}:{}: missing inspector attributes on <{}>",
            record.file_path, record.line, record.tag
        );
    }
    if records.is_empty() {
        println!("All elements carry inspector attributes");
    }
}

fn print_summary(report: &BatchReport) {
    for path in &report.modified {
        println!("Instrumented {}", path.display());
    }
    println!(
        "{} file(s) processed: {} modified, {} unchanged, {} failed, {} element(s) instrumented",
        report.processed() + report.failed.len(),
        report.modified.len(),
        report.unchanged.len(),
        report.failed.len(),
        report.records.len()
    );
}
