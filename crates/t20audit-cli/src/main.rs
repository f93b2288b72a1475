//! t20audit CLI
//!
//! Runs the full threat audit with compiled-in defaults. Every flag is
//! optional and overrides the defaults (or the `--config` file).

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use t20audit_core::{run_and_write, AuditConfig, ReferenceLoad};

#[derive(Parser)]
#[command(name = "t20audit")]
#[command(
    author,
    version,
    about = "Flag threat stats that do not fit their ND"
)]
struct Cli {
    /// JSON config file (any subset of fields)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory with threat data files
    #[arg(long)]
    threats_dir: Option<PathBuf>,
    /// Rulebook PDF or pre-extracted tables JSON
    #[arg(long)]
    reference_doc: Option<PathBuf>,
    /// Combat table file name inside the threats directory
    #[arg(long)]
    combat_table: Option<String>,
    /// Report output path
    #[arg(short, long)]
    report: Option<PathBuf>,
    /// First rulebook page to search (zero-based)
    #[arg(long)]
    first_page: Option<usize>,
    /// Page after the last one to search (zero-based, exclusive)
    #[arg(long)]
    last_page: Option<usize>,
}

impl Cli {
    fn into_config(self) -> Result<AuditConfig> {
        let mut config = match &self.config {
            Some(path) => AuditConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => AuditConfig::default(),
        };

        if let Some(dir) = self.threats_dir {
            config.threats_dir = dir;
        }
        if let Some(doc) = self.reference_doc {
            config.reference_document = doc;
        }
        if let Some(table) = self.combat_table {
            config.combat_table_file = table;
        }
        if let Some(report) = self.report {
            config.report_path = report;
        }
        if let Some(first) = self.first_page {
            config.first_page = first;
        }
        if let Some(last) = self.last_page {
            config.last_page = last;
        }
        Ok(config)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();

    let config = Cli::parse().into_config()?;
    let run = run_and_write(&config).context("audit failed")?;

    let reference = match &run.reference {
        ReferenceLoad::Loaded { source, table } => {
            format!("{} entries from {source}", table.len()).green()
        }
        ReferenceLoad::Empty => "no reference table".red(),
    };
    let issues = if run.issue_count == 0 {
        "0 issues".green()
    } else {
        format!("{} issues", run.issue_count).yellow()
    };

    println!(
        "{} {} ({} threats in {} files; {reference}, {issues})",
        "Report written to".bold(),
        config.report_path.display(),
        run.record_count(),
        run.files.len(),
    );

    Ok(())
}
