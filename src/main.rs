use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use autoaudit::app::{AuditOutcome, AuditUseCase, SheetSelector, SheetSource, UploadRequest};
use autoaudit::config::Config;
use autoaudit::infra::{CsvReportSink, PdfReportSink, WorkbookSource, XlsxReportSink};
use autoaudit::observability::{self, metrics};
use autoaudit::pipeline::processing::{RiskClassifier, StatusClassifier};
use autoaudit::pipeline::AuditPipeline;
use autoaudit::types::RiskLevel;

#[derive(Parser)]
#[command(name = "autoaudit")]
#[command(about = "Classify IT audit checklists by implementation risk")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline over one spreadsheet and print the summary
    Analyze {
        /// Spreadsheet to analyze (.xlsx, .xlsm, .xls, .ods or .csv)
        file: PathBuf,
        /// Worksheet name; defaults to the first sheet
        #[arg(long)]
        sheet: Option<String>,
        /// Configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the classified table as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Write the PDF report
        #[arg(long)]
        pdf: Option<PathBuf>,
        /// Write the classified table to an "Audit Report" Excel sheet
        #[arg(long)]
        xlsx: Option<PathBuf>,
        /// Print the outcome as JSON instead of text
        #[arg(long)]
        json: bool,
        /// Print a Prometheus metrics snapshot to stderr on exit
        #[arg(long)]
        metrics: bool,
    },
    /// Show the detected header row and how each column maps
    Inspect {
        file: PathBuf,
        #[arg(long)]
        sheet: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Classify free-text status observations
    Classify {
        #[arg(required = true)]
        statuses: Vec<String>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn selector(cli_sheet: Option<String>, config: &Config) -> SheetSelector {
    SheetSelector::from_option(cli_sheet.as_deref().or(config.sheet.as_deref()))
}

fn print_summary(outcome: &AuditOutcome) {
    let summary = &outcome.summary;
    println!("Sheet: {} (header row {})", outcome.sheet, outcome.header_index + 1);
    println!("Controls: {}", summary.total);
    println!("  Implemented:     {}", summary.implemented);
    println!("  Not implemented: {}", summary.not_implemented);
    println!();
    println!("Risk levels:");
    for level in RiskLevel::RANKED.iter().rev().chain(std::iter::once(&RiskLevel::Unknown)) {
        if let Some(count) = summary.by_level.get(level) {
            println!("  {:<8} {}", level.as_str(), count);
        }
    }

    if !summary.per_function.is_empty() {
        println!();
        println!("By function:");
        for (function, statuses) in &summary.per_function {
            let parts: Vec<String> = statuses.iter().map(|(s, n)| format!("{s}: {n}")).collect();
            println!("  {function}: {}", parts.join(", "));
        }
    }

    if !summary.high_risk.is_empty() {
        println!();
        println!("High-risk priorities:");
        for item in &summary.high_risk {
            println!("  {} | {} | {} | {}", item.clause, item.control, item.function, item.status);
            if !item.observation.is_empty() {
                println!("      {}", item.observation);
            }
        }
    }

    for path in &outcome.artifacts {
        println!("Wrote {}", path.display());
    }
}

/// Report files requested on the command line.
struct ReportTargets {
    csv: Option<PathBuf>,
    pdf: Option<PathBuf>,
    xlsx: Option<PathBuf>,
}

fn analyze(
    file: PathBuf,
    sheet: Option<String>,
    targets: ReportTargets,
    json: bool,
    config: &Config,
) -> Result<()> {
    let mut use_case = AuditUseCase::new(
        Box::new(WorkbookSource::new()),
        AuditPipeline::from_config(config),
    )
    .with_report_title(config.report.title.clone());
    if let Some(path) = targets.csv {
        use_case = use_case.with_sink(Box::new(CsvReportSink::new(path)));
    }
    if let Some(path) = targets.pdf {
        use_case = use_case.with_sink(Box::new(PdfReportSink::new(path)));
    }
    if let Some(path) = targets.xlsx {
        use_case = use_case.with_sink(Box::new(XlsxReportSink::new(path)));
    }

    let request = UploadRequest::new(file.clone(), selector(sheet, config));
    let outcome = use_case
        .run(&request)
        .with_context(|| format!("failed to analyze {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_summary(&outcome);
    }
    Ok(())
}

fn inspect(file: &Path, sheet: Option<String>, config: &Config) -> Result<()> {
    let loaded = WorkbookSource::new()
        .load(file, &selector(sheet, config))
        .with_context(|| format!("failed to read {}", file.display()))?;
    let pipeline = AuditPipeline::from_config(config);
    let inspection = pipeline.inspect(&loaded.sheet)?;

    println!("Sheet: {}", loaded.sheet.name);
    println!("Header row: {}", inspection.header_index + 1);
    println!("Mapped:");
    for col in inspection.mapping.mapped() {
        println!("  [{}] {:?} -> {} ({:?})", col.index, col.raw, col.field, col.matched_by);
    }
    if !inspection.mapping.unmapped().is_empty() {
        println!("Unmapped:");
        for col in inspection.mapping.unmapped() {
            println!("  [{}] {:?} ({:?})", col.index, col.raw, col.reason);
        }
    }
    let missing = inspection.mapping.missing(pipeline.required());
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|f| f.as_str()).collect();
        println!("Missing required: {}", names.join(", "));
    }
    Ok(())
}

fn classify(statuses: &[String], config: &Config) {
    let classifier = RiskClassifier::new(config.risk_table.clone());
    for status in statuses {
        let risk = classifier.classify(Some(status.as_str()));
        println!("{status}\t{}\t{}\t{}", risk.label, risk.score(), risk.level);
    }
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config_path = match &cli.command {
        Commands::Analyze { config, .. }
        | Commands::Inspect { config, .. }
        | Commands::Classify { config, .. } => config.clone(),
    };
    let config = Config::load(config_path.as_deref()).context("failed to load configuration")?;
    let _guard = observability::init_logging(&config.log_dir);
    match &config.source {
        Some(path) => info!(path = %path.display(), "using configuration file"),
        None => info!("using built-in configuration"),
    }

    let result = match cli.command {
        Commands::Analyze {
            file,
            sheet,
            csv,
            pdf,
            xlsx,
            json,
            metrics: with_metrics,
            ..
        } => {
            if with_metrics {
                if let Err(e) = metrics::init() {
                    error!(error = %e, "failed to install metrics recorder");
                }
            }
            let result = analyze(file, sheet, ReportTargets { csv, pdf, xlsx }, json, &config);
            if with_metrics {
                if let Some(text) = metrics::render() {
                    eprintln!("{text}");
                }
            }
            result
        }
        Commands::Inspect { file, sheet, .. } => inspect(&file, sheet, &config),
        Commands::Classify { statuses, .. } => {
            classify(&statuses, &config);
            Ok(())
        }
    };

    if let Err(e) = &result {
        error!(error = %format!("{e:#}"), "command failed");
    }
    result
}
