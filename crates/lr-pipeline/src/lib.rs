#![forbid(unsafe_code)]

use std::fs;
use std::path::PathBuf;

use lr_audit::AnomalyLedger;
use lr_io::{read_counterparty_csv_str, read_ledger_csv_str, write_report_csv_string, IoError};
use lr_join::{join_records, JoinOptions};
use lr_report::{build_report, ReportError, ReportOptions, ReportRow};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    File(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PipelineOptions {
    pub join: JoinOptions,
    pub report: ReportOptions,
}

/// Result of one report run: the typed rows, the rendered CSV, and every
/// absorbed data-quality anomaly.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub rows: Vec<ReportRow>,
    pub csv: String,
    pub anomalies: AnomalyLedger,
}

/// Parse both datasets, join, roll up, and render: the whole pipeline over
/// in-memory CSV text.
pub fn run_report(
    ledger_csv: &str,
    counterparty_csv: &str,
    options: &PipelineOptions,
) -> Result<ReportOutcome, PipelineError> {
    let ledger = read_ledger_csv_str(ledger_csv)?;
    let counterparties = read_counterparty_csv_str(counterparty_csv)?;

    let mut anomalies = AnomalyLedger::new();
    let joined = join_records(&ledger, &counterparties, options.join, &mut anomalies);
    let rows = build_report(&joined, &options.report, &mut anomalies)?;
    let csv = write_report_csv_string(&rows, &options.report)?;

    Ok(ReportOutcome {
        rows,
        csv,
        anomalies,
    })
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub ledger_path: PathBuf,
    pub counterparty_path: PathBuf,
    pub out_path: PathBuf,
    pub options: PipelineOptions,
}

/// Filesystem wrapper around [`run_report`]; creates the output directory if
/// needed and writes the rendered CSV to `out_path`.
pub fn run_report_files(config: &PipelineConfig) -> Result<ReportOutcome, PipelineError> {
    let ledger_csv = fs::read_to_string(&config.ledger_path)?;
    let counterparty_csv = fs::read_to_string(&config.counterparty_path)?;

    let outcome = run_report(&ledger_csv, &counterparty_csv, &config.options)?;

    if let Some(parent) = config.out_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&config.out_path, &outcome.csv)?;
    Ok(outcome)
}

/// Anomaly ledger rendered as pretty JSON for operators.
pub fn anomalies_to_json(anomalies: &AnomalyLedger) -> Result<String, PipelineError> {
    Ok(serde_json::to_string_pretty(anomalies)?)
}
