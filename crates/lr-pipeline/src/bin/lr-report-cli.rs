#![forbid(unsafe_code)]

use std::path::PathBuf;

use lr_audit::DuplicateKeep;
use lr_pipeline::{anomalies_to_json, run_report_files, PipelineConfig, PipelineOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut ledger_path = PathBuf::from("dataset1.csv");
    let mut counterparty_path = PathBuf::from("dataset2.csv");
    let mut out_path = PathBuf::from("out/report.csv");
    let mut options = PipelineOptions::default();
    let mut anomalies_json_path: Option<PathBuf> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--ledger" => {
                let value = args.next().ok_or("--ledger requires a path")?;
                ledger_path = PathBuf::from(value);
            }
            "--counterparties" => {
                let value = args.next().ok_or("--counterparties requires a path")?;
                counterparty_path = PathBuf::from(value);
            }
            "--out" => {
                let value = args.next().ok_or("--out requires a path")?;
                out_path = PathBuf::from(value);
            }
            "--include-totals" => {
                options.report.include_totals = true;
            }
            "--keep-first" => {
                options.join.duplicate_keep = DuplicateKeep::First;
            }
            "--keep-nulls" => {
                options.report.rollup.dropna = false;
            }
            "--anomalies-json" => {
                let value = args.next().ok_or("--anomalies-json requires a path")?;
                anomalies_json_path = Some(PathBuf::from(value));
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => {
                return Err(format!("unknown argument: {other}").into());
            }
        }
    }

    let config = PipelineConfig {
        ledger_path,
        counterparty_path,
        out_path,
        options,
    };
    let outcome = run_report_files(&config)?;

    println!(
        "rows={} anomalies={} out={}",
        outcome.rows.len(),
        outcome.anomalies.len(),
        config.out_path.display()
    );

    if let Some(path) = anomalies_json_path {
        std::fs::write(&path, anomalies_to_json(&outcome.anomalies)?)?;
        println!("wrote anomalies={}", path.display());
    }

    Ok(())
}

fn print_help() {
    println!(
        "lr-report-cli: roll up ledger records into the unified report

USAGE:
    lr-report-cli [OPTIONS]

OPTIONS:
    --ledger <path>           ledger dataset (default: dataset1.csv)
    --counterparties <path>   counter-party metadata (default: dataset2.csv)
    --out <path>              report destination (default: out/report.csv)
    --include-totals          append the distinct-count columns
    --keep-first              first occurrence wins for duplicate counter-party keys
    --keep-nulls              keep null grouping keys as their own group
    --anomalies-json <path>   also write the anomaly ledger as JSON
    --help                    show this message"
    );
}
