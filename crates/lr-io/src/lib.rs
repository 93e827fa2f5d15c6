#![forbid(unsafe_code)]

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use lr_model::{CounterPartyInfo, LedgerRecord, Status};
use lr_report::{report_header, ReportOptions, ReportRow};
use thiserror::Error;

pub const LEDGER_REQUIRED_COLUMNS: [&str; 5] =
    ["legal_entity", "counter_party", "status", "value", "rating"];
pub const COUNTERPARTY_REQUIRED_COLUMNS: [&str; 2] = ["counter_party", "tier"];

/// An input table is missing a required column. Fatal: no partial report is
/// produced.
#[derive(Debug, Error)]
#[error("{table} is missing required column {column:?}")]
pub struct SchemaError {
    pub table: &'static str,
    pub column: &'static str,
}

#[derive(Debug, Error)]
pub enum IoError {
    #[error("csv input has no headers")]
    MissingHeaders,
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("{table} line {line}: malformed {column} field {raw:?}")]
    Malformed {
        table: &'static str,
        line: usize,
        column: &'static str,
        raw: String,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub fn read_ledger_csv_str(input: &str) -> Result<Vec<LedgerRecord>, IoError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    let headers = reader.headers()?.clone();
    let columns = resolve_columns("ledger", &headers, &LEDGER_REQUIRED_COLUMNS)?;

    let mut records = Vec::new();
    for (row_idx, row) in reader.records().enumerate() {
        let row = row?;
        // Header occupies line 1.
        let line = row_idx + 2;
        records.push(LedgerRecord {
            legal_entity: field(&row, columns[0]).to_owned(),
            counter_party: field(&row, columns[1]).to_owned(),
            status: Status::parse(field(&row, columns[2])),
            value: parse_value("ledger", line, field(&row, columns[3]))?,
            rating: parse_rating("ledger", line, field(&row, columns[4]))?,
        });
    }
    Ok(records)
}

pub fn read_counterparty_csv_str(input: &str) -> Result<Vec<CounterPartyInfo>, IoError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    let headers = reader.headers()?.clone();
    let columns = resolve_columns("counterparty", &headers, &COUNTERPARTY_REQUIRED_COLUMNS)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(CounterPartyInfo {
            counter_party: field(&row, columns[0]).to_owned(),
            tier: field(&row, columns[1]).to_owned(),
        });
    }
    Ok(records)
}

/// Render the report in the fixed column order; `None` dimensions become the
/// empty marker.
pub fn write_report_csv_string(
    rows: &[ReportRow],
    options: &ReportOptions,
) -> Result<String, IoError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(report_header(options.include_totals))?;

    for row in rows {
        let mut record = vec![
            dimension_cell(row.legal_entity.as_deref()),
            dimension_cell(row.counter_party.as_deref()),
            dimension_cell(row.tier.as_deref()),
            row.max_rating.to_string(),
            value_cell(row.sum_value_arap),
            value_cell(row.sum_value_accr),
        ];
        if options.include_totals {
            record.push(count_cell(row.distinct_legal_entities));
            record.push(count_cell(row.distinct_counter_parties));
            record.push(count_cell(row.distinct_tiers));
        }
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Map the required column names to header positions. Extra columns are
/// ignored; column order is immaterial.
fn resolve_columns(
    table: &'static str,
    headers: &StringRecord,
    required: &[&'static str],
) -> Result<Vec<usize>, IoError> {
    if headers.is_empty() {
        return Err(IoError::MissingHeaders);
    }
    required
        .iter()
        .map(|column| {
            headers
                .iter()
                .position(|header| header.trim() == *column)
                .ok_or_else(|| IoError::Schema(SchemaError { table, column }))
        })
        .collect()
}

fn field<'a>(row: &'a StringRecord, idx: usize) -> &'a str {
    row.get(idx).unwrap_or_default().trim()
}

fn parse_value(table: &'static str, line: usize, raw: &str) -> Result<f64, IoError> {
    raw.parse::<f64>().map_err(|_| IoError::Malformed {
        table,
        line,
        column: "value",
        raw: raw.to_owned(),
    })
}

fn parse_rating(table: &'static str, line: usize, raw: &str) -> Result<Option<i64>, IoError> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i64>().map(Some).map_err(|_| IoError::Malformed {
        table,
        line,
        column: "rating",
        raw: raw.to_owned(),
    })
}

fn dimension_cell(value: Option<&str>) -> String {
    value.unwrap_or_default().to_owned()
}

fn value_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

fn count_cell(count: Option<usize>) -> String {
    count.map_or_else(String::new, |count| count.to_string())
}
