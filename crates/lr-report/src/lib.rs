#![forbid(unsafe_code)]

use lr_audit::{AnomalyKind, AnomalyLedger};
use lr_model::{Dimension, JoinedRecord, Status};
use lr_rollup::{
    rollup_with_options, RollupError, RollupExecutionOptions, RollupOptions, RollupRow,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The four fixed groupings, in output concatenation order.
pub const REPORT_GROUPINGS: [&[Dimension]; 4] = [
    &[Dimension::CounterParty],
    &[Dimension::LegalEntity],
    &[Dimension::Tier],
    &[Dimension::LegalEntity, Dimension::CounterParty],
];

pub const COL_LEGAL_ENTITY: &str = "legal_entity";
pub const COL_COUNTER_PARTY: &str = "counter_party";
pub const COL_TIER: &str = "tier";
pub const COL_MAX_RATING: &str = "max(rating by counterparty)";
pub const COL_SUM_ARAP: &str = "sum(value where status=ARAP)";
pub const COL_SUM_ACCR: &str = "sum(value where status=ACCR)";

pub const COL_COUNT_LEGAL_ENTITY: &str = "count(distinct legal_entity)";
pub const COL_COUNT_COUNTER_PARTY: &str = "count(distinct counter_party)";
pub const COL_COUNT_TIER: &str = "count(distinct tier)";

/// The fixed six-column report header.
pub const REPORT_HEADER: [&str; 6] = [
    COL_LEGAL_ENTITY,
    COL_COUNTER_PARTY,
    COL_TIER,
    COL_MAX_RATING,
    COL_SUM_ARAP,
    COL_SUM_ACCR,
];

/// Header for the requested shape: the fixed six columns, with the three
/// distinct-count columns trailing when totals are included.
#[must_use]
pub fn report_header(include_totals: bool) -> Vec<&'static str> {
    let mut header = REPORT_HEADER.to_vec();
    if include_totals {
        header.extend([
            COL_COUNT_LEGAL_ENTITY,
            COL_COUNT_COUNTER_PARTY,
            COL_COUNT_TIER,
        ]);
    }
    header
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportOptions {
    /// Expose the per-rollup distinct counts as trailing columns. Off by
    /// default: the counts are intermediate values in the fixed schema.
    pub include_totals: bool,
    pub rollup: RollupOptions,
    pub exec: RollupExecutionOptions,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_totals: false,
            rollup: RollupOptions::default(),
            exec: RollupExecutionOptions::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Rollup(#[from] RollupError),
}

/// One row of the unified report. A dimension absent from the originating
/// rollup's key is `None` and renders as the empty marker, never as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub legal_entity: Option<String>,
    pub counter_party: Option<String>,
    pub tier: Option<String>,
    pub max_rating: i64,
    pub sum_value_arap: f64,
    pub sum_value_accr: f64,
    /// Populated only when `include_totals` is set, and only for dimensions
    /// outside the originating rollup's key.
    pub distinct_legal_entities: Option<usize>,
    pub distinct_counter_parties: Option<usize>,
    pub distinct_tiers: Option<usize>,
}

/// Run the four rollups and union them under the fixed report schema.
///
/// Plain concatenation in `REPORT_GROUPINGS` order: key values repeating
/// across rollups are not deduplicated, and the concatenation order is
/// deterministic regardless of how the rollups are evaluated.
pub fn build_report(
    joined: &[JoinedRecord],
    options: &ReportOptions,
    audit: &mut AnomalyLedger,
) -> Result<Vec<ReportRow>, ReportError> {
    record_quality_anomalies(joined, audit);

    let mut report = Vec::new();
    for group_dims in REPORT_GROUPINGS {
        let rows = rollup_with_options(joined, group_dims, options.rollup, options.exec)?;
        report.extend(
            rows.into_iter()
                .map(|row| project_row(row, options.include_totals)),
        );
    }
    Ok(report)
}

/// Explicit projection of a tagged rollup row into the unified shape.
fn project_row(row: RollupRow, include_totals: bool) -> ReportRow {
    let key_value = |dim: Dimension| -> Option<String> {
        row.dims
            .iter()
            .position(|key_dim| *key_dim == dim)
            .and_then(|pos| row.key[pos].clone())
    };
    let total = |dim: Dimension| -> Option<usize> {
        if include_totals {
            row.distinct_count(dim)
        } else {
            None
        }
    };

    ReportRow {
        legal_entity: key_value(Dimension::LegalEntity),
        counter_party: key_value(Dimension::CounterParty),
        tier: key_value(Dimension::Tier),
        max_rating: row.max_rating,
        sum_value_arap: row.sum_value_arap,
        sum_value_accr: row.sum_value_accr,
        distinct_legal_entities: total(Dimension::LegalEntity),
        distinct_counter_parties: total(Dimension::CounterParty),
        distinct_tiers: total(Dimension::Tier),
    }
}

/// Absorbed data-quality events, recorded once per distinct subject: unknown
/// status codes (excluded from both sums) and null ratings (excluded from
/// rating maxima).
fn record_quality_anomalies(joined: &[JoinedRecord], audit: &mut AnomalyLedger) {
    for record in joined {
        if let Status::Other(code) = &record.status {
            audit.record_once(
                AnomalyKind::UnknownStatus,
                code.as_str(),
                "excluded from both status sums",
            );
        }
    }

    let missing_ratings = joined.iter().filter(|record| record.rating.is_none()).count();
    if missing_ratings > 0 {
        audit.record_once(
            AnomalyKind::MissingRating,
            "rating",
            format!("{missing_ratings} rows without a rating; excluded from rating maxima"),
        );
    }
}
