#![forbid(unsafe_code)]

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which occurrence wins when the counter-party dataset repeats a join key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeep {
    First,
    Last,
}

/// Data-quality events the pipeline absorbs instead of raising.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    DuplicateCounterParty,
    UnmatchedCounterParty,
    UnknownStatus,
    MissingRating,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub kind: AnomalyKind,
    /// The distinct subject of the anomaly (a key, a status code). At most
    /// one record exists per (kind, subject) pair.
    pub subject: String,
    pub detail: String,
    pub ts_unix_ms: u64,
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("system clock is before UNIX_EPOCH")]
    ClockSkew,
}

fn now_unix_ms() -> Result<u64, AuditError> {
    let ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| AuditError::ClockSkew)?
        .as_millis();
    Ok(ms as u64)
}

/// Append-only record of absorbed data-quality anomalies.
///
/// Anomalies never abort the computation; they document which fill and
/// exclusion policies fired so a report consumer can audit the output.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyLedger {
    records: Vec<AnomalyRecord>,
}

impl AnomalyLedger {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Record an anomaly unless the (kind, subject) pair is already present.
    /// Returns whether a record was appended.
    pub fn record_once(
        &mut self,
        kind: AnomalyKind,
        subject: impl Into<String>,
        detail: impl Into<String>,
    ) -> bool {
        let subject = subject.into();
        if self
            .records
            .iter()
            .any(|record| record.kind == kind && record.subject == subject)
        {
            return false;
        }
        self.records.push(AnomalyRecord {
            kind,
            subject,
            detail: detail.into(),
            ts_unix_ms: now_unix_ms().unwrap_or_default(),
        });
        true
    }

    #[must_use]
    pub fn records(&self) -> &[AnomalyRecord] {
        &self.records
    }

    #[must_use]
    pub fn count_of(&self, kind: AnomalyKind) -> usize {
        self.records
            .iter()
            .filter(|record| record.kind == kind)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }
}
