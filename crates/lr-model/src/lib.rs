#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Status code of a ledger entry.
///
/// Only `ARAP` and `ACCR` participate in the status-conditional sums. Any
/// other code is carried verbatim in `Other` rather than rejected at load
/// time; such rows are excluded from both sums.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Status {
    Arap,
    Accr,
    Other(String),
}

impl Status {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "ARAP" => Self::Arap,
            "ACCR" => Self::Accr,
            other => Self::Other(other.to_owned()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Arap => "ARAP",
            Self::Accr => "ACCR",
            Self::Other(code) => code,
        }
    }
}

/// A groupable report dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    LegalEntity,
    CounterParty,
    Tier,
}

impl Dimension {
    /// Canonical dimension order, used for distinct-count emission and the
    /// report column layout.
    pub const ALL: [Self; 3] = [Self::LegalEntity, Self::CounterParty, Self::Tier];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LegalEntity => "legal_entity",
            Self::CounterParty => "counter_party",
            Self::Tier => "tier",
        }
    }
}

/// One row of the ledger dataset. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub legal_entity: String,
    pub counter_party: String,
    pub status: Status,
    pub value: f64,
    /// A missing rating cell parses to `None` and is excluded from rating
    /// maxima rather than treated as zero.
    pub rating: Option<i64>,
}

/// One row of the counter-party metadata dataset. `counter_party` is the
/// join key and is expected (not enforced) to be unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterPartyInfo {
    pub counter_party: String,
    pub tier: String,
}

/// A ledger record with tier metadata attached by the left join. `tier` is
/// `None` when the counter-party has no match in the metadata dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedRecord {
    pub legal_entity: String,
    pub counter_party: String,
    pub tier: Option<String>,
    pub status: Status,
    pub value: f64,
    pub rating: Option<i64>,
}

impl JoinedRecord {
    /// The record's value for a dimension. An unmatched tier is a missing
    /// value, not an empty-string value.
    #[must_use]
    pub fn dimension(&self, dim: Dimension) -> Option<&str> {
        match dim {
            Dimension::LegalEntity => Some(&self.legal_entity),
            Dimension::CounterParty => Some(&self.counter_party),
            Dimension::Tier => self.tier.as_deref(),
        }
    }
}
