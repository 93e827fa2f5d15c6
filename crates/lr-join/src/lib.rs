#![forbid(unsafe_code)]

use std::collections::HashMap;

use lr_audit::{AnomalyKind, AnomalyLedger, DuplicateKeep};
use lr_model::{CounterPartyInfo, JoinedRecord, LedgerRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOptions {
    pub duplicate_keep: DuplicateKeep,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            duplicate_keep: DuplicateKeep::Last,
        }
    }
}

/// Left join attaching tier metadata to every ledger record.
///
/// Row-preserving: the output has exactly one record per input ledger record,
/// in input order, matched or not. The right side collapses to one tier per
/// counter-party before probing, so duplicate metadata keys can never
/// multiply rows; each duplicate and each distinct unmatched key is recorded
/// in the anomaly ledger.
#[must_use]
pub fn join_records(
    ledger: &[LedgerRecord],
    counterparties: &[CounterPartyInfo],
    options: JoinOptions,
    audit: &mut AnomalyLedger,
) -> Vec<JoinedRecord> {
    // Borrowed-key map: no per-row clones during the build phase.
    let mut tier_by_key = HashMap::<&str, &str>::with_capacity(counterparties.len());
    for info in counterparties {
        let key = info.counter_party.as_str();
        let duplicate = match options.duplicate_keep {
            DuplicateKeep::Last => tier_by_key.insert(key, info.tier.as_str()).is_some(),
            DuplicateKeep::First => {
                if tier_by_key.contains_key(key) {
                    true
                } else {
                    tier_by_key.insert(key, info.tier.as_str());
                    false
                }
            }
        };
        if duplicate {
            let winner = match options.duplicate_keep {
                DuplicateKeep::First => "first occurrence wins",
                DuplicateKeep::Last => "last occurrence wins",
            };
            audit.record_once(AnomalyKind::DuplicateCounterParty, key, winner);
        }
    }

    ledger
        .iter()
        .map(|record| {
            let tier = tier_by_key
                .get(record.counter_party.as_str())
                .map(|tier| (*tier).to_owned());
            if tier.is_none() {
                audit.record_once(
                    AnomalyKind::UnmatchedCounterParty,
                    record.counter_party.as_str(),
                    "no metadata match; tier left empty",
                );
            }
            JoinedRecord {
                legal_entity: record.legal_entity.clone(),
                counter_party: record.counter_party.clone(),
                tier,
                status: record.status.clone(),
                value: record.value,
                rating: record.rating,
            }
        })
        .collect()
}
