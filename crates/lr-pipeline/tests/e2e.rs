#![forbid(unsafe_code)]

//! End-to-end scenarios over the full pipeline: CSV text in, unified report
//! CSV out.

use lr_audit::{AnomalyKind, DuplicateKeep};
use lr_pipeline::{run_report, PipelineOptions, ReportOutcome};
use lr_report::ReportRow;

const HEADER: &str = "legal_entity,counter_party,tier,max(rating by counterparty),\
sum(value where status=ARAP),sum(value where status=ACCR)";

fn run(ledger: &str, counterparties: &str) -> ReportOutcome {
    run_report(ledger, counterparties, &PipelineOptions::default()).expect("pipeline run")
}

// ---------------------------------------------------------------------------
// Scenario 1: the reference two-row ledger
// ---------------------------------------------------------------------------

#[test]
fn e2e_reference_scenario_counter_party_rollup() {
    let outcome = run(
        "legal_entity,counter_party,status,value,rating\n\
         A,X,ARAP,100,5\n\
         A,X,ACCR,30,2\n",
        "counter_party,tier\nX,T1\n",
    );

    let x_row = outcome
        .rows
        .iter()
        .find(|row| row.counter_party.as_deref() == Some("X") && row.legal_entity.is_none())
        .expect("counter_party rollup row");
    assert_eq!(x_row.max_rating, 5);
    assert_eq!(x_row.sum_value_arap, 100.0);
    assert_eq!(x_row.sum_value_accr, 30.0);
    assert_eq!(x_row.tier, None);

    // One group per rollup; exact output, concatenation order fixed.
    let lines: Vec<&str> = outcome.csv.lines().collect();
    assert_eq!(
        lines,
        vec![
            HEADER,
            ",X,,5,100,30",
            "A,,,5,100,30",
            ",,T1,5,100,30",
            "A,X,,5,100,30",
        ]
    );
}

// ---------------------------------------------------------------------------
// Scenario 2: unmatched counter-party still contributes
// ---------------------------------------------------------------------------

#[test]
fn e2e_unmatched_counter_party_contributes_to_non_tier_rollups() {
    let outcome = run(
        "legal_entity,counter_party,status,value,rating\n\
         A,X,ARAP,100,5\n\
         A,Q,ARAP,50,3\n",
        "counter_party,tier\nX,T1\n",
    );

    // The legal_entity rollup sees both records.
    let a_row = outcome
        .rows
        .iter()
        .find(|row| row.legal_entity.as_deref() == Some("A") && row.counter_party.is_none())
        .expect("legal_entity rollup row");
    assert_eq!(a_row.sum_value_arap, 150.0);

    // The tier rollup drops the null-tier record under default options.
    let tier_rows: Vec<&ReportRow> = outcome
        .rows
        .iter()
        .filter(|row| row.tier.is_some())
        .collect();
    assert_eq!(tier_rows.len(), 1);
    assert_eq!(tier_rows[0].sum_value_arap, 100.0);

    // The unmatched key renders with the empty marker in the pair rollup.
    assert!(outcome.csv.lines().any(|line| line == "A,Q,,3,50,0"));
    assert_eq!(outcome.anomalies.count_of(AnomalyKind::UnmatchedCounterParty), 1);
}

#[test]
fn e2e_keep_nulls_gives_the_unmatched_tier_a_group() {
    let mut options = PipelineOptions::default();
    options.report.rollup.dropna = false;

    let outcome = run_report(
        "legal_entity,counter_party,status,value,rating\n\
         A,X,ARAP,100,5\n\
         A,Q,ARAP,50,3\n",
        "counter_party,tier\nX,T1\n",
        &options,
    )
    .expect("pipeline run");

    // Tier segment now has T1 plus the null group, rendered empty.
    assert!(outcome.csv.lines().any(|line| line == ",,,3,50,0"));
}

// ---------------------------------------------------------------------------
// Scenario 3: degenerate inputs
// ---------------------------------------------------------------------------

#[test]
fn e2e_zero_rows_yield_header_only() {
    let outcome = run(
        "legal_entity,counter_party,status,value,rating\n",
        "counter_party,tier\n",
    );
    assert!(outcome.rows.is_empty());
    assert_eq!(outcome.csv.lines().collect::<Vec<_>>(), vec![HEADER]);
}

#[test]
fn e2e_unknown_status_is_excluded_but_recorded() {
    let outcome = run(
        "legal_entity,counter_party,status,value,rating\n\
         A,X,ARAP,10,1\n\
         A,X,HELD,999,1\n",
        "counter_party,tier\nX,T1\n",
    );

    let x_row = outcome
        .rows
        .iter()
        .find(|row| row.counter_party.as_deref() == Some("X") && row.legal_entity.is_none())
        .expect("counter_party rollup row");
    // The HELD row is in the partition (its rating counts) but in neither sum.
    assert_eq!(x_row.sum_value_arap, 10.0);
    assert_eq!(x_row.sum_value_accr, 0.0);
    assert_eq!(outcome.anomalies.count_of(AnomalyKind::UnknownStatus), 1);
}

// ---------------------------------------------------------------------------
// Scenario 4: duplicate counter-party metadata
// ---------------------------------------------------------------------------

#[test]
fn e2e_duplicate_metadata_keys_resolve_deterministically() {
    let ledger = "legal_entity,counter_party,status,value,rating\nA,X,ARAP,10,1\n";
    let counterparties = "counter_party,tier\nX,T1\nX,T2\n";

    let last = run(ledger, counterparties);
    assert!(last.csv.lines().any(|line| line == ",,T2,1,10,0"));
    assert_eq!(
        last.anomalies.count_of(AnomalyKind::DuplicateCounterParty),
        1
    );

    let mut options = PipelineOptions::default();
    options.join.duplicate_keep = DuplicateKeep::First;
    let first = run_report(ledger, counterparties, &options).expect("pipeline run");
    assert!(first.csv.lines().any(|line| line == ",,T1,1,10,0"));

    // Row-preserving either way.
    assert_eq!(last.rows.len(), first.rows.len());
}

// ---------------------------------------------------------------------------
// Scenario 5: totals option
// ---------------------------------------------------------------------------

#[test]
fn e2e_totals_option_appends_distinct_count_columns() {
    let mut options = PipelineOptions::default();
    options.report.include_totals = true;

    let outcome = run_report(
        "legal_entity,counter_party,status,value,rating\n\
         A,X,ARAP,100,5\n\
         A,Y,ACCR,30,2\n\
         B,X,ARAP,1,4\n",
        "counter_party,tier\nX,T1\nY,T2\n",
        &options,
    )
    .expect("pipeline run");

    let header = outcome.csv.lines().next().expect("header");
    assert_eq!(
        header,
        format!(
            "{HEADER},count(distinct legal_entity),count(distinct counter_party),\
count(distinct tier)"
        )
    );

    // legal_entity=A groups counter-parties X and Y over tiers T1 and T2;
    // its own key column has no count.
    assert!(outcome.csv.lines().any(|line| line == "A,,,5,100,30,,2,2"));
}
