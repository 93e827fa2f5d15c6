#![forbid(unsafe_code)]

use std::collections::{HashMap, HashSet};
use std::mem::size_of;

use bumpalo::{collections::Vec as BumpVec, Bump};
use lr_model::{Dimension, JoinedRecord, Status};
use thiserror::Error;

/// Rating reported for a partition with no eligible (non-null) ratings.
///
/// This follows the reference report's `fill_value=0` convention, which
/// conflates "no rating data" with an actual rating of 0. Documented rather
/// than fixed: consumers of the report rely on it.
pub const MAX_RATING_FILL: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollupOptions {
    /// Exclude records whose value for any grouping dimension is null
    /// (pandas semantics). When `false`, the null forms its own group.
    pub dropna: bool,
}

impl Default for RollupOptions {
    fn default() -> Self {
        Self { dropna: true }
    }
}

#[derive(Debug, Error)]
pub enum RollupError {
    #[error("invalid group columns: {detail}")]
    InvalidGroupColumns { detail: String },
}

pub const DEFAULT_ARENA_BUDGET_BYTES: usize = 256 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollupExecutionOptions {
    pub use_arena: bool,
    pub arena_budget_bytes: usize,
}

impl Default for RollupExecutionOptions {
    fn default() -> Self {
        Self {
            use_arena: true,
            arena_budget_bytes: DEFAULT_ARENA_BUDGET_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RollupExecutionTrace {
    used_arena: bool,
    input_rows: usize,
    estimated_bytes: usize,
}

/// Aggregates for one distinct group-key tuple. Carries its originating
/// grouping dimensions so downstream reshaping is an explicit projection
/// instead of positional column alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct RollupRow {
    pub dims: Vec<Dimension>,
    /// Key values aligned with `dims`. A slot is `None` only for a null
    /// group kept by `dropna = false`.
    pub key: Vec<Option<String>>,
    /// Distinct counts for every dimension not in `dims`, in canonical
    /// dimension order.
    pub distinct_counts: Vec<(Dimension, usize)>,
    pub max_rating: i64,
    pub sum_value_arap: f64,
    pub sum_value_accr: f64,
}

impl RollupRow {
    /// Key value for a grouping dimension; `None` when the dimension is not
    /// part of this rollup's key or the kept group is the null group.
    #[must_use]
    pub fn key_value(&self, dim: Dimension) -> Option<&str> {
        self.dims
            .iter()
            .position(|key_dim| *key_dim == dim)
            .and_then(|pos| self.key[pos].as_deref())
    }

    /// Distinct count for a non-key dimension.
    #[must_use]
    pub fn distinct_count(&self, dim: Dimension) -> Option<usize> {
        self.distinct_counts
            .iter()
            .find(|(count_dim, _)| *count_dim == dim)
            .map(|(_, count)| *count)
    }
}

/// Sum of `value` over records matching the status filter; every other
/// record contributes 0. Sums are signed.
#[must_use]
pub fn conditional_sum<'a, I>(records: I, status_filter: &Status) -> f64
where
    I: IntoIterator<Item = &'a JoinedRecord>,
{
    records
        .into_iter()
        .filter(|record| record.status == *status_filter)
        .map(|record| record.value)
        .sum()
}

/// Count of unique non-null values of a dimension. A missing tier is not a
/// value and does not count.
#[must_use]
pub fn distinct_count<'a, I>(records: I, dim: Dimension) -> usize
where
    I: IntoIterator<Item = &'a JoinedRecord>,
{
    let mut seen = HashSet::new();
    for record in records {
        if let Some(value) = record.dimension(dim) {
            seen.insert(value);
        }
    }
    seen.len()
}

pub fn rollup(
    records: &[JoinedRecord],
    group_dims: &[Dimension],
    options: RollupOptions,
) -> Result<Vec<RollupRow>, RollupError> {
    rollup_with_options(records, group_dims, options, RollupExecutionOptions::default())
}

pub fn rollup_with_options(
    records: &[JoinedRecord],
    group_dims: &[Dimension],
    options: RollupOptions,
    exec_options: RollupExecutionOptions,
) -> Result<Vec<RollupRow>, RollupError> {
    let (rows, _trace) = rollup_with_trace(records, group_dims, options, exec_options)?;
    Ok(rows)
}

fn rollup_with_trace(
    records: &[JoinedRecord],
    group_dims: &[Dimension],
    options: RollupOptions,
    exec_options: RollupExecutionOptions,
) -> Result<(Vec<RollupRow>, RollupExecutionTrace), RollupError> {
    validate_group_dims(group_dims)?;

    let input_rows = records.len();
    let estimated_bytes = estimate_rollup_intermediate_bytes(input_rows);
    let use_arena = exec_options.use_arena && estimated_bytes <= exec_options.arena_budget_bytes;

    let rows = if use_arena {
        rollup_with_arena(records, group_dims, options)
    } else {
        rollup_with_global_allocator(records, group_dims, options)
    };

    Ok((
        rows,
        RollupExecutionTrace {
            used_arena: use_arena,
            input_rows,
            estimated_bytes,
        },
    ))
}

fn validate_group_dims(group_dims: &[Dimension]) -> Result<(), RollupError> {
    if group_dims.is_empty() {
        return Err(RollupError::InvalidGroupColumns {
            detail: "group columns must not be empty".to_owned(),
        });
    }
    for (pos, dim) in group_dims.iter().enumerate() {
        if group_dims[..pos].contains(dim) {
            return Err(RollupError::InvalidGroupColumns {
                detail: format!("duplicate group column: {}", dim.as_str()),
            });
        }
    }
    Ok(())
}

/// Estimate intermediate memory for partitioning: every admitted row lands in
/// one position list, plus per-group ordering and map-slot overhead.
fn estimate_rollup_intermediate_bytes(input_rows: usize) -> usize {
    input_rows.saturating_mul(
        size_of::<usize>()
            .saturating_add(size_of::<GroupKeyRef<'static>>())
            .saturating_add(64),
    )
}

/// One slot of a borrowed group key. `Absent` pads positions past the
/// grouping arity so the key stays a fixed-size, hashable array; `Missing`
/// is a null dimension value kept by `dropna = false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum KeySlot<'a> {
    Absent,
    Missing,
    Present(&'a str),
}

// Borrowed-key map slots eliminate per-row key clones during the build
// phase; owned strings are produced once per group at emit time.
type GroupKeyRef<'a> = [KeySlot<'a>; 3];

fn group_key_ref<'a>(
    record: &'a JoinedRecord,
    group_dims: &[Dimension],
    options: RollupOptions,
) -> Option<GroupKeyRef<'a>> {
    let mut key = [KeySlot::Absent; 3];
    for (pos, dim) in group_dims.iter().enumerate() {
        key[pos] = match record.dimension(*dim) {
            Some(value) => KeySlot::Present(value),
            None if options.dropna => return None,
            None => KeySlot::Missing,
        };
    }
    Some(key)
}

fn rollup_with_global_allocator(
    records: &[JoinedRecord],
    group_dims: &[Dimension],
    options: RollupOptions,
) -> Vec<RollupRow> {
    let mut slot = HashMap::<GroupKeyRef<'_>, usize>::new();
    let mut ordering = Vec::<GroupKeyRef<'_>>::new();
    let mut partitions = Vec::<Vec<usize>>::new();

    for (pos, record) in records.iter().enumerate() {
        let Some(key) = group_key_ref(record, group_dims, options) else {
            continue;
        };
        let group = *slot.entry(key).or_insert_with(|| {
            ordering.push(key);
            partitions.push(Vec::new());
            partitions.len() - 1
        });
        partitions[group].push(pos);
    }

    ordering
        .iter()
        .zip(&partitions)
        .map(|(key, positions)| reduce_partition(records, key, positions, group_dims))
        .collect()
}

fn rollup_with_arena(
    records: &[JoinedRecord],
    group_dims: &[Dimension],
    options: RollupOptions,
) -> Vec<RollupRow> {
    // Partition intermediates live in the arena and are freed in bulk when
    // the arena drops; only the emitted rows are long-lived allocations.
    let arena = Bump::new();
    let mut slot = HashMap::<GroupKeyRef<'_>, usize>::new();
    let mut ordering = BumpVec::<GroupKeyRef<'_>>::new_in(&arena);
    let mut partitions = Vec::<BumpVec<'_, usize>>::new();

    for (pos, record) in records.iter().enumerate() {
        let Some(key) = group_key_ref(record, group_dims, options) else {
            continue;
        };
        let group = *slot.entry(key).or_insert_with(|| {
            ordering.push(key);
            partitions.push(BumpVec::new_in(&arena));
            partitions.len() - 1
        });
        partitions[group].push(pos);
    }

    ordering
        .iter()
        .zip(&partitions)
        .map(|(key, positions)| reduce_partition(records, key, positions.as_slice(), group_dims))
        .collect()
}

fn reduce_partition(
    records: &[JoinedRecord],
    key: &GroupKeyRef<'_>,
    positions: &[usize],
    group_dims: &[Dimension],
) -> RollupRow {
    let members = || positions.iter().map(|&pos| &records[pos]);

    let distinct_counts = Dimension::ALL
        .iter()
        .copied()
        .filter(|dim| !group_dims.contains(dim))
        .map(|dim| (dim, distinct_count(members(), dim)))
        .collect();

    let max_rating = members()
        .filter_map(|record| record.rating)
        .max()
        .unwrap_or(MAX_RATING_FILL);

    RollupRow {
        dims: group_dims.to_vec(),
        key: key[..group_dims.len()]
            .iter()
            .map(|slot| match slot {
                KeySlot::Present(value) => Some((*value).to_owned()),
                KeySlot::Missing | KeySlot::Absent => None,
            })
            .collect(),
        distinct_counts,
        max_rating,
        sum_value_arap: conditional_sum(members(), &Status::Arap),
        sum_value_accr: conditional_sum(members(), &Status::Accr),
    }
}
