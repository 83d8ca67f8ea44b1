//! Row-level post-processing helpers.
//!
//! Connectors are expected to push filters down; these helpers cover the
//! rest — connectors that cannot push a predicate, and masking, which is
//! always applied gateway-side so plaintext never leaves the pipeline.

use std::collections::BTreeMap;

use garnet_policy::{MaskKind, RowFilter};
use garnet_types::Row;

/// Keeps the rows satisfying every filter.
///
/// A row missing the filter column (or holding null there) fails that
/// filter and is excluded.
pub fn apply_row_filters(rows: Vec<Row>, filters: &[RowFilter]) -> Vec<Row> {
    if filters.is_empty() {
        return rows;
    }
    let predicates: Vec<_> = filters.iter().map(RowFilter::to_predicate).collect();
    rows.into_iter()
        .filter(|row| predicates.iter().all(|predicate| predicate.matches(row)))
        .collect()
}

/// Replaces masked-column values via each mask's transform.
///
/// Rows without the masked column pass through untouched; the mask is a
/// value transform, not a schema change.
pub fn apply_column_masks(rows: Vec<Row>, masks: &BTreeMap<String, MaskKind>) -> Vec<Row> {
    if masks.is_empty() {
        return rows;
    }
    rows.into_iter()
        .map(|mut row| {
            for (column, mask) in masks {
                if let Some(value) = row.get_mut(column) {
                    *value = mask.mask(value);
                }
            }
            row
        })
        .collect()
}
