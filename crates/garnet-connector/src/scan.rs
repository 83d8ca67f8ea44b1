//! The scan pipeline shared by every in-memory connector.
//!
//! Order is fixed: predicates, then projection, then pagination. The
//! mocks hold full datasets in memory, so "pushdown" here is simply
//! evaluating the neutral predicate form against each row.

use garnet_types::{Filter, Row};

use crate::capabilities::{RowPage, ScanRequest};

const DEFAULT_PAGE_SIZE: usize = 100;

/// Runs the full pipeline over a resource's rows.
pub fn scan_rows(rows: Vec<Row>, request: &ScanRequest) -> RowPage {
    let filtered = apply_predicates(rows, &request.predicates);
    let projected = apply_projection(filtered, &request.columns);
    paginate(projected, request.limit, request.page_token.as_deref())
}

/// Keeps rows matching every predicate. A missing or null column never
/// matches (see `Filter::matches`).
fn apply_predicates(rows: Vec<Row>, predicates: &[Filter]) -> Vec<Row> {
    if predicates.is_empty() {
        return rows;
    }
    rows.into_iter()
        .filter(|row| predicates.iter().all(|predicate| predicate.matches(row)))
        .collect()
}

/// Drops columns outside the projection. An empty list or a `*` entry
/// leaves every column in place; projected columns absent from a row are
/// simply skipped.
fn apply_projection(rows: Vec<Row>, columns: &[String]) -> Vec<Row> {
    if columns.is_empty() || columns.iter().any(|column| column == "*") {
        return rows;
    }
    rows.into_iter()
        .map(|mut row| {
            row.retain(|column, _| columns.iter().any(|kept| kept == column));
            row
        })
        .collect()
}

/// Index-based pagination. The token is the start index; an unparsable
/// token restarts from zero, and a start past the end yields an empty
/// final page.
fn paginate(rows: Vec<Row>, limit: Option<u32>, page_token: Option<&str>) -> RowPage {
    let start = page_token
        .and_then(|token| token.parse::<usize>().ok())
        .unwrap_or(0)
        .min(rows.len());
    let page_size = match limit {
        Some(limit) if limit > 0 => limit as usize,
        _ => DEFAULT_PAGE_SIZE,
    };
    let end = (start + page_size).min(rows.len());

    let next_page_token = (end < rows.len()).then(|| end.to_string());
    RowPage {
        rows: rows[start..end].to_vec(),
        next_page_token,
        freshness_ms: 0,
    }
}

// ============================================================================
// Tests
// ============================================================================
