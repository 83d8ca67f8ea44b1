//! Source-level permission grants.
//!
//! [`SourcePermissions`] describes what a user may read from one data
//! source, as granted by the source system itself (or by an administrator
//! mirroring it): which tables, which columns per table, and any native
//! row filters the source applies on its side. Policies then narrow these
//! grants; they never widen them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// What a user may read from a single data source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePermissions {
    readable_tables: BTreeSet<String>,
    table_columns: BTreeMap<String, BTreeSet<String>>,
    /// Filters the source applies natively, keyed by table. Informational
    /// only: they are recorded for audit but never parsed or re-applied.
    native_row_filters: BTreeMap<String, String>,
}

impl SourcePermissions {
    /// Creates an empty grant: no tables readable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants read access to a table with the given columns (builder
    /// pattern). An empty column list means "no column restriction".
    pub fn with_table<I, S>(mut self, table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let table = table.into();
        self.readable_tables.insert(table.clone());
        self.table_columns
            .insert(table, columns.into_iter().map(Into::into).collect());
        self
    }

    /// Records a filter the source applies natively (builder pattern).
    pub fn with_native_filter(
        mut self,
        table: impl Into<String>,
        filter: impl Into<String>,
    ) -> Self {
        self.native_row_filters.insert(table.into(), filter.into());
        self
    }

    /// A grant covering exactly one table with the given columns.
    ///
    /// Used when no explicit grant exists for a source and the engine
    /// falls back to permitting what the caller asked for.
    pub fn permissive<I, S>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new().with_table(table, columns)
    }

    pub fn can_read_table(&self, table: &str) -> bool {
        self.readable_tables.contains(table)
    }

    pub fn can_read_column(&self, table: &str, column: &str) -> bool {
        self.table_columns
            .get(table)
            .is_some_and(|columns| columns.contains(column))
    }

    /// The column grant for a table, if one is recorded.
    pub fn columns_for_table(&self, table: &str) -> Option<&BTreeSet<String>> {
        self.table_columns.get(table)
    }

    pub fn native_filter_for_table(&self, table: &str) -> Option<&str> {
        self.native_row_filters.get(table).map(String::as_str)
    }

    pub fn readable_tables(&self) -> &BTreeSet<String> {
        &self.readable_tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_grant_reads_nothing() {
        let permissions = SourcePermissions::new();
        assert!(!permissions.can_read_table("issues"));
        assert!(permissions.columns_for_table("issues").is_none());
    }

    #[test]
    fn test_table_and_column_grants() {
        let permissions = SourcePermissions::new()
            .with_table("issues", ["id", "title", "assignee"])
            .with_table("pulls", Vec::<String>::new());

        assert!(permissions.can_read_table("issues"));
        assert!(permissions.can_read_table("pulls"));
        assert!(!permissions.can_read_table("repositories"));

        assert!(permissions.can_read_column("issues", "title"));
        assert!(!permissions.can_read_column("issues", "email"));
        // Empty column set: recorded, but grants no specific column.
        assert!(!permissions.can_read_column("pulls", "title"));
        assert_eq!(
            permissions.columns_for_table("pulls").map(BTreeSet::len),
            Some(0)
        );
    }

    #[test]
    fn test_permissive_grant_covers_requested_shape() {
        let permissions = SourcePermissions::permissive("issues", ["id", "title"]);
        assert!(permissions.can_read_table("issues"));
        assert!(permissions.can_read_column("issues", "id"));
        assert!(!permissions.can_read_table("pulls"));
    }

    #[test]
    fn test_native_filters_are_recorded_verbatim() {
        let permissions = SourcePermissions::new()
            .with_table("issues", ["id"])
            .with_native_filter("issues", "project = 'PROJ1'");
        assert_eq!(
            permissions.native_filter_for_table("issues"),
            Some("project = 'PROJ1'")
        );
        assert_eq!(permissions.native_filter_for_table("pulls"), None);
    }
}
