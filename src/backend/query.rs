//! Row query builder for table reads.
//!
//! Mirrors the subset of PostgREST reads the handlers need: one table, a
//! column projection and equality filters joined with AND.
//!
//! ```ignore
//! let query = RowQuery::from("tickets")
//!     .select("id, status, updated_at")
//!     .eq("id", ticket_id);
//! ```

/// A read against a single table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowQuery {
    table: String,
    columns: String,
    filters: Vec<(String, String)>,
}

impl RowQuery {
    /// Start a query against `table`, selecting all columns.
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
        }
    }

    /// Set the comma separated column projection.
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    /// Add an equality filter.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &str {
        &self.columns
    }

    pub fn filters(&self) -> &[(String, String)] {
        &self.filters
    }

    /// Projected column names with surrounding whitespace removed.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Query string pairs in PostgREST form (`select=..`, `col=eq.value`).
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.filters.len() + 1);
        let compact: Vec<&str> = self.column_names().collect();
        pairs.push(("select".to_string(), compact.join(",")));
        for (column, value) in &self.filters {
            pairs.push((column.clone(), format!("eq.{}", value)));
        }
        pairs
    }
}
