//! Query types for bulk retrieval

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Largest page the platform will serve in one response
pub const DEFAULT_PAGE_SIZE: u32 = 5000;

/// Which columns to return
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnSet {
    /// Every column of the entity
    All,
    /// Only the named columns
    Columns(Vec<String>),
}

impl ColumnSet {
    pub fn columns<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ColumnSet::Columns(names.into_iter().map(Into::into).collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, ColumnSet::All)
    }
}

impl Default for ColumnSet {
    fn default() -> Self {
        ColumnSet::All
    }
}

/// Page request: how many records per page and which page (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingInfo {
    pub count: u32,
    pub page_number: u32,
}

impl Default for PagingInfo {
    fn default() -> Self {
        Self {
            count: DEFAULT_PAGE_SIZE,
            page_number: 1,
        }
    }
}

/// A query scoped to one entity kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryExpression {
    pub entity_name: String,
    pub column_set: ColumnSet,
    pub page_info: PagingInfo,
}

impl QueryExpression {
    /// All columns, default page size, first page
    pub fn new(entity_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            column_set: ColumnSet::All,
            page_info: PagingInfo::default(),
        }
    }

    pub fn with_columns(mut self, column_set: ColumnSet) -> Self {
        self.column_set = column_set;
        self
    }

    /// Sets the page size; zero is raised to one
    pub fn with_page_size(mut self, count: u32) -> Self {
        self.page_info.count = count.max(1);
        self
    }
}

/// One page of results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityCollection {
    pub entity_name: String,
    pub entities: Vec<Record>,
    /// Set by the platform while further pages remain
    pub more_records: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let query = QueryExpression::new("contact");
        assert!(query.column_set.is_all());
        assert_eq!(query.page_info.count, 5000);
        assert_eq!(query.page_info.page_number, 1);
    }

    #[test]
    fn test_page_size_floor() {
        let query = QueryExpression::new("contact").with_page_size(0);
        assert_eq!(query.page_info.count, 1);
    }
}
