use serde::{Deserialize, Serialize};

use crate::value::Row;

/// One page of table rows plus the total number of rows matching the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub total_count: u64,
}

impl QueryResult {
    /// Build a page result from the rows and the backend's exact count, if any.
    ///
    /// Without an exact count the total degrades to the page length. The total
    /// never drops below the number of rows actually returned.
    pub fn new(rows: Vec<Row>, exact_count: Option<u64>) -> Self {
        let len = rows.len() as u64;
        let total_count = exact_count.map_or(len, |count| count.max(len));
        Self { rows, total_count }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// A table or view as reported by the metadata layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub schema: String,
    pub name: String,
    #[serde(default, rename = "type", alias = "table_type")]
    pub table_type: Option<String>,
    #[serde(default)]
    pub bytes: i64,
    #[serde(default)]
    pub live_rows_estimate: i64,
}

/// Sort tables by name, the order every table list is presented in.
pub fn sort_tables(tables: &mut [TableInfo]) {
    tables.sort_by(|a, b| a.name.cmp(&b.name));
}
