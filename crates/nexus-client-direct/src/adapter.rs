use std::fmt;
use std::sync::Arc;

use nexus_client_core::{
    sort_tables, DirectConfig, OperationError, OperationResult, QueryResult, Row, TableInfo,
};
use nexus_client_query::generate::{self, LIST_TABLES_SQL, PING_SQL};
use nexus_client_query::{
    build_sql_fragment, build_typed_fragment, column_types, PageRequest, Predicate, SortKey,
    SqlStatement, TableColumns,
};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::gateway::SqlGateway;

/// Adapter for a direct PostgreSQL connection.
///
/// Every operation becomes parameterized SQL sent through a [`SqlGateway`].
/// Statements touching a table first read its column types, so values are
/// sent as text and cast to each column's type on the server. Input is
/// checked before that lookup; a rejected call sends nothing.
#[derive(Clone)]
pub struct DirectAdapter {
    gateway: Arc<dyn SqlGateway>,
}

impl fmt::Debug for DirectAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectAdapter").finish_non_exhaustive()
    }
}

impl DirectAdapter {
    pub fn new(gateway: Arc<dyn SqlGateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<dyn SqlGateway> {
        &self.gateway
    }

    async fn run(&self, stmt: SqlStatement) -> OperationResult<Vec<Row>> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "Sending statement to SQL gateway");
        self.gateway
            .query(stmt.into())
            .await
            .into_result()
            .map_err(OperationError::from)
    }

    /// Column types of `table`. Empty when the table is not in the catalog,
    /// in which case statements fall back to inferred parameter types.
    async fn table_columns(&self, table: &str) -> OperationResult<TableColumns> {
        let rows = self.run(column_types(table)?).await?;
        let columns = TableColumns::from_rows(&rows);
        debug!(table, columns = columns.iter().count(), "Column types loaded");
        Ok(columns)
    }

    /// Public tables and views, sorted by name.
    pub async fn list_tables(&self) -> OperationResult<Vec<TableInfo>> {
        let rows = self.run(SqlStatement::raw(LIST_TABLES_SQL)).await?;
        let mut tables: Vec<TableInfo> = rows.iter().map(table_info_from_row).collect();
        sort_tables(&mut tables);
        Ok(tables)
    }

    /// One page plus the filtered row count.
    ///
    /// Page and count are two separate statements outside a transaction, so a
    /// concurrent write can make them disagree slightly.
    pub async fn fetch_page(
        &self,
        request: &PageRequest,
        predicates: &[Predicate],
        sort: Option<&SortKey>,
    ) -> OperationResult<QueryResult> {
        build_sql_fragment(predicates, sort)?;
        let columns = self.table_columns(request.table()).await?;
        let fragment = build_typed_fragment(predicates, sort, 1, &columns)?;
        let page = generate::select_page(request, &fragment, &columns)?;
        let count = generate::count_rows(request.table(), &fragment)?;

        let rows = self.run(page).await?;
        let count_rows = self.run(count).await?;
        let total = count_rows.first().and_then(|row| row_total(row.get_value("total")));
        Ok(QueryResult::new(rows, total))
    }

    pub async fn update_cell(
        &self,
        table: &str,
        row_id: &JsonValue,
        column: &str,
        value: JsonValue,
    ) -> OperationResult<()> {
        generate::update_cell(table, row_id, column, &value, &TableColumns::default())?;
        let columns = self.table_columns(table).await?;
        let stmt = generate::update_cell(table, row_id, column, &value, &columns)?;
        self.run(stmt).await?;
        Ok(())
    }

    pub async fn delete_rows(&self, table: &str, ids: &[JsonValue]) -> OperationResult<()> {
        if generate::delete_rows(table, ids, &TableColumns::default())?.is_none() {
            return Ok(());
        }
        let columns = self.table_columns(table).await?;
        if let Some(stmt) = generate::delete_rows(table, ids, &columns)? {
            self.run(stmt).await?;
        }
        Ok(())
    }

    /// Insert rows and return them as stored.
    pub async fn insert_rows(&self, table: &str, rows: &[Row]) -> OperationResult<Vec<Row>> {
        if generate::insert_rows(table, rows, &TableColumns::default())?.is_none() {
            return Ok(Vec::new());
        }
        let columns = self.table_columns(table).await?;
        match generate::insert_rows(table, rows, &columns)? {
            Some(stmt) => self.run(stmt).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn run_raw_query(&self, sql: &str) -> OperationResult<Vec<Row>> {
        self.run(SqlStatement::raw(sql)).await
    }

    pub async fn check_connection(&self) -> OperationResult<()> {
        self.run(SqlStatement::raw(PING_SQL)).await?;
        Ok(())
    }

    /// Reconnect the gateway with new credentials.
    pub async fn connect(&self, config: DirectConfig) -> OperationResult<()> {
        self.gateway
            .connect(config)
            .await
            .map_err(OperationError::from)
    }
}

/// Tolerant of missing columns: absent sizes and ids become 0.
fn table_info_from_row(row: &Row) -> TableInfo {
    TableInfo {
        id: Some(row.get_as::<i64>("id").unwrap_or(0)),
        schema: row.get_as("schema").unwrap_or_default(),
        name: row.get_as("name").unwrap_or_default(),
        table_type: row.get_as("type"),
        bytes: row.get_as("bytes").unwrap_or(0),
        live_rows_estimate: row.get_as("live_rows_estimate").unwrap_or(0),
    }
}

/// `count(*)` is bigint; it may arrive as a number or as text.
fn row_total(value: Option<&JsonValue>) -> Option<u64> {
    match value? {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}
