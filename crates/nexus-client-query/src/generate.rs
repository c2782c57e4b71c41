use nexus_client_core::{OperationError, OperationResult, Row};
use serde_json::Value as JsonValue;

use crate::columns::TableColumns;
use crate::filter::{PageRequest, Predicate, SortKey};
use crate::import::ColumnDef;
use crate::sql::{quote_identifier, validate_identifier, ParamStore, SqlParam};

/// Public tables and views with their oid, row estimate and on-disk size.
pub const LIST_TABLES_SQL: &str = "SELECT \
    COALESCE(c.oid::int8, 0) AS id, \
    t.table_schema::text AS schema, \
    t.table_name::text AS name, \
    t.table_type::text AS type, \
    COALESCE(pg_total_relation_size(c.oid), 0)::int8 AS bytes, \
    COALESCE(GREATEST(c.reltuples, 0), 0)::int8 AS live_rows_estimate \
FROM information_schema.tables t \
LEFT JOIN pg_catalog.pg_namespace n ON n.nspname = t.table_schema \
LEFT JOIN pg_catalog.pg_class c ON c.relname = t.table_name AND c.relnamespace = n.oid \
WHERE t.table_schema = 'public' AND t.table_type IN ('BASE TABLE', 'VIEW') \
ORDER BY t.table_name";

/// Connectivity check.
pub const PING_SQL: &str = "SELECT 1";

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl SqlStatement {
    pub fn new(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// A statement without parameters, such as a raw query from the editor.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }
}

/// WHERE / ORDER BY pieces built from structured predicates.
///
/// Both clauses are empty strings when absent and carry their keyword when
/// present, so they can be appended verbatim with a leading space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFragment {
    pub where_clause: String,
    pub order_by: String,
    pub where_params: Vec<SqlParam>,
    pub sort: Option<SortKey>,
}

/// Translate predicates and sort into SQL, numbering placeholders from `$1`.
pub fn build_sql_fragment(
    predicates: &[Predicate],
    sort: Option<&SortKey>,
) -> OperationResult<SqlFragment> {
    build_sql_fragment_from(predicates, sort, 1)
}

/// Translate predicates and sort into SQL, numbering placeholders from `$first`.
///
/// Only `eq`, `neq`, `gt`, `lt`, `gte` and `lte` translate. Values are always
/// bound; the only interpolated text is a validated, quoted identifier.
pub fn build_sql_fragment_from(
    predicates: &[Predicate],
    sort: Option<&SortKey>,
    first: usize,
) -> OperationResult<SqlFragment> {
    build_typed_fragment(predicates, sort, first, &TableColumns::default())
}

/// Like [`build_sql_fragment_from`], casting each value to its column's type.
pub fn build_typed_fragment(
    predicates: &[Predicate],
    sort: Option<&SortKey>,
    first: usize,
    columns: &TableColumns,
) -> OperationResult<SqlFragment> {
    let mut params = ParamStore::starting_at(first);
    let mut conditions = Vec::with_capacity(predicates.len());

    for predicate in predicates {
        let op = predicate.operator().as_sql().ok_or_else(|| {
            OperationError::translation_unsupported(format!(
                "The '{}' filter on {:?} cannot be run over a direct connection",
                predicate.operator().as_rest(),
                predicate.column()
            ))
        })?;
        let column = quote_identifier(predicate.column(), "Column")?;
        let slot = columns.bind(
            &mut params,
            predicate.column(),
            &JsonValue::String(predicate.value().to_string()),
            SqlParam::infer(predicate.value()),
        );
        conditions.push(format!("{column} {op} {slot}"));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let order_by = match sort {
        Some(sort) => format!(
            "ORDER BY {} {}",
            quote_identifier(sort.column(), "Sort column")?,
            sort.direction().as_sql()
        ),
        None => String::new(),
    };

    Ok(SqlFragment {
        where_clause,
        order_by,
        where_params: params.into_params(),
        sort: sort.cloned(),
    })
}

fn append_clause(sql: &mut String, clause: &str) {
    if !clause.is_empty() {
        sql.push(' ');
        sql.push_str(clause);
    }
}

/// `SELECT <columns> FROM "t"[ WHERE ..][ ORDER BY ..] LIMIT n OFFSET m`
///
/// With known columns the sort is qualified by the table, so it orders by the
/// stored value rather than a `to_jsonb` output column of the same name.
pub fn select_page(
    request: &PageRequest,
    fragment: &SqlFragment,
    columns: &TableColumns,
) -> OperationResult<SqlStatement> {
    let table = quote_identifier(request.table(), "Table")?;
    let mut sql = format!("SELECT {} FROM {table}", columns.select_list());
    append_clause(&mut sql, &fragment.where_clause);
    match &fragment.sort {
        Some(sort) if !columns.is_empty() => append_clause(
            &mut sql,
            &format!(
                "ORDER BY {table}.{} {}",
                quote_identifier(sort.column(), "Sort column")?,
                sort.direction().as_sql()
            ),
        ),
        _ => append_clause(&mut sql, &fragment.order_by),
    }
    sql.push_str(&format!(" LIMIT {} OFFSET {}", request.limit(), request.offset()));
    Ok(SqlStatement::new(sql, fragment.where_params.clone()))
}

/// `SELECT count(*) AS total FROM "t"[ WHERE ..]`
pub fn count_rows(table: &str, fragment: &SqlFragment) -> OperationResult<SqlStatement> {
    let mut sql = format!(
        "SELECT count(*) AS total FROM {}",
        quote_identifier(table, "Table")?
    );
    append_clause(&mut sql, &fragment.where_clause);
    Ok(SqlStatement::new(sql, fragment.where_params.clone()))
}

fn id_slot(params: &mut ParamStore, row_id: &JsonValue, columns: &TableColumns) -> String {
    columns.bind(params, "id", row_id, SqlParam::from_row_id(row_id))
}

/// `UPDATE "t" SET "c" = $1 WHERE id = $2`
pub fn update_cell(
    table: &str,
    row_id: &JsonValue,
    column: &str,
    value: &JsonValue,
    columns: &TableColumns,
) -> OperationResult<SqlStatement> {
    let table = quote_identifier(table, "Table")?;
    let quoted = quote_identifier(column, "Column")?;
    let mut params = ParamStore::new();
    let value = columns.bind(&mut params, column, value, SqlParam::from_json(value));
    let id = id_slot(&mut params, row_id, columns);
    let sql = format!("UPDATE {table} SET {quoted} = {value} WHERE id = {id}");
    Ok(SqlStatement::new(sql, params.into_params()))
}

/// `DELETE FROM "t" WHERE id IN ($1,$2,..)`, or `None` for an empty id list.
pub fn delete_rows(
    table: &str,
    ids: &[JsonValue],
    columns: &TableColumns,
) -> OperationResult<Option<SqlStatement>> {
    validate_identifier(table, "Table")?;
    if ids.is_empty() {
        return Ok(None);
    }
    let mut params = ParamStore::new();
    let placeholders: Vec<String> = ids
        .iter()
        .map(|id| id_slot(&mut params, id, columns))
        .collect();
    let sql = format!(
        "DELETE FROM \"{}\" WHERE id IN ({})",
        table,
        placeholders.join(",")
    );
    Ok(Some(SqlStatement::new(sql, params.into_params())))
}

/// One multi-row `INSERT .. RETURNING <columns>`, or `None` for no rows.
///
/// Columns come from the first row, in its order. A later row with a column
/// the first row lacks is an error rather than a silent drop; a missing
/// column is NULL.
pub fn insert_rows(
    table: &str,
    rows: &[Row],
    columns: &TableColumns,
) -> OperationResult<Option<SqlStatement>> {
    validate_identifier(table, "Table")?;
    let Some(first) = rows.first() else {
        return Ok(None);
    };

    let names: Vec<&str> = first.keys().map(String::as_str).collect();
    if names.is_empty() {
        return Err(OperationError::query_failed("No values to insert"));
    }
    for col in &names {
        validate_identifier(col, "Column")?;
    }

    let mut params = ParamStore::new();
    let mut value_groups = Vec::with_capacity(rows.len());
    for (n, row) in rows.iter().enumerate() {
        if let Some(extra) = row.keys().find(|k| !first.contains_key(k.as_str())) {
            return Err(OperationError::query_failed(format!(
                "Row {} has column {extra:?} which the first row does not; \
                 all inserted rows must share the first row's columns",
                n + 1
            )));
        }
        let placeholders: Vec<String> = names
            .iter()
            .map(|col| {
                let value = row.get_value(col).unwrap_or(&JsonValue::Null);
                columns.bind(&mut params, col, value, SqlParam::from_json(value))
            })
            .collect();
        value_groups.push(format!("({})", placeholders.join(", ")));
    }

    let col_list = names
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "INSERT INTO \"{}\" ({}) VALUES {} RETURNING {}",
        table,
        col_list,
        value_groups.join(", "),
        columns.select_list()
    );
    Ok(Some(SqlStatement::new(sql, params.into_params())))
}

/// `CREATE TABLE "t" (..)` from inferred column definitions.
pub fn build_create_table(table: &str, columns: &[ColumnDef]) -> OperationResult<SqlStatement> {
    let table = quote_identifier(table, "Table")?;
    if columns.is_empty() {
        return Err(OperationError::query_failed("A table needs at least one column"));
    }
    let defs = columns
        .iter()
        .map(|col| col.to_sql())
        .collect::<OperationResult<Vec<_>>>()?;
    Ok(SqlStatement::raw(format!("CREATE TABLE {} ({})", table, defs.join(", "))))
}

/// `DROP TABLE IF EXISTS "t"`
pub fn build_drop_table(table: &str) -> OperationResult<SqlStatement> {
    Ok(SqlStatement::raw(format!(
        "DROP TABLE IF EXISTS {}",
        quote_identifier(table, "Table")?
    )))
}
