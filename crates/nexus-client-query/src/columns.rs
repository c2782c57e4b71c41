//! Column types of an existing table, read from the catalog.
//!
//! A value bound against a known column is sent as text and cast on the
//! server (`CAST($1 AS integer)`), so Postgres parses it with the column's own
//! input function, the same way PostgREST treats JSON bodies and filters.
//! Without column information the builders fall back to [`SqlParam::infer`].

use nexus_client_core::{is_native_pg_type, OperationResult, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::generate::SqlStatement;
use crate::sql::{validate_identifier, ParamStore, SqlParam};

/// Columns of a `public` table or view in attribute order. `$1` is the table name.
pub const COLUMN_TYPES_SQL: &str = "SELECT \
    a.attname::text AS name, \
    format_type(a.atttypid, a.atttypmod) AS data_type, \
    t.typname::text AS udt_name \
FROM pg_catalog.pg_attribute a \
JOIN pg_catalog.pg_class c ON c.oid = a.attrelid \
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
JOIN pg_catalog.pg_type t ON t.oid = a.atttypid \
WHERE n.nspname = 'public' AND c.relname = CAST($1 AS name) \
AND a.attnum > 0 AND NOT a.attisdropped \
ORDER BY a.attnum";

/// The catalog lookup for `table`.
pub fn column_types(table: &str) -> OperationResult<SqlStatement> {
    validate_identifier(table, "Table")?;
    Ok(SqlStatement::new(
        COLUMN_TYPES_SQL,
        vec![SqlParam::Text(table.to_string())],
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    pub name: String,
    /// `format_type` output, e.g. `integer`, `numeric(10,2)`, `text[]`.
    pub data_type: String,
    /// `pg_type.typname`, e.g. `int4`, `numeric`, `_text`.
    pub udt_name: String,
}

impl TableColumn {
    pub fn new(
        name: impl Into<String>,
        data_type: impl Into<String>,
        udt_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            udt_name: udt_name.into(),
        }
    }

    pub fn is_array(&self) -> bool {
        self.udt_name.starts_with('_')
    }

    pub fn is_json(&self) -> bool {
        matches!(self.udt_name.as_str(), "json" | "jsonb")
    }

    /// The select-list entry. Types the row decoder cannot read natively
    /// are converted to JSON by the server.
    pub fn select_expr(&self) -> String {
        let ident = quote_catalog_identifier(&self.name);
        if is_native_pg_type(&self.udt_name) {
            ident
        } else {
            format!("to_jsonb({ident}) AS {ident}")
        }
    }

    /// Text for Postgres to parse as this column's type. Not called for null.
    pub fn value_text(&self, value: &JsonValue) -> String {
        match value {
            _ if self.is_json() => value.to_string(),
            JsonValue::String(s) => s.clone(),
            JsonValue::Array(items) if self.is_array() => array_literal(items),
            other => other.to_string(),
        }
    }
}

/// Every column of one table, in attribute order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableColumns {
    columns: Vec<TableColumn>,
}

impl TableColumns {
    pub fn new(columns: Vec<TableColumn>) -> Self {
        Self { columns }
    }

    /// Read the rows returned by [`COLUMN_TYPES_SQL`]. Incomplete rows are skipped.
    pub fn from_rows(rows: &[Row]) -> Self {
        let columns = rows
            .iter()
            .filter_map(|row| {
                Some(TableColumn::new(
                    row.get_as::<String>("name")?,
                    row.get_as::<String>("data_type")?,
                    row.get_as::<String>("udt_name")?,
                ))
            })
            .collect();
        Self { columns }
    }

    pub fn get(&self, name: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|col| col.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableColumn> {
        self.columns.iter()
    }

    /// `"id", to_jsonb("price") AS "price"`, or `*` when nothing is known.
    pub fn select_list(&self) -> String {
        if self.columns.is_empty() {
            return "*".to_string();
        }
        self.columns
            .iter()
            .map(TableColumn::select_expr)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Placeholder for `value` compared with or assigned to `column`.
    ///
    /// Null is a bare `NULL`: a bound null still carries a parameter type,
    /// which Postgres refuses to assign to columns of another type.
    pub(crate) fn bind(
        &self,
        params: &mut ParamStore,
        column: &str,
        value: &JsonValue,
        untyped: SqlParam,
    ) -> String {
        if value.is_null() {
            return "NULL".to_string();
        }
        match self.get(column) {
            Some(col) => {
                let idx = params.push(SqlParam::Text(col.value_text(value)));
                format!("CAST(${idx} AS {})", col.data_type)
            }
            None => match untyped {
                SqlParam::Null => "NULL".to_string(),
                param => format!("${}", params.push(param)),
            },
        }
    }
}

/// Catalog names can hold any character; double any embedded quote.
pub(crate) fn quote_catalog_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `[1, "a b", null]` as the array input literal `{1,"a b",NULL}`.
fn array_literal(items: &[JsonValue]) -> String {
    let elements: Vec<String> = items
        .iter()
        .map(|item| match item {
            JsonValue::Null => "NULL".to_string(),
            JsonValue::Array(inner) => array_literal(inner),
            JsonValue::String(s) => quote_array_element(s),
            JsonValue::Object(_) => quote_array_element(&item.to_string()),
            other => other.to_string(),
        })
        .collect();
    format!("{{{}}}", elements.join(","))
}

fn quote_array_element(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}
