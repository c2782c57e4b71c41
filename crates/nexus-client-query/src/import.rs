//! Helpers for bulk-importing spreadsheet rows.
//!
//! Imported cells arrive as strings. They are sanitized, the column types are
//! inferred from the data, and cells are coerced to typed JSON so a direct
//! connection binds integers as integers rather than text.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use nexus_client_core::{OperationResult, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::sql::quote_identifier;

/// Column types an import can infer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Uuid,
    Int8,
    Numeric,
    Bool,
    Timestamptz,
    Text,
}

impl ColumnType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Uuid => "uuid",
            Self::Int8 => "int8",
            Self::Numeric => "numeric",
            Self::Bool => "bool",
            Self::Timestamptz => "timestamptz",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: ColumnType,
    pub is_primary_key: bool,
    pub is_nullable: bool,
    pub is_identity: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            data_type,
            is_primary_key: false,
            is_nullable: true,
            is_identity: false,
        }
    }

    /// Column definition as it appears inside `CREATE TABLE (..)`.
    pub fn to_sql(&self) -> OperationResult<String> {
        let mut sql = format!(
            "{} {}",
            quote_identifier(&self.name, "Column")?,
            self.data_type.as_sql()
        );
        if self.is_identity {
            sql.push_str(" GENERATED BY DEFAULT AS IDENTITY");
        }
        if self.is_primary_key {
            sql.push_str(" PRIMARY KEY");
        } else if !self.is_nullable {
            sql.push_str(" NOT NULL");
        }
        Ok(sql)
    }
}

/// Replace empty-string cells with `null`.
pub fn sanitize_import_rows(rows: Vec<Row>) -> Vec<Row> {
    rows.into_iter()
        .map(|row| {
            row.into_inner()
                .into_iter()
                .map(|(k, v)| match v {
                    JsonValue::String(s) if s.is_empty() => (k, JsonValue::Null),
                    other => (k, other),
                })
                .collect()
        })
        .collect()
}

/// Infer one column definition per column of the first row.
pub fn infer_columns(rows: &[Row]) -> Vec<ColumnDef> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    first
        .keys()
        .map(|name| {
            let data_type = infer_column_type(rows, name);
            let is_id = name == "id";
            ColumnDef {
                name: name.clone(),
                data_type,
                is_primary_key: is_id,
                is_nullable: !is_id,
                is_identity: is_id && data_type == ColumnType::Int8,
            }
        })
        .collect()
}

#[derive(Clone, Copy)]
struct Candidates {
    uuid: bool,
    int: bool,
    float: bool,
    boolean: bool,
    date: bool,
}

impl Candidates {
    fn any(&self) -> bool {
        self.uuid || self.int || self.float || self.boolean || self.date
    }
}

fn infer_column_type(rows: &[Row], column: &str) -> ColumnType {
    let mut c = Candidates {
        uuid: true,
        int: true,
        float: true,
        boolean: true,
        date: true,
    };
    let mut has_data = false;

    for text in rows.iter().filter_map(|row| cell_text(row.get_value(column))) {
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        has_data = true;
        c.uuid = c.uuid && is_uuid(text);
        c.int = c.int && text.parse::<i64>().is_ok();
        c.float = c.float && is_decimal(text);
        c.boolean = c.boolean && parse_bool(text).is_some();
        c.date = c.date && is_timestamp(text);
        if !c.any() {
            return ColumnType::Text;
        }
    }

    if !has_data {
        ColumnType::Text
    } else if c.uuid {
        ColumnType::Uuid
    } else if c.int {
        ColumnType::Int8
    } else if c.float {
        ColumnType::Numeric
    } else if c.boolean {
        ColumnType::Bool
    } else if c.date {
        ColumnType::Timestamptz
    } else {
        ColumnType::Text
    }
}

fn cell_text(value: Option<&JsonValue>) -> Option<String> {
    match value? {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn is_uuid(text: &str) -> bool {
    text.len() == 36 && Uuid::try_parse(text).is_ok()
}

fn is_decimal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (whole, frac) = match digits.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (digits, None),
    };
    let whole_ok = whole.bytes().all(|b| b.is_ascii_digit());
    let frac_ok = frac.map_or(true, |f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()));
    whole_ok && frac_ok && digits.bytes().any(|b| b.is_ascii_digit())
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn is_timestamp(text: &str) -> bool {
    if !text.contains(['-', '/', ':']) {
        return false;
    }
    DateTime::parse_from_rfc3339(text).is_ok()
        || ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(text, fmt).is_ok())
        || ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"]
            .iter()
            .any(|fmt| NaiveDate::parse_from_str(text, fmt).is_ok())
}

/// Convert string cells to the JSON type of their inferred column.
///
/// Cells that do not convert are left as they are; the database reports them.
pub fn coerce_import_rows(rows: Vec<Row>, columns: &[ColumnDef]) -> Vec<Row> {
    rows.into_iter()
        .map(|mut row| {
            for col in columns {
                if let Some(cell) = row.get_mut(&col.name) {
                    if let Some(typed) = coerce_cell(cell, col.data_type) {
                        *cell = typed;
                    }
                }
            }
            row
        })
        .collect()
}

fn coerce_cell(cell: &JsonValue, data_type: ColumnType) -> Option<JsonValue> {
    let text = cell.as_str()?.trim();
    match data_type {
        ColumnType::Int8 => text.parse::<i64>().ok().map(JsonValue::from),
        ColumnType::Numeric => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number),
        ColumnType::Bool => parse_bool(text).map(JsonValue::Bool),
        ColumnType::Uuid | ColumnType::Timestamptz | ColumnType::Text => None,
    }
}
