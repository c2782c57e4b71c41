use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::ops::{Deref, DerefMut};

/// A dynamic row: column name to JSON value.
///
/// Columns keep the order they were set in, which for fetched rows is the
/// table's column order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Row(pub Map<String, JsonValue>);

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Set a column value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Get a column value.
    pub fn get_value(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Check if a column exists.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Get a typed value from a column, returning None if missing or wrong type.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Get column names.
    pub fn columns(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }

    /// Consume the row and return the inner map.
    pub fn into_inner(self) -> Map<String, JsonValue> {
        self.0
    }
}

impl Deref for Row {
    type Target = Map<String, JsonValue>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Row {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<K: Into<String>, V: Into<JsonValue>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self(map)
    }
}

impl<K: Into<String>, V: Into<JsonValue>, const N: usize> From<[(K, V); N]> for Row {
    fn from(arr: [(K, V); N]) -> Self {
        arr.into_iter().collect()
    }
}

/// Postgres types the row decoder reads natively, by `pg_type.typname`.
///
/// Columns of any other type should be selected through `to_jsonb(..)` so they
/// arrive as JSON instead of in their binary wire format.
pub const NATIVE_PG_TYPES: [&str; 18] = [
    "bool", "int2", "int4", "int8", "float4", "float8", "text", "varchar", "bpchar", "name",
    "json", "jsonb", "uuid", "timestamp", "timestamptz", "date", "time", "bytea",
];

pub fn is_native_pg_type(type_name: &str) -> bool {
    NATIVE_PG_TYPES
        .iter()
        .any(|native| native.eq_ignore_ascii_case(type_name))
}

#[cfg(feature = "direct-sql")]
impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for Row {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::{Column, Row as _, TypeInfo};

        let mut map = Row::new();
        for col in row.columns() {
            let name = col.name();
            let ordinal = col.ordinal();
            let value = match col.type_info().name() {
                "BOOL" => row
                    .try_get::<Option<bool>, _>(ordinal)?
                    .map_or(JsonValue::Null, JsonValue::Bool),
                "INT2" => row
                    .try_get::<Option<i16>, _>(ordinal)?
                    .map_or(JsonValue::Null, |v| JsonValue::Number(v.into())),
                "INT4" => row
                    .try_get::<Option<i32>, _>(ordinal)?
                    .map_or(JsonValue::Null, |v| JsonValue::Number(v.into())),
                "INT8" => row
                    .try_get::<Option<i64>, _>(ordinal)?
                    .map_or(JsonValue::Null, |v| JsonValue::Number(v.into())),
                "FLOAT4" => row
                    .try_get::<Option<f32>, _>(ordinal)?
                    .and_then(|v| serde_json::Number::from_f64(f64::from(v)))
                    .map_or(JsonValue::Null, JsonValue::Number),
                "FLOAT8" => row
                    .try_get::<Option<f64>, _>(ordinal)?
                    .and_then(serde_json::Number::from_f64)
                    .map_or(JsonValue::Null, JsonValue::Number),
                "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row
                    .try_get::<Option<String>, _>(ordinal)?
                    .map_or(JsonValue::Null, JsonValue::String),
                "JSON" | "JSONB" => row
                    .try_get::<Option<JsonValue>, _>(ordinal)?
                    .unwrap_or(JsonValue::Null),
                "UUID" => row
                    .try_get::<Option<uuid::Uuid>, _>(ordinal)?
                    .map_or(JsonValue::Null, |v| JsonValue::String(v.to_string())),
                "TIMESTAMP" => row
                    .try_get::<Option<chrono::NaiveDateTime>, _>(ordinal)?
                    .map_or(JsonValue::Null, |v| JsonValue::String(v.to_string())),
                "TIMESTAMPTZ" => row
                    .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(ordinal)?
                    .map_or(JsonValue::Null, |v| JsonValue::String(v.to_rfc3339())),
                "DATE" => row
                    .try_get::<Option<chrono::NaiveDate>, _>(ordinal)?
                    .map_or(JsonValue::Null, |v| JsonValue::String(v.to_string())),
                "TIME" => row
                    .try_get::<Option<chrono::NaiveTime>, _>(ordinal)?
                    .map_or(JsonValue::Null, |v| JsonValue::String(v.to_string())),
                "BYTEA" => row
                    .try_get::<Option<Vec<u8>>, _>(ordinal)?
                    .map_or(JsonValue::Null, |bytes| {
                        JsonValue::String(format!("[BLOB: {} bytes]", bytes.len()))
                    }),
                _ => other_pg_value(row, ordinal)?,
            };
            map.set(name, value);
        }
        Ok(map)
    }
}

/// Any other type, rendered as text.
///
/// Text-format results (the simple protocol) carry Postgres' own rendering.
/// Binary results are decoded for numeric, money and interval; enum labels
/// are sent as plain text; anything else comes back as `\x`-prefixed hex.
#[cfg(feature = "direct-sql")]
fn other_pg_value(row: &sqlx::postgres::PgRow, ordinal: usize) -> Result<JsonValue, sqlx::Error> {
    use sqlx::postgres::types::{PgInterval, PgMoney};
    use sqlx::postgres::{PgTypeKind, PgValueFormat};
    use sqlx::{Row as _, TypeInfo, ValueRef};

    let raw = row.try_get_raw(ordinal)?;
    if raw.is_null() {
        return Ok(JsonValue::Null);
    }
    if matches!(raw.format(), PgValueFormat::Text) {
        let text = raw.as_str().map_err(sqlx::Error::Decode)?;
        return Ok(JsonValue::String(text.to_owned()));
    }

    let type_info = raw.type_info().into_owned();
    let text = match type_info.name() {
        "NUMERIC" => row.try_get::<rust_decimal::Decimal, _>(ordinal)?.to_string(),
        "MONEY" => format_money(row.try_get::<PgMoney, _>(ordinal)?.0),
        "INTERVAL" => format_interval(&row.try_get::<PgInterval, _>(ordinal)?),
        _ if matches!(type_info.kind(), PgTypeKind::Enum(_)) => {
            row.try_get_unchecked::<String, _>(ordinal)?
        }
        _ => {
            let bytes = raw.as_bytes().map_err(sqlx::Error::Decode)?;
            let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            format!("\\x{hex}")
        }
    };
    Ok(JsonValue::String(text))
}

/// Cents as `12.34` / `-0.05`.
#[cfg_attr(not(feature = "direct-sql"), allow(dead_code))]
fn format_money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Postgres' default interval style: `1 year 2 mons 3 days 04:05:06.5`.
#[cfg(feature = "direct-sql")]
fn format_interval(interval: &sqlx::postgres::types::PgInterval) -> String {
    format_interval_parts(interval.months, interval.days, interval.microseconds)
}

#[cfg_attr(not(feature = "direct-sql"), allow(dead_code))]
fn format_interval_parts(months: i32, days: i32, microseconds: i64) -> String {
    let mut parts = Vec::new();
    let (years, mons) = (months / 12, months % 12);
    if years != 0 {
        parts.push(format!("{years} year{}", if years.abs() == 1 { "" } else { "s" }));
    }
    if mons != 0 {
        parts.push(format!("{mons} mon{}", if mons.abs() == 1 { "" } else { "s" }));
    }
    if days != 0 {
        parts.push(format!("{days} day{}", if days.abs() == 1 { "" } else { "s" }));
    }
    if microseconds != 0 || parts.is_empty() {
        let sign = if microseconds < 0 { "-" } else { "" };
        let micros = microseconds.unsigned_abs();
        let secs = micros / 1_000_000;
        let frac = micros % 1_000_000;
        let mut time = format!(
            "{sign}{:02}:{:02}:{:02}",
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
        if frac != 0 {
            let digits = format!("{frac:06}");
            time.push('.');
            time.push_str(digits.trim_end_matches('0'));
        }
        parts.push(time);
    }
    parts.join(" ")
}

/// Macro for constructing a `Row` with key-value pairs.
///
/// # Examples
/// ```
/// use nexus_client_core::row;
/// let row = row![("name", "Auckland"), ("country_id", 554)];
/// ```
#[macro_export]
macro_rules! row {
    () => {
        $crate::Row::new()
    };
    ($(($key:expr, $val:expr)),+ $(,)?) => {{
        let mut row = $crate::Row::new();
        $(
            row.set($key, serde_json::json!($val));
        )+
        row
    }};
}
