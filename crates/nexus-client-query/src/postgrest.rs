//! PostgREST query-string dialect.
//!
//! Filters render as `column=op.value`, the sort as `order=column.asc|desc`,
//! and every pair is form-urlencoded. The builders here only produce strings;
//! sending them is the REST adapter's job.

use nexus_client_core::{OperationError, OperationResult};
use serde_json::Value as JsonValue;
use url::form_urlencoded;

use crate::filter::{PageRequest, Predicate, SortKey};
use crate::sql::{validate_identifier, FilterOperator};

/// Query parameter names PostgREST interprets itself.
pub const RESERVED_PARAMS: [&str; 4] = ["select", "order", "limit", "offset"];

/// Render predicates and an optional sort as a query-string suffix.
///
/// The result starts with `&` so it can be appended directly after
/// `?select=*&limit=..&offset=..`. No predicates and no sort gives `""`.
pub fn build_rest_query(
    predicates: &[Predicate],
    sort: Option<&SortKey>,
) -> OperationResult<String> {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for predicate in predicates {
        validate_identifier(predicate.column(), "Column")?;
        if RESERVED_PARAMS.contains(&predicate.column()) {
            return Err(OperationError::translation_unsupported(format!(
                "Cannot filter on {:?}: the name is reserved by the REST API",
                predicate.column()
            )));
        }
        serializer.append_pair(predicate.column(), &render_condition(predicate));
    }
    if let Some(sort) = sort {
        validate_identifier(sort.column(), "Sort column")?;
        serializer.append_pair(
            "order",
            &format!("{}.{}", sort.column(), sort.direction().as_rest()),
        );
    }

    let encoded = serializer.finish();
    if encoded.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!("&{encoded}"))
    }
}

fn render_condition(predicate: &Predicate) -> String {
    let value = predicate.value();
    match predicate.operator() {
        FilterOperator::ILike if !value.contains('*') => format!("ilike.*{value}*"),
        op => format!("{}.{}", op.as_rest(), value),
    }
}

/// Parse a suffix produced by [`build_rest_query`] back into predicates and sort.
pub fn parse_rest_query(query: &str) -> OperationResult<(Vec<Predicate>, Option<SortKey>)> {
    let query = query.strip_prefix('&').unwrap_or(query);
    let mut predicates = Vec::new();
    let mut sort = None;

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key == "order" {
            let (column, direction) = value.rsplit_once('.').ok_or_else(|| {
                OperationError::translation_unsupported(format!("Malformed order: {value:?}"))
            })?;
            let ascending = match direction {
                "asc" => true,
                "desc" => false,
                other => {
                    return Err(OperationError::translation_unsupported(format!(
                        "Unknown sort direction: {other:?}"
                    )))
                }
            };
            sort = Some(SortKey::new(column, ascending)?);
            continue;
        }

        let (op, operand) = value.split_once('.').ok_or_else(|| {
            OperationError::translation_unsupported(format!(
                "Malformed filter for {key:?}: {value:?}"
            ))
        })?;
        let operator: FilterOperator = op.parse()?;
        predicates.push(Predicate::new(key.into_owned(), operator, operand)?);
    }

    Ok((predicates, sort))
}

// --- URLs ---

/// `<data>/<table>?select=*&limit=<n>&offset=<m><extra>`
pub fn page_url(data_url: &str, request: &PageRequest, extra_query: &str) -> String {
    format!(
        "{}/{}?select=*&limit={}&offset={}{}",
        data_url.trim_end_matches('/'),
        request.table(),
        request.limit(),
        request.offset(),
        extra_query
    )
}

/// `<data>/<table>?id=eq.<id>`
pub fn update_url(data_url: &str, table: &str, row_id: &JsonValue) -> OperationResult<String> {
    validate_identifier(table, "Table")?;
    let id: String = form_urlencoded::byte_serialize(render_id(row_id).as_bytes()).collect();
    Ok(format!(
        "{}/{}?id=eq.{}",
        data_url.trim_end_matches('/'),
        table,
        id
    ))
}

/// `<data>/<table>?id=in.(<ids>)`; string ids are double-quoted with `"` and
/// `\` escaped.
pub fn delete_url(data_url: &str, table: &str, ids: &[JsonValue]) -> OperationResult<String> {
    validate_identifier(table, "Table")?;
    let list = ids
        .iter()
        .map(|id| {
            let item = match id {
                JsonValue::String(s) => {
                    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
                }
                other => render_id(other),
            };
            form_urlencoded::byte_serialize(item.as_bytes()).collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(",");
    Ok(format!(
        "{}/{}?id=in.({})",
        data_url.trim_end_matches('/'),
        table,
        list
    ))
}

/// `<data>/<table>`
pub fn insert_url(data_url: &str, table: &str) -> OperationResult<String> {
    validate_identifier(table, "Table")?;
    Ok(format!("{}/{}", data_url.trim_end_matches('/'), table))
}

fn render_id(id: &JsonValue) -> String {
    match id {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Total row count from a `Content-Range` header (`0-9/57`, `*/57`).
///
/// An unknown total (`*`), a missing header or a malformed one gives `None`.
pub fn parse_content_range(header: Option<&str>) -> Option<u64> {
    let header = header?;
    let total = match header.rfind('/') {
        Some(pos) => &header[pos + 1..],
        None => {
            tracing::warn!(content_range = %header, "Malformed Content-Range header");
            return None;
        }
    };
    if total == "*" {
        return None;
    }
    match total.parse::<u64>() {
        Ok(count) => Some(count),
        Err(_) => {
            tracing::warn!(content_range = %header, "Malformed Content-Range header");
            None
        }
    }
}
