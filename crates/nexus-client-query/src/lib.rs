//! Query translation for the nexus client.
//!
//! Structured filters and sorts ([`Predicate`], [`SortKey`], [`PageRequest`])
//! translate into either the PostgREST query-string dialect ([`postgrest`])
//! or parameterized SQL ([`generate`]).

pub mod columns;
pub mod filter;
pub mod generate;
pub mod import;
pub mod postgrest;
pub mod sql;

pub use columns::{column_types, TableColumn, TableColumns, COLUMN_TYPES_SQL};
pub use filter::{make_predicate, PageRequest, Predicate, SortKey};
pub use generate::{
    build_sql_fragment, build_sql_fragment_from, build_typed_fragment, SqlFragment, SqlStatement,
};
pub use import::{coerce_import_rows, infer_columns, sanitize_import_rows, ColumnDef, ColumnType};
pub use postgrest::{build_rest_query, parse_content_range, parse_rest_query};
pub use sql::{FilterOperator, OrderDirection, ParamStore, SqlParam};
