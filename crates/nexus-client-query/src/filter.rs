use std::fmt;

use nexus_client_core::{OperationError, OperationResult};

use crate::sql::{validate_identifier, FilterOperator, OrderDirection};

/// A single `column <op> value` condition from the filter bar.
///
/// Fields are private: every predicate in circulation went through
/// [`Predicate::new`], so the column is a safe identifier and the value is
/// well-formed for its operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    column: String,
    operator: FilterOperator,
    value: String,
}

impl Predicate {
    pub fn new(
        column: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> OperationResult<Self> {
        let column = column.into();
        let mut value = value.into();
        validate_identifier(&column, "Column")?;
        if value.is_empty() {
            return Err(OperationError::translation_unsupported(format!(
                "Filter on {column:?} has no value"
            )));
        }
        if operator == FilterOperator::Is {
            value = value.to_ascii_lowercase();
            if !matches!(value.as_str(), "null" | "true" | "false" | "unknown") {
                return Err(OperationError::translation_unsupported(format!(
                    "'is' filter on {column:?} expects null, true, false or unknown, got {value:?}"
                )));
            }
        }
        Ok(Self {
            column,
            operator,
            value,
        })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.operator.as_rest(), self.value)
    }
}

/// Build a predicate from the operator's REST spelling (`"eq"`, `"ilike"`, ...).
pub fn make_predicate(
    column: impl Into<String>,
    operator: &str,
    value: impl Into<String>,
) -> OperationResult<Predicate> {
    let operator: FilterOperator = operator.parse()?;
    Predicate::new(column, operator, value)
}

/// The single sort column of a grid view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    column: String,
    ascending: bool,
}

impl SortKey {
    pub fn new(column: impl Into<String>, ascending: bool) -> OperationResult<Self> {
        let column = column.into();
        validate_identifier(&column, "Sort column")?;
        Ok(Self { column, ascending })
    }

    pub fn ascending(column: impl Into<String>) -> OperationResult<Self> {
        Self::new(column, true)
    }

    pub fn descending(column: impl Into<String>) -> OperationResult<Self> {
        Self::new(column, false)
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn is_ascending(&self) -> bool {
        self.ascending
    }

    pub fn direction(&self) -> OrderDirection {
        if self.ascending {
            OrderDirection::Ascending
        } else {
            OrderDirection::Descending
        }
    }
}

/// Which table and which slice of it to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    table: String,
    limit: u64,
    offset: u64,
}

impl PageRequest {
    pub fn new(table: impl Into<String>, limit: u64, offset: u64) -> OperationResult<Self> {
        let table = table.into();
        validate_identifier(&table, "Table")?;
        if limit == 0 {
            return Err(OperationError::translation_unsupported(
                "Page limit must be greater than zero",
            ));
        }
        Ok(Self {
            table,
            limit,
            offset,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}
