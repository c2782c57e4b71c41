use std::str::FromStr;

use nexus_client_core::{OperationError, OperationResult};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Type-erased SQL parameter, bound positionally (`$N`) by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SqlParam {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Text(String),
    Uuid(Uuid),
    Json(JsonValue),
}

impl SqlParam {
    /// Convert a JSON cell value into a parameter, keeping its JSON type.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Self::I64(i),
                None => n.as_f64().map_or(Self::Null, Self::F64),
            },
            JsonValue::String(s) => Self::Text(s.clone()),
            JsonValue::Array(_) | JsonValue::Object(_) => Self::Json(value.clone()),
        }
    }

    /// Convert a row id. Ids that look like UUIDs are bound as `uuid` so they
    /// compare against uuid primary keys.
    pub fn from_row_id(value: &JsonValue) -> Self {
        match value {
            JsonValue::String(s) => match Uuid::try_parse(s) {
                Ok(u) => Self::Uuid(u),
                Err(_) => Self::Text(s.clone()),
            },
            other => Self::from_json(other),
        }
    }

    /// Infer a parameter type from free text typed into a filter.
    ///
    /// Integers, finite floats, `true`/`false` and UUIDs get their own types;
    /// everything else stays text.
    pub fn infer(text: &str) -> Self {
        if let Ok(i) = text.parse::<i64>() {
            return Self::I64(i);
        }
        if let Ok(f) = text.parse::<f64>() {
            if f.is_finite() && text.bytes().any(|b| b.is_ascii_digit()) {
                return Self::F64(f);
            }
        }
        match text {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        match Uuid::try_parse(text) {
            Ok(u) => Self::Uuid(u),
            Err(_) => Self::Text(text.to_string()),
        }
    }
}

/// Store for collecting parameters during statement building.
#[derive(Debug, Clone, Default)]
pub struct ParamStore {
    params: Vec<SqlParam>,
    offset: usize,
}

impl ParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose first pushed parameter gets placeholder `$first`.
    pub fn starting_at(first: usize) -> Self {
        Self {
            params: Vec::new(),
            offset: first.saturating_sub(1),
        }
    }

    /// Push a parameter and return its 1-based placeholder index (for `$N`).
    pub fn push(&mut self, param: SqlParam) -> usize {
        self.params.push(param);
        self.offset + self.params.len()
    }

    /// Get all parameters.
    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    /// Consume and return all parameters.
    pub fn into_params(self) -> Vec<SqlParam> {
        self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

// --- Operators ---

/// Filter operators offered to the user, in their REST spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
    ILike,
    Is,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 8] = [
        Self::Eq,
        Self::Neq,
        Self::Gt,
        Self::Lt,
        Self::Gte,
        Self::Lte,
        Self::ILike,
        Self::Is,
    ];

    pub fn as_rest(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::ILike => "ilike",
            Self::Is => "is",
        }
    }

    /// The SQL comparison operator, for the operators the fragment builder
    /// translates. `ilike` and `is` have none.
    pub fn as_sql(&self) -> Option<&'static str> {
        match self {
            Self::Eq => Some("="),
            Self::Neq => Some("!="),
            Self::Gt => Some(">"),
            Self::Lt => Some("<"),
            Self::Gte => Some(">="),
            Self::Lte => Some("<="),
            Self::ILike | Self::Is => None,
        }
    }
}

impl FromStr for FilterOperator {
    type Err = OperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_rest() == s)
            .ok_or_else(|| {
                OperationError::translation_unsupported(format!("Unknown filter operator: {s:?}"))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Ascending,
    Descending,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }

    pub fn as_rest(&self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

// --- Identifiers ---

/// Check that a name matches `^[A-Za-z_][A-Za-z0-9_]*$`.
pub fn is_safe_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate a table or column name before it is interpolated into a query.
pub fn validate_identifier(name: &str, kind: &str) -> OperationResult<()> {
    if name.is_empty() {
        return Err(OperationError::translation_unsupported(format!(
            "{kind} name cannot be empty"
        )));
    }
    if !is_safe_identifier(name) {
        return Err(OperationError::translation_unsupported(format!(
            "Invalid {kind} name: {name:?} (only letters, digits and underscores are allowed)"
        )));
    }
    Ok(())
}

/// Validate then double-quote an identifier for SQL text.
pub fn quote_identifier(name: &str, kind: &str) -> OperationResult<String> {
    validate_identifier(name, kind)?;
    Ok(format!("\"{name}\""))
}
