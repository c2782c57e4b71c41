use async_trait::async_trait;
use nexus_client_core::{DirectConfig, OperationError, Row};
use nexus_client_query::{SqlParam, SqlStatement};
use serde::{Deserialize, Serialize};

/// A statement sent across the gateway boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlRequest {
    pub sql: String,
    #[serde(default)]
    pub params: Vec<SqlParam>,
}

impl SqlRequest {
    pub fn new(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

impl From<SqlStatement> for SqlRequest {
    fn from(stmt: SqlStatement) -> Self {
        Self::new(stmt.sql, stmt.params)
    }
}

/// Why a gateway request produced no rows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum GatewayFailure {
    /// No pool, a closed executor, or a connection-level failure.
    #[error("{0}")]
    Unavailable(String),

    /// The database rejected the statement; the message is its own.
    #[error("{0}")]
    Database(String),
}

impl From<GatewayFailure> for OperationError {
    fn from(failure: GatewayFailure) -> Self {
        match failure {
            GatewayFailure::Unavailable(msg) => OperationError::backend_unavailable(msg),
            GatewayFailure::Database(msg) => OperationError::query_failed(msg),
        }
    }
}

/// Reply to a [`SqlRequest`]: the rows, or the reason there are none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SqlResponse {
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<GatewayFailure>,
}

impl SqlResponse {
    pub fn ok(rows: Vec<Row>) -> Self {
        Self { rows, error: None }
    }

    pub fn failed(failure: GatewayFailure) -> Self {
        Self {
            rows: Vec::new(),
            error: Some(failure),
        }
    }

    pub fn into_result(self) -> Result<Vec<Row>, GatewayFailure> {
        match self.error {
            Some(failure) => Err(failure),
            None => Ok(self.rows),
        }
    }
}

/// The boundary between the direct adapter and whatever owns the database
/// connection. The adapter never sees a pool or credentials, only this.
#[async_trait]
pub trait SqlGateway: Send + Sync {
    /// Run one statement with positional parameters.
    async fn query(&self, request: SqlRequest) -> SqlResponse;

    /// Replace the current connection with one built from `config`.
    async fn connect(&self, config: DirectConfig) -> Result<(), GatewayFailure>;
}
