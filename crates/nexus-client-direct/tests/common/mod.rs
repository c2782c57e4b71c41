//! An in-memory [`SqlGateway`] that records every request.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use nexus_client_core::{row, DirectConfig, Row};
use nexus_client_direct::{GatewayFailure, SqlGateway, SqlRequest, SqlResponse};
use nexus_client_query::COLUMN_TYPES_SQL;

pub type Responder = Box<dyn Fn(&SqlRequest) -> SqlResponse + Send + Sync>;

pub struct RecordingGateway {
    responder: Responder,
    requests: Mutex<Vec<SqlRequest>>,
    connects: Mutex<Vec<DirectConfig>>,
}

impl RecordingGateway {
    pub fn new(responder: impl Fn(&SqlRequest) -> SqlResponse + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
            connects: Mutex::new(Vec::new()),
        }
    }

    /// Answers every statement with no rows.
    pub fn empty() -> Self {
        Self::new(|_| SqlResponse::ok(Vec::new()))
    }

    /// Answers the column-type lookup from `columns` (name, type, udt) and
    /// everything else with `rows`.
    pub fn typed(columns: &[(&str, &str, &str)], rows: Vec<Row>) -> Self {
        let catalog = catalog_rows(columns);
        Self::new(move |req| {
            if is_column_lookup(req) {
                SqlResponse::ok(catalog.clone())
            } else {
                SqlResponse::ok(rows.clone())
            }
        })
    }

    pub fn requests(&self) -> Vec<SqlRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests other than column-type lookups.
    pub fn statements(&self) -> Vec<SqlRequest> {
        self.requests()
            .into_iter()
            .filter(|req| !is_column_lookup(req))
            .collect()
    }

    pub fn connects(&self) -> Vec<DirectConfig> {
        self.connects.lock().unwrap().clone()
    }
}

#[async_trait]
impl SqlGateway for RecordingGateway {
    async fn query(&self, request: SqlRequest) -> SqlResponse {
        let response = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        response
    }

    async fn connect(&self, config: DirectConfig) -> Result<(), GatewayFailure> {
        let refused = config.host == "unreachable";
        self.connects.lock().unwrap().push(config);
        if refused {
            Err(GatewayFailure::Unavailable("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

pub fn is_column_lookup(req: &SqlRequest) -> bool {
    req.sql == COLUMN_TYPES_SQL
}

pub fn catalog_rows(columns: &[(&str, &str, &str)]) -> Vec<Row> {
    columns
        .iter()
        .map(|(name, data_type, udt)| {
            row![("name", *name), ("data_type", *data_type), ("udt_name", *udt)]
        })
        .collect()
}
