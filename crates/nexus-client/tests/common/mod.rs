//! Stand-ins for both transports: a local axum server playing PostgREST and
//! postgres-meta, and an in-memory SQL gateway.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::Response;
use axum::Router;
use nexus_client::{Backend, DirectConfig, RemoteConfig};
use nexus_client_direct::{GatewayFailure, SqlGateway, SqlRequest, SqlResponse};
use nexus_client_query::COLUMN_TYPES_SQL;

// ─── REST ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub body: String,
}

pub struct Canned {
    pub status: StatusCode,
    pub content_range: Option<String>,
    pub body: String,
}

impl Canned {
    pub fn json(status: StatusCode, body: serde_json::Value) -> Self {
        Self {
            status,
            content_range: None,
            body: body.to_string(),
        }
    }

    pub fn ok(body: serde_json::Value) -> Self {
        Self::json(StatusCode::OK, body)
    }

    pub fn content_range(mut self, value: impl Into<String>) -> Self {
        self.content_range = Some(value.into());
        self
    }
}

pub type Responder = fn(&Recorded) -> Canned;

#[derive(Clone)]
struct MockState {
    responder: Responder,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

pub struct MockServer {
    pub url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockServer {
    pub async fn start(responder: Responder) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            responder,
            requests: requests.clone(),
        };
        let app = Router::new().fallback(record).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { url, requests }
    }

    pub fn config(&self) -> RemoteConfig {
        RemoteConfig::new(format!("{}/pg", self.url), format!("{}/rest/v1", self.url))
    }

    pub fn backend(&self) -> Backend {
        Backend::remote(self.config()).unwrap()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

async fn record(State(state): State<MockState>, method: Method, uri: Uri, body: Bytes) -> Response {
    let recorded = Recorded {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    let canned = (state.responder)(&recorded);
    state.requests.lock().unwrap().push(recorded);

    let mut builder = Response::builder()
        .status(canned.status)
        .header("content-type", "application/json");
    if let Some(range) = canned.content_range {
        builder = builder.header("content-range", range);
    }
    builder.body(Body::from(canned.body)).unwrap()
}

// ─── SQL ──────────────────────────────────────────────────────

pub type SqlResponder = Box<dyn Fn(&SqlRequest) -> SqlResponse + Send + Sync>;

pub struct RecordingGateway {
    responder: SqlResponder,
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

    pub fn empty() -> Self {
        Self::new(|_| SqlResponse::ok(Vec::new()))
    }

    pub fn requests(&self) -> Vec<SqlRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests other than column-type lookups.
    pub fn statements(&self) -> Vec<SqlRequest> {
        self.requests()
            .into_iter()
            .filter(|req| req.sql != COLUMN_TYPES_SQL)
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
        self.connects.lock().unwrap().push(config);
        Ok(())
    }
}
