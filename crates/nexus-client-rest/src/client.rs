use std::fmt;

use nexus_client_core::{
    sort_tables, ConfigError, OperationResult, QueryResult, RemoteConfig, Row, TableInfo,
};
use nexus_client_query::postgrest::{
    delete_url, insert_url, page_url, parse_content_range, update_url,
};
use nexus_client_query::sql::validate_identifier;
use nexus_client_query::PageRequest;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use tracing::debug;
use url::Url;

use crate::error::{error_from_response, transport_error};

const PREFER: &str = "Prefer";

/// Adapter for the remote backend: PostgREST for table data, postgres-meta
/// for table metadata and raw SQL.
///
/// # Example
/// ```ignore
/// use nexus_client_core::RemoteConfig;
/// use nexus_client_rest::RestAdapter;
///
/// let adapter = RestAdapter::new(RemoteConfig::new("http://localhost:8080", "http://localhost:3000"))?;
/// let tables = adapter.list_tables().await?;
/// ```
#[derive(Clone)]
pub struct RestAdapter {
    http: reqwest::Client,
    config: RemoteConfig,
}

impl fmt::Debug for RestAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestAdapter")
            .field("config", &self.config)
            .finish()
    }
}

impl RestAdapter {
    /// Create an adapter. Every request carries `Content-Type: application/json`
    /// and, when a token is configured, `Authorization: Bearer <token>`.
    pub fn new(config: RemoteConfig) -> Result<Self, ConfigError> {
        Url::parse(&config.meta_url)?;
        Url::parse(&config.data_url)?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &config.auth_token {
            default_headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|e| ConfigError::InvalidHeader(format!("Invalid auth token: {e}")))?,
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(default_headers)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        debug!(method = %method, url = %url, "Executing REST request");
        self.http.request(method, url)
    }

    /// Send a request, turning a non-2xx status into an `OperationError`.
    async fn send(&self, request: RequestBuilder) -> OperationResult<Response> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await.map_err(transport_error)?;
        let err = error_from_response(status, &body);
        debug!(status = status.as_u16(), message = %err.message, "REST request failed");
        Err(err)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> OperationResult<T> {
        let body = response.bytes().await.map_err(transport_error)?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// `GET <meta>/tables`, sorted by table name.
    pub async fn list_tables(&self) -> OperationResult<Vec<TableInfo>> {
        let url = format!("{}/tables", self.config.meta_url);
        let response = self.send(self.request(Method::GET, &url)).await?;
        let mut tables: Vec<TableInfo> = Self::read_json(response).await?;
        sort_tables(&mut tables);
        Ok(tables)
    }

    /// Fetch one page with an exact count.
    ///
    /// `extra_query` is a suffix from `build_rest_query` (leading `&`, or empty).
    pub async fn fetch_page(
        &self,
        request: &PageRequest,
        extra_query: &str,
    ) -> OperationResult<QueryResult> {
        let url = page_url(&self.config.data_url, request, extra_query);
        let response = self
            .send(
                self.request(Method::GET, &url)
                    .header(PREFER, "count=exact"),
            )
            .await?;

        let total = parse_content_range(
            response
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|v| v.to_str().ok()),
        );
        let rows: Vec<Row> = Self::read_json(response).await?;
        Ok(QueryResult::new(rows, total))
    }

    /// `PATCH <data>/<table>?id=eq.<id>` with body `{column: value}`.
    pub async fn update_cell(
        &self,
        table: &str,
        row_id: &JsonValue,
        column: &str,
        value: JsonValue,
    ) -> OperationResult<()> {
        validate_identifier(column, "Column")?;
        let url = update_url(&self.config.data_url, table, row_id)?;
        let mut body = serde_json::Map::new();
        body.insert(column.to_string(), value);
        self.send(
            self.request(Method::PATCH, &url)
                .header(PREFER, "return=minimal")
                .json(&body),
        )
        .await?;
        Ok(())
    }

    /// `DELETE <data>/<table>?id=in.(..)`. An empty id list sends nothing.
    pub async fn delete_rows(&self, table: &str, ids: &[JsonValue]) -> OperationResult<()> {
        validate_identifier(table, "Table")?;
        if ids.is_empty() {
            return Ok(());
        }
        let url = delete_url(&self.config.data_url, table, ids)?;
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }

    /// `POST <data>/<table>` with a JSON array; returns the inserted rows.
    pub async fn insert_rows(&self, table: &str, rows: &[Row]) -> OperationResult<Vec<Row>> {
        validate_identifier(table, "Table")?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let url = insert_url(&self.config.data_url, table)?;
        let response = self
            .send(
                self.request(Method::POST, &url)
                    .header(PREFER, "return=representation")
                    .json(rows),
            )
            .await?;
        Self::read_json(response).await
    }

    /// `POST <meta>/query` with `{"query": sql}`.
    pub async fn run_raw_query(&self, sql: &str) -> OperationResult<Vec<Row>> {
        let url = format!("{}/query", self.config.meta_url);
        let response = self
            .send(self.request(Method::POST, &url).json(&json!({ "query": sql })))
            .await?;
        Self::read_json(response).await
    }

    /// `GET <meta>/tables?limit=1`; any 2xx is a live backend.
    pub async fn check_connection(&self) -> OperationResult<()> {
        let url = format!("{}/tables?limit=1", self.config.meta_url);
        self.send(self.request(Method::GET, &url)).await?;
        Ok(())
    }
}
