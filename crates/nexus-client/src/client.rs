use std::sync::Arc;

use nexus_client_core::{
    ClientConfig, ConfigError, DirectConfig, OperationError, OperationResult, QueryResult,
    RemoteConfig, Row, TableInfo,
};
use nexus_client_direct::SqlGateway;
use nexus_client_query::generate::{build_create_table, build_drop_table};
use nexus_client_query::{
    build_rest_query, coerce_import_rows, infer_columns, sanitize_import_rows, ColumnDef,
    PageRequest, Predicate, SortKey,
};
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::transport::{detect_mode, TransportMode};

/// One entry point for every table operation, whichever transport is active.
///
/// Each call takes a snapshot of the active [`Backend`] and releases the lock
/// before any I/O, so [`reconfigure`](Self::reconfigure) never waits on a
/// request in flight and a request never sees half a swap.
pub struct NexusClient {
    backend: RwLock<Arc<Backend>>,
}

impl NexusClient {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend: RwLock::new(Arc::new(backend)),
        }
    }

    /// Build a client from configuration, letting the process-wide detector
    /// pick the transport.
    ///
    /// Passing a gateway makes the first bootstrap in the process select
    /// `Direct`. Later bootstraps keep whatever mode was selected first.
    pub fn bootstrap(
        config: &ClientConfig,
        gateway: Option<Arc<dyn SqlGateway>>,
    ) -> Result<Self, ConfigError> {
        let mode = detect_mode(|| gateway.is_some());
        let backend = match (mode, gateway) {
            (TransportMode::Direct, Some(gateway)) => Backend::direct(gateway),
            (TransportMode::Direct, None) => {
                return Err(ConfigError::Transport(
                    "direct mode is active but no SQL gateway was provided".into(),
                ))
            }
            (TransportMode::Remote, _) => Backend::remote(config.remote.clone())?,
        };
        info!(mode = %mode, "Client bootstrapped");
        Ok(Self::new(backend))
    }

    async fn backend(&self) -> Arc<Backend> {
        self.backend.read().await.clone()
    }

    pub async fn mode(&self) -> TransportMode {
        self.backend().await.mode()
    }

    /// Swap the active backend. Calls already running finish on the old one.
    pub async fn reconfigure(&self, backend: Backend) {
        let mut active = self.backend.write().await;
        info!(from = %active.mode(), to = %backend.mode(), "Backend reconfigured");
        *active = Arc::new(backend);
    }

    /// Replace the REST endpoints and token. Only valid in remote mode.
    pub async fn reconfigure_remote(&self, config: RemoteConfig) -> Result<(), ConfigError> {
        if self.mode().await != TransportMode::Remote {
            return Err(ConfigError::Transport(
                "remote settings cannot be applied in direct mode".into(),
            ));
        }
        let backend = Backend::remote(config)?;
        self.reconfigure(backend).await;
        Ok(())
    }

    /// Open (or replace) the database connection behind the direct gateway.
    pub async fn connect_direct(&self, config: DirectConfig) -> OperationResult<()> {
        match &*self.backend().await {
            Backend::Direct(adapter) => adapter.connect(config).await,
            Backend::Remote(_) => Err(OperationError::backend_unavailable(
                "Direct connections are not available in remote mode",
            )),
        }
    }

    pub async fn list_tables(&self) -> OperationResult<Vec<TableInfo>> {
        match &*self.backend().await {
            Backend::Remote(adapter) => adapter.list_tables().await,
            Backend::Direct(adapter) => adapter.list_tables().await,
        }
    }

    /// One page of rows plus the total matching the same predicates.
    pub async fn fetch_page(
        &self,
        request: &PageRequest,
        predicates: &[Predicate],
        sort: Option<&SortKey>,
    ) -> OperationResult<QueryResult> {
        let backend = self.backend().await;
        debug!(
            mode = %backend.mode(),
            table = request.table(),
            predicates = predicates.len(),
            "fetch_page"
        );
        match &*backend {
            Backend::Remote(adapter) => {
                let extra = build_rest_query(predicates, sort)?;
                adapter.fetch_page(request, &extra).await
            }
            Backend::Direct(adapter) => adapter.fetch_page(request, predicates, sort).await,
        }
    }

    pub async fn update_cell(
        &self,
        table: &str,
        row_id: &JsonValue,
        column: &str,
        value: JsonValue,
    ) -> OperationResult<()> {
        match &*self.backend().await {
            Backend::Remote(adapter) => adapter.update_cell(table, row_id, column, value).await,
            Backend::Direct(adapter) => adapter.update_cell(table, row_id, column, value).await,
        }
    }

    pub async fn delete_rows(&self, table: &str, ids: &[JsonValue]) -> OperationResult<()> {
        match &*self.backend().await {
            Backend::Remote(adapter) => adapter.delete_rows(table, ids).await,
            Backend::Direct(adapter) => adapter.delete_rows(table, ids).await,
        }
    }

    pub async fn insert_rows(&self, table: &str, rows: &[Row]) -> OperationResult<Vec<Row>> {
        match &*self.backend().await {
            Backend::Remote(adapter) => adapter.insert_rows(table, rows).await,
            Backend::Direct(adapter) => adapter.insert_rows(table, rows).await,
        }
    }

    pub async fn run_raw_query(&self, sql: &str) -> OperationResult<Vec<Row>> {
        match &*self.backend().await {
            Backend::Remote(adapter) => adapter.run_raw_query(sql).await,
            Backend::Direct(adapter) => adapter.run_raw_query(sql).await,
        }
    }

    pub async fn check_connection(&self) -> OperationResult<()> {
        match &*self.backend().await {
            Backend::Remote(adapter) => adapter.check_connection().await,
            Backend::Direct(adapter) => adapter.check_connection().await,
        }
    }

    /// Insert rows parsed from a file (all cells as strings) into an existing
    /// table. Empty cells become NULL and numeric or boolean columns are
    /// converted before sending.
    pub async fn import_rows(&self, table: &str, rows: Vec<Row>) -> OperationResult<Vec<Row>> {
        let (_, rows) = prepare_import(rows);
        debug!(table, rows = rows.len(), "import_rows");
        self.insert_rows(table, &rows).await
    }

    /// Create `table` from the inferred column types, then import into it.
    ///
    /// If the insert fails the new table is dropped again and the insert
    /// error is returned.
    pub async fn import_new_table(
        &self,
        table: &str,
        rows: Vec<Row>,
    ) -> OperationResult<(Vec<ColumnDef>, Vec<Row>)> {
        let (columns, rows) = prepare_import(rows);
        let create = build_create_table(table, &columns)?;
        let drop = build_drop_table(table)?;
        self.run_raw_query(&create.sql).await?;
        match self.insert_rows(table, &rows).await {
            Ok(inserted) => Ok((columns, inserted)),
            Err(err) => {
                if let Err(drop_err) = self.run_raw_query(&drop.sql).await {
                    warn!(table, error = %drop_err, "Failed to drop table after a failed import");
                }
                Err(err)
            }
        }
    }
}

fn prepare_import(rows: Vec<Row>) -> (Vec<ColumnDef>, Vec<Row>) {
    let rows = sanitize_import_rows(rows);
    let columns = infer_columns(&rows);
    let rows = coerce_import_rows(rows, &columns);
    (columns, rows)
}

impl std::fmt::Debug for NexusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("NexusClient");
        match self.backend.try_read() {
            Ok(backend) => s.field("backend", &**backend),
            Err(_) => s.field("backend", &"<reconfiguring>"),
        };
        s.finish()
    }
}
