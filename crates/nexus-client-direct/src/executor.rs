//! The task that owns the connection pool.
//!
//! Requests arrive over an mpsc channel and are answered through oneshot
//! channels. Queries run concurrently on clones of the pool; reconnects are
//! handled in order, so a query sent after `connect` sees the new pool.

use std::future::Future;

use async_trait::async_trait;
use nexus_client_core::{DirectConfig, Row};
use nexus_client_query::SqlParam;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPoolOptions};
use sqlx::{Arguments, FromRow, PgPool};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::gateway::{GatewayFailure, SqlGateway, SqlRequest, SqlResponse};

const NOT_CONNECTED: &str = "No active connection. Please connect first.";
const EXECUTOR_GONE: &str = "SQL executor is not running";
const CHANNEL_CAPACITY: usize = 64;

/// Bind all parameters into PgArguments.
pub fn bind_params(params: &[SqlParam]) -> Result<PgArguments, GatewayFailure> {
    let mut args = PgArguments::default();
    for param in params {
        let err_map = |e: sqlx::error::BoxDynError| GatewayFailure::Database(e.to_string());
        match param {
            SqlParam::Null => args.add(Option::<String>::None).map_err(err_map)?,
            SqlParam::Bool(v) => args.add(v).map_err(err_map)?,
            SqlParam::I64(v) => args.add(v).map_err(err_map)?,
            SqlParam::F64(v) => args.add(v).map_err(err_map)?,
            SqlParam::Text(v) => args.add(v.as_str()).map_err(err_map)?,
            SqlParam::Uuid(v) => args.add(v).map_err(err_map)?,
            SqlParam::Json(v) => args.add(v).map_err(err_map)?,
        }
    }
    Ok(args)
}

/// Classify a sqlx error: statement-level problems are the database's answer,
/// everything else means the backend could not be reached.
pub fn map_sqlx_error(err: sqlx::Error) -> GatewayFailure {
    match err {
        sqlx::Error::Database(db) => GatewayFailure::Database(db.message().to_string()),
        e @ (sqlx::Error::RowNotFound
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Encode(_)
        | sqlx::Error::Decode(_)) => GatewayFailure::Database(e.to_string()),
        e => GatewayFailure::Unavailable(e.to_string()),
    }
}

/// Owner of the (optional) pool.
#[derive(Debug, Default)]
pub struct PgExecutor {
    pool: Option<PgPool>,
}

impl PgExecutor {
    /// An executor with no connection yet; queries fail until `connect`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the current pool, then build and test a new one.
    pub async fn connect(&mut self, config: &DirectConfig) -> Result<(), GatewayFailure> {
        if let Some(old) = self.pool.take() {
            debug!("Closing previous connection pool");
            old.close().await;
        }

        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password);

        let pool = PgPoolOptions::new()
            .max_connections(config.pool.max_connections)
            .min_connections(config.pool.min_connections)
            .acquire_timeout(config.pool.acquire_timeout)
            .idle_timeout(config.pool.idle_timeout)
            .max_lifetime(config.pool.max_lifetime)
            .connect_with(options)
            .await
            .map_err(|e| GatewayFailure::Unavailable(e.to_string()))?;

        // Fail now rather than on the first query.
        pool.acquire()
            .await
            .map_err(|e| GatewayFailure::Unavailable(e.to_string()))?;

        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "Connected to database"
        );
        self.pool = Some(pool);
        Ok(())
    }

    /// Run a statement on the current pool.
    ///
    /// The returned future owns a clone of the pool, so it outlives `&self`.
    pub fn query(&self, request: SqlRequest) -> impl Future<Output = SqlResponse> + Send + 'static {
        let pool = self.pool.clone();
        async move {
            match pool {
                Some(pool) => run_statement(&pool, request).await,
                None => SqlResponse::failed(GatewayFailure::Unavailable(NOT_CONNECTED.to_string())),
            }
        }
    }

    pub async fn close(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }
    }
}

async fn run_statement(pool: &PgPool, request: SqlRequest) -> SqlResponse {
    debug!(sql = %request.sql, params = request.params.len(), "Executing statement");

    // Without parameters the simple protocol is used, which also allows
    // several statements in one request (as typed into the SQL editor).
    let result = if request.params.is_empty() {
        sqlx::raw_sql(&request.sql).fetch_all(pool).await
    } else {
        let args = match bind_params(&request.params) {
            Ok(args) => args,
            Err(failure) => return SqlResponse::failed(failure),
        };
        sqlx::query_with(&request.sql, args).fetch_all(pool).await
    };

    let rows = match result {
        Ok(rows) => rows,
        Err(e) => return SqlResponse::failed(map_sqlx_error(e)),
    };
    match rows.iter().map(Row::from_row).collect::<Result<Vec<_>, _>>() {
        Ok(rows) => SqlResponse::ok(rows),
        Err(e) => SqlResponse::failed(map_sqlx_error(e)),
    }
}

enum GatewayCommand {
    Connect {
        config: DirectConfig,
        reply: oneshot::Sender<Result<(), GatewayFailure>>,
    },
    Query {
        request: SqlRequest,
        reply: oneshot::Sender<SqlResponse>,
    },
}

async fn run_executor(mut executor: PgExecutor, mut commands: mpsc::Receiver<GatewayCommand>) {
    while let Some(command) = commands.recv().await {
        match command {
            GatewayCommand::Connect { config, reply } => {
                let result = executor.connect(&config).await;
                let _ = reply.send(result);
            }
            GatewayCommand::Query { request, reply } => {
                let running = executor.query(request);
                tokio::spawn(async move {
                    let _ = reply.send(running.await);
                });
            }
        }
    }
    executor.close().await;
    debug!("SQL executor stopped");
}

/// [`SqlGateway`] backed by a [`PgExecutor`] running on its own task.
///
/// The executor stops once every clone of the gateway is dropped.
#[derive(Debug, Clone)]
pub struct ChannelGateway {
    commands: mpsc::Sender<GatewayCommand>,
}

impl std::fmt::Debug for GatewayCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect { config, .. } => f.debug_struct("Connect").field("config", config).finish(),
            Self::Query { request, .. } => f.debug_struct("Query").field("sql", &request.sql).finish(),
        }
    }
}

impl ChannelGateway {
    /// Spawn the executor task. Must be called inside a Tokio runtime.
    pub fn spawn(executor: PgExecutor) -> Self {
        let (commands, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(run_executor(executor, receiver));
        Self { commands }
    }

    /// Spawn an executor and connect it.
    pub async fn connect_new(config: DirectConfig) -> Result<Self, GatewayFailure> {
        let gateway = Self::spawn(PgExecutor::new());
        gateway.connect(config).await?;
        Ok(gateway)
    }

    fn gone() -> GatewayFailure {
        GatewayFailure::Unavailable(EXECUTOR_GONE.to_string())
    }
}

#[async_trait]
impl SqlGateway for ChannelGateway {
    async fn query(&self, request: SqlRequest) -> SqlResponse {
        let (reply, response) = oneshot::channel();
        if self
            .commands
            .send(GatewayCommand::Query { request, reply })
            .await
            .is_err()
        {
            return SqlResponse::failed(Self::gone());
        }
        response
            .await
            .unwrap_or_else(|_| SqlResponse::failed(Self::gone()))
    }

    async fn connect(&self, config: DirectConfig) -> Result<(), GatewayFailure> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(GatewayCommand::Connect { config, reply })
            .await
            .map_err(|_| Self::gone())?;
        response.await.map_err(|_| Self::gone())?
    }
}
