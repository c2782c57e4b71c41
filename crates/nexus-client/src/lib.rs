//! Browse and edit PostgreSQL tables through one client, whether the database
//! is reached over PostgREST or through a direct connection.
//!
//! ```ignore
//! use nexus_client::prelude::*;
//!
//! let client = NexusClient::new(Backend::remote(config.remote)?);
//! let page = PageRequest::new("users", 50, 0)?;
//! let filters = vec![make_predicate("age", "gt", "30")?];
//! let result = client.fetch_page(&page, &filters, None).await?;
//! ```

pub mod backend;
pub mod client;
pub mod transport;

pub use backend::Backend;
pub use client::NexusClient;
pub use transport::{current_mode, detect_mode, ModeCell, TransportMode};

pub use nexus_client_core::*;
pub use nexus_client_direct::{ChannelGateway, DirectAdapter, SqlGateway};
pub use nexus_client_query::{
    build_rest_query, build_sql_fragment, make_predicate, ColumnDef, ColumnType, FilterOperator,
    OrderDirection, PageRequest, Predicate, SortKey,
};
pub use nexus_client_rest::RestAdapter;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use nexus_client::prelude::*;
/// ```
pub mod prelude {
    pub use nexus_client_core::row;
    pub use nexus_client_core::{
        ClientConfig, DirectConfig, ErrorKind, OperationError, OperationResult, QueryResult,
        RemoteConfig, Row, TableInfo,
    };
    pub use nexus_client_query::{make_predicate, PageRequest, Predicate, SortKey};

    pub use crate::{Backend, NexusClient, TransportMode};
}
