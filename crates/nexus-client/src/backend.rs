use std::sync::Arc;

use nexus_client_core::{ConfigError, RemoteConfig};
use nexus_client_direct::{DirectAdapter, SqlGateway};
use nexus_client_rest::RestAdapter;

use crate::transport::TransportMode;

/// The strategy serving a [`NexusClient`](crate::NexusClient).
#[derive(Clone)]
pub enum Backend {
    /// PostgREST for data, postgres-meta for metadata and raw SQL.
    Remote(RestAdapter),
    /// Parameterized SQL through a gateway that owns the connection.
    Direct(DirectAdapter),
}

impl Backend {
    pub fn remote(config: RemoteConfig) -> Result<Self, ConfigError> {
        Ok(Self::Remote(RestAdapter::new(config)?))
    }

    pub fn direct(gateway: Arc<dyn SqlGateway>) -> Self {
        Self::Direct(DirectAdapter::new(gateway))
    }

    pub fn mode(&self) -> TransportMode {
        match self {
            Self::Remote(_) => TransportMode::Remote,
            Self::Direct(_) => TransportMode::Direct,
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(adapter) => f
                .debug_struct("Remote")
                .field("meta_url", &adapter.config().meta_url)
                .field("data_url", &adapter.config().data_url)
                .finish(),
            Self::Direct(_) => f.debug_struct("Direct").finish(),
        }
    }
}
