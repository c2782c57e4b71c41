pub mod config;
pub mod error;
pub mod response;
pub mod value;

pub use config::{ClientConfig, DirectConfig, PoolConfig, RemoteConfig};
pub use error::{ConfigError, ErrorKind, OperationError, OperationResult};
pub use response::{sort_tables, QueryResult, TableInfo};
pub use value::{is_native_pg_type, Row, NATIVE_PG_TYPES};
