//! Direct PostgreSQL transport for the nexus client.
//!
//! [`DirectAdapter`] turns each operation into parameterized SQL and sends it
//! through a [`SqlGateway`]. [`ChannelGateway`] is the production gateway: a
//! channel to a task that alone owns the connection pool and credentials.

pub mod adapter;
pub mod executor;
pub mod gateway;

pub use adapter::DirectAdapter;
pub use executor::{ChannelGateway, PgExecutor};
pub use gateway::{GatewayFailure, SqlGateway, SqlRequest, SqlResponse};
