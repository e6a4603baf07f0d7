//! Database connection layer

pub mod connector;

pub use connector::{Connector, DbConnection, MySqlConnector};
