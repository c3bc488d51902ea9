//! Database server access.
//!
//! Every operation opens its own short-lived connection, does one unit of
//! work and disconnects. There is no pool: cycles run hours apart.

pub mod mysql;

use crate::Result;
use async_trait::async_trait;

pub use mysql::MySqlClient;

/// Column names plus every row of a table, rendered as text in server order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSnapshot {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Connect and immediately disconnect.
    async fn ping(&self) -> Result<()>;

    /// Every schema the server reports, in server order, unfiltered.
    async fn databases(&self) -> Result<Vec<String>>;

    /// Tables of one schema, in server order.
    async fn tables(&self, database: &str) -> Result<Vec<String>>;

    /// All rows of one table.
    async fn table_snapshot(&self, database: &str, table: &str) -> Result<TableSnapshot>;
}
