use crate::db::DatabaseClient;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{error, info};

/// Lists databases and tables, fresh on every call.
///
/// Failures degrade to an empty list (logged) so one bad query never takes
/// the process down.
pub struct Catalog {
    client: Arc<dyn DatabaseClient>,
    excluded: BTreeSet<String>,
}

impl Catalog {
    pub fn new(client: Arc<dyn DatabaseClient>, excluded: BTreeSet<String>) -> Self {
        Self { client, excluded }
    }

    /// User databases in server order, system schemas removed.
    pub async fn list_databases(&self) -> Vec<String> {
        match self.client.databases().await {
            Ok(all) => {
                let databases: Vec<String> = all
                    .into_iter()
                    .filter(|db| !self.excluded.contains(db))
                    .collect();
                info!("Found databases: {:?}", databases);
                databases
            }
            Err(e) => {
                error!(error = %e, "Error getting databases");
                Vec::new()
            }
        }
    }

    pub async fn list_tables(&self, database: &str) -> Vec<String> {
        match self.client.tables(database).await {
            Ok(tables) => {
                info!(database = %database, "Database '{}' tables: {:?}", database, tables);
                tables
            }
            Err(e) => {
                error!(database = %database, error = %e, "Error getting tables for database {}", database);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TableSnapshot;
    use crate::testing::FakeServer;

    fn excluded() -> BTreeSet<String> {
        ["information_schema", "performance_schema", "mysql", "sys"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[tokio::test]
    async fn test_system_schemas_excluded_in_server_order() {
        let server = FakeServer::new()
            .with_database("zeta")
            .with_database("information_schema")
            .with_database("app")
            .with_database("mysql")
            .with_database("sys")
            .with_database("performance_schema");
        let catalog = Catalog::new(Arc::new(server), excluded());

        assert_eq!(catalog.list_databases().await, vec!["zeta", "app"]);
    }

    #[tokio::test]
    async fn test_listing_is_repeatable() {
        let server = FakeServer::new()
            .with_table("app", "users", TableSnapshot::default())
            .with_table("app", "orders", TableSnapshot::default())
            .with_database("shop");
        let catalog = Catalog::new(Arc::new(server), excluded());

        let first = catalog.list_databases().await;
        let second = catalog.list_databases().await;
        assert_eq!(first, second);
        assert_eq!(catalog.list_tables("app").await, vec!["users", "orders"]);
        assert_eq!(catalog.list_tables("app").await, vec!["users", "orders"]);
    }

    #[tokio::test]
    async fn test_failures_degrade_to_empty() {
        let catalog = Catalog::new(Arc::new(FakeServer::new().unreachable()), excluded());
        assert!(catalog.list_databases().await.is_empty());
        assert!(catalog.list_tables("app").await.is_empty());
    }

    #[tokio::test]
    async fn test_configurable_exclusions() {
        let server = FakeServer::new()
            .with_database("postgres")
            .with_database("app")
            .with_database("mysql");
        let catalog = Catalog::new(Arc::new(server), ["postgres".to_string()].into_iter().collect());
        assert_eq!(catalog.list_databases().await, vec!["app", "mysql"]);
    }
}
