use crate::{
    config::Config,
    database::{DatabaseConfig, DatabaseManager, DatabaseManagerImpl, SubscriptionStore},
    server::Server,
    utils::parse_month,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// In-memory SQLite settings; one connection so every query sees the same database
pub fn memory_database_config() -> DatabaseConfig {
    DatabaseConfig {
        url: Some("sqlite::memory:".to_string()),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    }
}

/// Connected and migrated in-memory database
pub async fn create_test_database() -> DatabaseManagerImpl {
    let database = DatabaseManagerImpl::new_from_config(&memory_database_config())
        .await
        .unwrap();
    database.migrate().await.unwrap();
    database
}

/// Month literal shorthand for tests
pub fn month(value: &str) -> DateTime<Utc> {
    parse_month(value).unwrap()
}

/// Test server builder for creating test instances with configurable backends
pub struct TestServerBuilder {
    config: Config,
    store: Option<Arc<dyn SubscriptionStore>>,
}

impl TestServerBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            store: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Serve requests from `store` instead of the database DAO
    pub fn with_store(mut self, store: Arc<dyn SubscriptionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the test server with migrations applied
    pub async fn build(self) -> Server {
        let mut config = self.config;
        config.database = memory_database_config();
        config.logging.log_request = false;

        let server = Server::new(config).await.unwrap();
        server.database.migrate().await.unwrap();

        match self.store {
            Some(store) => {
                Server::from_parts((*server.config).clone(), server.database.clone(), store)
            }
            None => server,
        }
    }
}

impl Default for TestServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
