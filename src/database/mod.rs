//! Database access layer
//!
//! The pool lives in [`DatabaseManagerImpl`]; request handlers only see the
//! [`SubscriptionStore`] contract, so storage can be swapped for
//! [`mock::MockSubscriptionStore`] in tests.

use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{ConnectOptions, DatabaseConnection};
use thiserror::Error;

pub mod config;
pub mod dao;
pub mod entities;
pub mod migration;
pub mod mock;

pub use config::DatabaseConfig;
pub use dao::{ListFilter, SubscriptionStore, SubscriptionsDao, SummaryFilter};

/// Database error types
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Record not found")]
    NotFound,
    #[error("Migration error: {0}")]
    Migration(String),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Database manager trait for dependency injection and testing
#[async_trait]
pub trait DatabaseManager: Send + Sync {
    /// Run database migrations
    async fn migrate(&self) -> DatabaseResult<()>;

    /// Health check for database connection
    async fn health_check(&self) -> DatabaseResult<()>;

    /// Close every pooled connection
    async fn close(&self) -> DatabaseResult<()>;

    /// Get subscriptions DAO
    fn subscriptions(&self) -> SubscriptionsDao;

    /// Get direct database connection (for migrations and admin operations)
    fn connection(&self) -> &DatabaseConnection;
}

/// Pooled database connection manager
pub struct DatabaseManagerImpl {
    pub connection: DatabaseConnection,
}

impl DatabaseManagerImpl {
    /// Open the pool described by `config` and verify it with a ping
    pub async fn new_from_config(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let mut options = ConnectOptions::new(config.connection_url());
        options
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .sqlx_logging(false);

        let connection = sea_orm::Database::connect(options)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        let manager = Self { connection };
        if let Err(e) = manager.health_check().await {
            let _ = manager.close().await;
            return Err(e);
        }

        Ok(manager)
    }
}

#[async_trait]
impl DatabaseManager for DatabaseManagerImpl {
    async fn migrate(&self) -> DatabaseResult<()> {
        use crate::database::migration::Migrator;
        use sea_orm_migration::MigratorTrait;

        tracing::info!("Running database migrations");

        Migrator::up(&self.connection, None)
            .await
            .map_err(|e| DatabaseError::Migration(format!("Failed to run migrations: {}", e)))?;

        tracing::info!("Successfully completed all migrations");
        Ok(())
    }

    async fn health_check(&self) -> DatabaseResult<()> {
        self.connection
            .ping()
            .await
            .map_err(|e| DatabaseError::Database(format!("db error: {}", e)))
    }

    async fn close(&self) -> DatabaseResult<()> {
        // Clones share one pool, so closing a clone closes it for everyone
        self.connection
            .clone()
            .close()
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))
    }

    fn subscriptions(&self) -> SubscriptionsDao {
        SubscriptionsDao::new(self.connection.clone())
    }

    fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_config() -> DatabaseConfig {
        DatabaseConfig {
            url: Some("sqlite::memory:".to_string()),
            max_connections: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_connect_and_migrate() {
        let database = DatabaseManagerImpl::new_from_config(&sqlite_config())
            .await
            .unwrap();

        database.migrate().await.unwrap();
        // Migrations are idempotent
        database.migrate().await.unwrap();
        database.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_pool() {
        let database = DatabaseManagerImpl::new_from_config(&sqlite_config())
            .await
            .unwrap();

        database.close().await.unwrap();
        assert!(database.health_check().await.is_err());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(DatabaseError::NotFound.to_string(), "Record not found");
        assert_eq!(
            DatabaseError::Database("boom".to_string()).to_string(),
            "Database error: boom"
        );
    }
}
