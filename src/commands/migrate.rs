use crate::Config;
use crate::database::migration::Migrator;
use crate::database::{DatabaseManager, DatabaseManagerImpl};
use clap::Subcommand;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::info;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum MigrateAction {
    /// Run all pending migrations
    Up,
    /// Rollback the last migration
    Down {
        #[arg(
            short,
            long,
            help = "Number of migrations to rollback",
            default_value = "1"
        )]
        steps: u32,
    },
    /// Show migration status
    Status,
}

/// Applied and pending migration names
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied: Vec<String>,
    pub pending: Vec<String>,
}

pub async fn handle_migrate_command(
    action: MigrateAction,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let db_manager = DatabaseManagerImpl::new_from_config(&config.database).await?;

    let result = run_migrate_action(action, db_manager.connection()).await;
    db_manager.close().await?;

    if let Some(status) = result? {
        for name in &status.applied {
            println!("applied  {}", name);
        }
        for name in &status.pending {
            println!("pending  {}", name);
        }
    }

    Ok(())
}

/// Apply `action` on `connection`; `Status` returns the migration listing
pub async fn run_migrate_action(
    action: MigrateAction,
    connection: &DatabaseConnection,
) -> Result<Option<MigrationStatus>, Box<dyn std::error::Error>> {
    match action {
        MigrateAction::Up => {
            info!("Running pending migrations...");
            Migrator::up(connection, None).await?;
            info!("All migrations completed successfully");
            Ok(None)
        }
        MigrateAction::Down { steps } => {
            info!("Rolling back {} migration(s)...", steps);
            Migrator::down(connection, Some(steps)).await?;
            info!("Rollback completed successfully");
            Ok(None)
        }
        MigrateAction::Status => {
            let applied = Migrator::get_applied_migrations(connection).await?;
            let pending = Migrator::get_pending_migrations(connection).await?;
            Ok(Some(MigrationStatus {
                applied: applied.iter().map(|m| m.name().to_string()).collect(),
                pending: pending.iter().map(|m| m.name().to_string()).collect(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::memory_database_config;

    const SUBSCRIPTIONS_MIGRATION: &str = "m20250801_000001_create_subscriptions_table";

    #[tokio::test]
    async fn test_up_status_down() {
        let database = DatabaseManagerImpl::new_from_config(&memory_database_config())
            .await
            .unwrap();
        let connection = database.connection();

        let status = run_migrate_action(MigrateAction::Status, connection)
            .await
            .unwrap()
            .unwrap();
        assert!(status.applied.is_empty());
        assert_eq!(status.pending, vec![SUBSCRIPTIONS_MIGRATION.to_string()]);

        run_migrate_action(MigrateAction::Up, connection).await.unwrap();
        let status = run_migrate_action(MigrateAction::Status, connection)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.applied, vec![SUBSCRIPTIONS_MIGRATION.to_string()]);
        assert!(status.pending.is_empty());

        run_migrate_action(MigrateAction::Down { steps: 1 }, connection)
            .await
            .unwrap();
        let status = run_migrate_action(MigrateAction::Status, connection)
            .await
            .unwrap()
            .unwrap();
        assert!(status.applied.is_empty());
    }
}
