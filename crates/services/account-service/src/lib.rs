//! Account Service Library
//!
//! This crate provides user-account management (registration, login, edit,
//! deletion and lookup) over a SeaORM database. It is driven by the
//! `account-service` CLI or embedded directly through [`connect`].

pub mod config;
pub mod infra;
pub mod repository;
pub mod service;

use std::sync::Arc;

use tracing::info;

use common::{AppError, AppResult};

use crate::config::AccountServiceConfig;
use crate::infra::{Database, Persistence};
use crate::service::AccountManager;

/// Connect to the database, apply pending migrations and build the service.
pub async fn connect(config: &AccountServiceConfig) -> AppResult<AccountManager> {
    let db = Database::connect(&config.database).await?;
    Ok(service_for(&db))
}

/// Build the service on an already connected database.
pub fn service_for(db: &Database) -> AccountManager {
    let uow = Arc::new(Persistence::new(db.get_connection()));
    AccountManager::new(uow)
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(config: &AccountServiceConfig, action: MigrateAction) -> AppResult<()> {
    let db = Database::connect_without_migrations(&config.database).await?;
    db.ping().await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            tracing::warn!("Resetting database and running all migrations...");
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Parse a JSON preferences argument into an object.
pub fn parse_preferences(raw: &str) -> AppResult<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| AppError::validation(format!("Preferences must be valid JSON: {}", e)))?;

    if !value.is_object() {
        return Err(AppError::validation("Preferences must be a JSON object."));
    }

    Ok(value)
}
