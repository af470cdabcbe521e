//! Database layer for bibstore
//!
//! Provides:
//! - SeaORM entity models
//! - Table descriptions for the generic CRUD surface
//! - Repository pattern for data access
//! - Connection pool management and schema bootstrap

pub mod ids;
pub mod models;
mod repository;
pub mod resource;

pub use repository::{BulkOutcome, ListQuery, Page, Repository};
pub use resource::{FieldFilter, FilterKind, Resource};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use models::*;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityName, EntityTrait, Schema,
};
use std::time::Duration;
use tracing::{debug, info};

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    /// Primary connection (for writes)
    pub primary: DatabaseConnection,

    /// Read replica connection (optional)
    pub replica: Option<DatabaseConnection>,
}

fn connect_options(url: &str, config: &DatabaseConfig) -> ConnectOptions {
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(config.sqlx_logging);

    // An in-memory database disappears with its last connection
    if !url.contains(":memory:") {
        opts.idle_timeout(Duration::from_secs(config.idle_timeout_secs));
    }
    opts
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to primary database...");

        let primary = Database::connect(connect_options(&config.url, config))
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect to primary: {}", e),
            })?;

        // Connect to replica if configured
        let replica = if let Some(ref read_url) = config.read_url {
            info!("Connecting to read replica...");

            let replica_conn = Database::connect(connect_options(read_url, config))
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Failed to connect to replica: {}", e),
                })?;

            Some(replica_conn)
        } else {
            None
        };

        info!(backend = ?primary.get_database_backend(), "Database connections established");

        Ok(Self { primary, replica })
    }

    /// Wrap an existing connection (tests, tools)
    pub fn from_connection(primary: DatabaseConnection) -> Self {
        Self { primary, replica: None }
    }

    /// Get the connection for reads (replica if available, otherwise primary)
    pub fn read(&self) -> &DatabaseConnection {
        self.replica.as_ref().unwrap_or(&self.primary)
    }

    /// Get the connection for writes (always primary)
    pub fn write(&self) -> &DatabaseConnection {
        &self.primary
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.primary
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Primary ping failed: {}", e),
            })?;

        if let Some(ref replica) = self.replica {
            replica
                .execute_unprepared("SELECT 1")
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Replica ping failed: {}", e),
                })?;
        }

        Ok(())
    }

    /// Create every table that does not exist yet
    ///
    /// Tables are created parents first so foreign keys resolve on SQLite.
    pub async fn create_schema(&self) -> Result<()> {
        let conn = self.write();

        create_table(conn, UserEntity).await?;
        create_table(conn, CorpusEntity).await?;
        create_table(conn, DisambiguationModelEntity).await?;
        create_table(conn, PaperEntity).await?;
        create_table(conn, PaperInstanceEntity).await?;
        create_table(conn, InstanceMetadatumEntity).await?;
        create_table(conn, InstanceIdentifierEntity).await?;
        create_table(conn, AuthorEntity).await?;
        create_table(conn, AuthorInstanceEntity).await?;
        create_table(conn, InstitutionEntity).await?;
        create_table(conn, InstitutionInstanceEntity).await?;
        create_table(conn, AffiliationInstanceEntity).await?;
        create_table(conn, AuthorIdentityEntity).await?;
        create_table(conn, InstitutionIdentityEntity).await?;
        create_table(conn, PaperIdentityEntity).await?;
        create_table(conn, AffiliationEntity).await?;

        info!("Schema ready");
        Ok(())
    }
}

async fn create_table<E: EntityTrait>(conn: &DatabaseConnection, entity: E) -> Result<()> {
    let backend = conn.get_database_backend();
    let mut statement = Schema::new(backend).create_table_from_entity(entity);
    statement.if_not_exists();

    debug!(table = entity.table_name(), "Creating table");
    conn.execute(backend.build(&statement)).await?;
    Ok(())
}
