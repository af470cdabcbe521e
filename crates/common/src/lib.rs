//! bibstore Common Library
//!
//! Shared code for the bibstore gateway and importer including:
//! - Database models, table descriptions and the repository
//! - Primary key allocation
//! - Identity assertions and resolution policies
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod identity;
pub mod metrics;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository, Resource};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
