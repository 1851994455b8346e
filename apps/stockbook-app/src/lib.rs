//! # Stockbook App
//!
//! Server actions behind the Stockbook dashboard: one async function per
//! form or page, each taking the shared [`AppState`] and the caller's
//! [`RequestContext`].
//!
//! ## Module Organization
//! ```text
//! stockbook_app/
//! ├── lib.rs          ◄─── AppState (Database + AppConfig)
//! ├── config.rs       ◄─── Layered configuration
//! ├── context.rs      ◄─── Principal email → tenant
//! ├── telemetry.rs    ◄─── tracing-subscriber setup
//! ├── error.rs        ◄─── ApiError returned by every action
//! └── actions/
//!     ├── product.rs      ◄─── Products and categories
//!     ├── stock.rs        ◄─── Deduct / replenish / history
//!     ├── invoice.rs      ◄─── Invoices and documents
//!     ├── client.rs
//!     ├── destination.rs
//!     └── analytics.rs    ◄─── Dashboard
//! ```
//!
//! ## Startup Sequence
//! 1. `telemetry::init_tracing()`
//! 2. `AppConfig::load()` (defaults → `stockbook.toml` → `STOCKBOOK_*`)
//! 3. `AppState::init(config)` connects and migrates
//! 4. Per request: `RequestContext::resolve(&state, email)`, then an action

pub mod actions;
pub mod config;
pub mod context;
pub mod error;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;

use thiserror::Error;
use tracing::info;

use stockbook_db::{Database, DbError};

pub use crate::config::{AppConfig, ConfigError};
pub use context::RequestContext;
pub use error::{ApiError, ErrorCode};

/// Failure while bringing the app up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database startup failed: {0}")]
    Database(#[from] DbError),
}

/// Shared state handed to every action.
///
/// Cheap to clone: the database handle is a pool.
#[derive(Debug, Clone)]
pub struct AppState {
    db: Database,
    config: AppConfig,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        AppState { db, config }
    }

    /// Opens the configured database and runs pending migrations.
    pub async fn init(config: AppConfig) -> Result<Self, StartupError> {
        let db_config = config.db_config()?;
        info!(path = ?db_config.database_path, "Opening database");

        let db = Database::new(db_config).await?;
        info!("Database connected and migrations applied");

        Ok(AppState::new(db, config))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
