//! # voucher-cli: Interactive Discount Management
//!
//! Menu-driven terminal front-end for creating, checking and redeeming
//! discounts.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CLI Startup                                      │
//! │                                                                         │
//! │  1. Initialize Tracing ─────────────────────────────────────────────►   │
//! │     • stderr, so log lines never interleave with prompts                │
//! │     • Default: warn,voucher=info; override with RUST_LOG                │
//! │                                                                         │
//! │  2. Load CliConfig (VOUCHER_* environment variables) ──────────────►    │
//! │                                                                         │
//! │  3. Build Store ────────────────────────────────────────────────────►   │
//! │     • sqlite: Database::new() + migrations (voucher-db)                 │
//! │     • memory: InMemoryDiscountStore                                     │
//! │                                                                         │
//! │  4. Menu loop on stdin/stdout until "0" or EOF ────────────────────►    │
//! │                                                                         │
//! │  5. Close the connection pool                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod menu;
pub mod prompt;

use std::io;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;
use voucher_core::{DiscountService, DiscountStore, InMemoryDiscountStore};
use voucher_db::{Database, DbConfig};

pub use config::{CliConfig, ConfigError, StoreKind};
pub use error::{CliError, CliResult};
pub use menu::Menu;
pub use prompt::Prompter;

/// Runs the interactive session on the process's terminal.
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    let config = CliConfig::load().context("Invalid configuration")?;
    info!(store = %config.store, path = ?config.database_path, "Configuration loaded");

    let (service, database) = build_service(&config)
        .await
        .context("Failed to open the discount store")?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut prompter = Prompter::new(stdin.lock(), stdout.lock());

    let outcome = Menu::new(service, config).run(&mut prompter).await;

    if let Some(db) = database {
        db.close().await;
    }

    outcome.context("Terminal session failed")
}

/// Initializes the tracing subscriber on stderr.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show service and repository decisions
/// - `RUST_LOG=voucher_core=trace` - Everything from the engine
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,voucher_core=info,voucher_db=info,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Wires the configured store into a [`DiscountService`].
///
/// Returns the database handle as well when SQLite is used, so the caller
/// can close the pool on exit.
pub async fn build_service(
    config: &CliConfig,
) -> CliResult<(DiscountService, Option<Database>)> {
    match (config.store, &config.database_path) {
        (StoreKind::Sqlite, Some(path)) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }

            let db = Database::new(DbConfig::new(path)).await?;
            let store: Arc<dyn DiscountStore> = Arc::new(db.discounts());
            Ok((DiscountService::with_system_clock(store), Some(db)))
        }
        _ => {
            let store: Arc<dyn DiscountStore> = Arc::new(InMemoryDiscountStore::new());
            Ok((DiscountService::with_system_clock(store), None))
        }
    }
}
