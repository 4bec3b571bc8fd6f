//! # CLI Error Type
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Menu action                                                            │
//! │     │                                                                   │
//! │     ├── CoreError  ──► printed as "Error: ...", menu continues          │
//! │     ├── InvalidInput ► printed as "Error: ...", menu continues          │
//! │     ├── InputClosed ─► menu exits cleanly (stdin reached EOF)           │
//! │     └── Io / Db / Config ──► propagated to main (anyhow)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use voucher_core::CoreError;
use voucher_db::DbError;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// A required prompt answer could not be used.
    #[error("{0}")]
    InvalidInput(String),

    /// Standard input was closed while a prompt was waiting.
    #[error("Input closed")]
    InputClosed,
}

impl CliError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        CliError::InvalidInput(message.into())
    }
}

pub type CliResult<T> = Result<T, CliError>;
