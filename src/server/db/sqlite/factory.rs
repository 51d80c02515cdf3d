use std::path::Path;

use anyhow::Result;
use log::{info, warn};

use super::config::SqliteConfig;
use super::SqliteConnection;

pub struct SqliteFactory;

impl SqliteFactory {
    pub fn new() -> Self {
        Self {}
    }

    pub fn build_sqlite(&self, cfg: &SqliteConfig) -> Result<SqliteConnection> {
        if cfg.memory {
            warn!("Using in-memory sqlite database, the data will be lost when the server stops");
            return SqliteConnection::memory();
        }

        info!("Using sqlite database: {}", cfg.path);
        SqliteConnection::open(Path::new(&cfg.path))
    }
}
