use std::path::PathBuf;
use std::sync::Arc;

use crate::config::WatchdogConfig;
use crate::error::Result;
use crate::services::AppServices;
use crate::upstream::{HttpUpstream, Upstream};
use watchdog_db::Db;

/// Storage location plus the settings loaded at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub settings: WatchdogConfig,
}

/// Application state shared by the HTTP server and the CLI.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub services: AppServices,
}

impl AppState {
    /// Builds the state with a reqwest-backed upstream client.
    pub fn new(db_path: PathBuf, settings: WatchdogConfig) -> Result<Self> {
        let upstream = HttpUpstream::new(&settings.upstream)?;
        Ok(Self::with_upstream(db_path, settings, Arc::new(upstream)))
    }

    pub fn with_upstream(
        db_path: PathBuf,
        settings: WatchdogConfig,
        upstream: Arc<dyn Upstream>,
    ) -> Self {
        let config = AppConfig { db_path, settings };
        let services = AppServices::new(&config, upstream);
        Self { config, services }
    }

    pub fn is_fresh_db(&self) -> bool {
        !self.config.db_path.exists()
    }

    pub fn setup_db(&self) -> Result<()> {
        setup_db(&self.config.db_path)
    }

    pub fn open_db(&self) -> Result<Db> {
        Ok(Db::open(&self.config.db_path)?)
    }
}

pub fn setup_db(path: &std::path::Path) -> Result<()> {
    let mut db = Db::open(path)?;
    db.migrate()?;
    Ok(())
}
