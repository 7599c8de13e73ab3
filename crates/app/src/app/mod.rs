use crate::config::PulseConfig;
use crate::error::Result;
use crate::services::AppServices;
use crate::startup::ensure_app_dirs;
use pulse_db::Db;

/// Application state shared by frontends (CLI, request routers).
#[derive(Clone)]
pub struct AppState {
    pub config: PulseConfig,
    pub services: AppServices,
}

impl AppState {
    pub fn new(config: PulseConfig) -> Self {
        let services = AppServices::new(&config);
        Self { config, services }
    }

    pub fn is_fresh_db(&self) -> bool {
        !self.config.db_path.exists()
    }

    /// Creates the database directory and brings the schema up to date.
    pub fn setup_db(&self) -> Result<()> {
        ensure_app_dirs(&self.config)?;
        let mut db = Db::open(&self.config.db_path)?;
        db.migrate()?;
        Ok(())
    }

    pub fn open_db(&self) -> Result<Db> {
        Ok(Db::open(&self.config.db_path)?)
    }
}
