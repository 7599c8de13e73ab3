mod analytics;
mod ingest;

use std::sync::Arc;

use crate::config::PulseConfig;
use crate::error::Result;
use pulse_db::Db;

pub use self::analytics::{AnalyticsService, DEFAULT_DEVIATION_THRESHOLD, WordFrequencies};
pub use self::ingest::{FetchReport, IngestService, RecomputeReport};

type SharedConfig = Arc<PulseConfig>;

/// Service registry for app-level operations.
#[derive(Clone)]
pub struct AppServices {
    pub analytics: AnalyticsService,
    pub ingest: IngestService,
}

impl AppServices {
    pub fn new(config: &PulseConfig) -> Self {
        let shared = Arc::new(config.clone());
        Self {
            analytics: AnalyticsService::new(shared.clone()),
            ingest: IngestService::new(shared),
        }
    }
}

fn open_db(config: &SharedConfig) -> Result<Db> {
    Ok(Db::open(&config.db_path)?)
}
