use chrono::Utc;
use pulse_core::{
    Commit, DayActivity, DayOfWeekMetric, TOP_WORDS_LIMIT, Window, WordFrequency,
    WordFrequencyOutcome,
};
use pulse_db::Db;
use serde::Serialize;
use tracing::debug;

use crate::config::QueryParams;
use crate::error::{AppError, Result};
use crate::services::{SharedConfig, open_db};
use crate::util::time::resolve_window;

pub const DEFAULT_DEVIATION_THRESHOLD: f64 = 2.0;

#[derive(Debug, Clone, Serialize)]
pub struct WordFrequencies {
    pub repository: String,
    pub window: Window,
    /// The table was built by this call rather than read from the cache.
    pub computed: bool,
    pub words: Vec<WordFrequency>,
}

#[derive(Clone)]
pub struct AnalyticsService {
    config: SharedConfig,
}

impl AnalyticsService {
    pub(super) fn new(config: SharedConfig) -> Self {
        Self { config }
    }

    fn db(&self) -> Result<Db> {
        open_db(&self.config)
    }

    fn scope(&self, params: &QueryParams) -> Result<(String, Window)> {
        let repository = self
            .config
            .repository(params.owner.as_deref(), params.name.as_deref())?
            .full_name();
        Ok((repository, resolve_window(params, Utc::now())?))
    }

    pub fn authors(&self, params: &QueryParams) -> Result<Vec<String>> {
        let (repository, window) = self.scope(params)?;
        Ok(self.db()?.distinct_authors(&repository, &window)?)
    }

    pub fn deviations(&self, params: &QueryParams, threshold: Option<f64>) -> Result<Vec<Commit>> {
        let threshold = threshold.unwrap_or(DEFAULT_DEVIATION_THRESHOLD);
        if !threshold.is_finite() {
            return Err(AppError::InvalidInput(format!(
                "threshold must be a finite number, got {threshold}"
            )));
        }
        let (repository, window) = self.scope(params)?;
        Ok(self
            .db()?
            .commits_above_z_score(&repository, &window, threshold)?)
    }

    pub fn day_of_week(
        &self,
        params: &QueryParams,
        metric: DayOfWeekMetric,
        author: Option<&str>,
    ) -> Result<DayActivity> {
        let (repository, window) = self.scope(params)?;
        Ok(self
            .db()?
            .day_of_week_activity(&repository, &window, metric, author)?)
    }

    /// Top words for exactly this window, building and caching the table
    /// first when it has never been computed.
    pub fn word_frequencies(&self, params: &QueryParams) -> Result<WordFrequencies> {
        let (repository, window) = self.scope(params)?;
        let mut db = self.db()?;
        if db.has_word_frequencies(&repository, &window)? {
            let words = db.top_word_frequencies(&repository, &window, TOP_WORDS_LIMIT)?;
            return Ok(WordFrequencies {
                repository,
                window,
                computed: false,
                words,
            });
        }

        debug!(repository = %repository, %window, "no cached word counts; computing");
        let words = match db.recompute_word_frequencies(&repository, &window)? {
            WordFrequencyOutcome::Computed { top, .. } => top,
            WordFrequencyOutcome::NoData => Vec::new(),
        };
        Ok(WordFrequencies {
            repository,
            window,
            computed: true,
            words,
        })
    }
}
