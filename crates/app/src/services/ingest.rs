use chrono::Utc;
use ingest::{
    GithubFetcher, IngestOutcome, IngestRequest, Ingestor, LocalRateBudget, PageFetcher,
    RateBudget, SharedRateBudget,
};
use pulse_core::{LedgerEntry, StatisticsOutcome, Window, WordFrequencyOutcome};
use pulse_db::Db;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{FetchParams, QueryParams};
use crate::error::Result;
use crate::services::{SharedConfig, open_db};
use crate::util::time::resolve_window;

/// Ingestion result plus the statistics refreshed for the window. A run
/// served from the cache leaves statistics alone, so both are `None`.
#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    #[serde(flatten)]
    pub ingest: IngestOutcome,
    pub z_scores: Option<StatisticsOutcome>,
    pub word_frequencies: Option<WordFrequencyOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecomputeReport {
    pub repository: String,
    pub window: Window,
    pub z_scores: StatisticsOutcome,
    pub word_frequencies: WordFrequencyOutcome,
}

#[derive(Clone)]
pub struct IngestService {
    config: SharedConfig,
}

impl IngestService {
    pub(super) fn new(config: SharedConfig) -> Self {
        Self { config }
    }

    fn db(&self) -> Result<Db> {
        open_db(&self.config)
    }

    fn token(&self) -> Option<String> {
        let name = &self.config.github.token_env;
        let token = std::env::var(name)
            .ok()
            .filter(|value| !value.trim().is_empty());
        if token.is_none() {
            warn!(env = %name, "no GitHub token set; requests will be unauthenticated");
        }
        token
    }

    fn budget(&self) -> Result<Box<dyn RateBudget>> {
        let settings = &self.config.budget;
        if settings.shared {
            let store = self.db()?;
            Ok(Box::new(SharedRateBudget::new(
                store,
                settings.provider.clone(),
                settings.safety_margin(),
            )))
        } else {
            Ok(Box::new(LocalRateBudget::new(settings.safety_margin())))
        }
    }

    /// Ingests the window from GitHub, then refreshes its statistics.
    pub fn fetch(&self, params: &FetchParams) -> Result<FetchReport> {
        let fetcher = GithubFetcher::new(self.config.github.fetcher_config(self.token()))?;
        let budget = self.budget()?;
        self.fetch_with(fetcher, budget, params)
    }

    /// Same as [`IngestService::fetch`] with an explicit page source and budget.
    pub fn fetch_with<F, B>(&self, fetcher: F, budget: B, params: &FetchParams) -> Result<FetchReport>
    where
        F: PageFetcher,
        B: RateBudget,
    {
        let repository = self
            .config
            .repository(params.query.owner.as_deref(), params.query.name.as_deref())?;
        let window = resolve_window(&params.query, Utc::now())?;
        let request = IngestRequest {
            repository,
            window,
            use_cache: params.use_cache,
        };

        let mut db = self.db()?;
        let outcome = Ingestor::new(fetcher, budget).ingest_window(&mut db, &request)?;
        if outcome.cache_used {
            return Ok(FetchReport {
                ingest: outcome,
                z_scores: None,
                word_frequencies: None,
            });
        }

        let z_scores = db.recompute_z_scores(&outcome.repository, &window)?;
        let word_frequencies = db.recompute_word_frequencies(&outcome.repository, &window)?;
        info!(repository = %outcome.repository, %window, "statistics refreshed");
        Ok(FetchReport {
            ingest: outcome,
            z_scores: Some(z_scores),
            word_frequencies: Some(word_frequencies),
        })
    }

    /// Recomputes z-scores and word counts for whatever is stored.
    pub fn recompute(&self, params: &QueryParams) -> Result<RecomputeReport> {
        let repository = self
            .config
            .repository(params.owner.as_deref(), params.name.as_deref())?
            .full_name();
        let window = resolve_window(params, Utc::now())?;
        let mut db = self.db()?;
        let z_scores = db.recompute_z_scores(&repository, &window)?;
        let word_frequencies = db.recompute_word_frequencies(&repository, &window)?;
        Ok(RecomputeReport {
            repository,
            window,
            z_scores,
            word_frequencies,
        })
    }

    pub fn ledger(&self, owner: Option<&str>, name: Option<&str>) -> Result<Vec<LedgerEntry>> {
        let repository = self.config.repository(owner, name)?.full_name();
        Ok(self.db()?.list_ledger(&repository)?)
    }
}
