use std::time::Instant;

use pulse_core::RateBudgetReading;
use pulse_db::Db;
use tracing::{debug, info};

use crate::budget::RateBudget;
use crate::fetcher::PageFetcher;
use crate::types::{IngestOutcome, IngestRequest, IngestStats, PageRequest, Result};

/// Drives one (repository, window) ingestion from the ledger's last
/// checkpoint to completion.
pub struct Ingestor<F, B> {
    fetcher: F,
    budget: B,
}

impl<F: PageFetcher, B: RateBudget> Ingestor<F, B> {
    pub fn new(fetcher: F, budget: B) -> Self {
        Self { fetcher, budget }
    }

    /// Fetches every page of the window, persisting each page and advancing
    /// the ledger cursor before asking for the next one. On error the ledger
    /// stays in progress at its last checkpoint so a later call resumes there.
    pub fn ingest_window(&mut self, db: &mut Db, request: &IngestRequest) -> Result<IngestOutcome> {
        let repository = request.repository.full_name();
        let window = request.window;

        if request.use_cache {
            if let Some(entry) = db.find_covering_ledger(&repository, &window)? {
                info!(
                    repository = %repository,
                    %window,
                    ledger_id = entry.id,
                    "window already ingested; serving from store"
                );
                return Ok(IngestOutcome {
                    commits: db.commits_in_window(&repository, &window)?,
                    repository,
                    window,
                    cache_used: true,
                    resumed: false,
                    stats: IngestStats::default(),
                });
            }
        }

        let (entry, resumed) = match db.find_open_ledger(&repository, &window)? {
            Some(entry) => (entry, true),
            None => (db.begin_ledger(&repository, &window)?, false),
        };
        if resumed {
            info!(
                repository = %repository,
                %window,
                ledger_id = entry.id,
                cursor = entry.last_cursor.as_deref().unwrap_or("<start>"),
                "resuming interrupted ingestion"
            );
        } else {
            info!(repository = %repository, %window, ledger_id = entry.id, "starting ingestion");
        }

        let started = Instant::now();
        let mut stats = IngestStats::default();
        let mut cursor = entry.last_cursor.clone();
        loop {
            self.budget.acquire();
            let page = self.fetcher.fetch_page(&PageRequest {
                repository: request.repository.clone(),
                after: cursor.clone(),
                window,
            })?;
            if let Some(readout) = page.rate_limit {
                self.budget.update(RateBudgetReading {
                    remaining: readout.remaining,
                    reset_at: readout.reset_at,
                });
            }

            stats.pages_fetched += 1;
            stats.commits_seen += page.commits.len();
            let mut facts = Vec::with_capacity(page.commits.len());
            for commit in page.commits {
                if commit.is_merge() {
                    stats.merges_skipped += 1;
                } else {
                    facts.push(commit.into_fact(&repository));
                }
            }

            let inserted = db.checkpoint_page(entry.id, &facts, page.next_cursor.as_deref())?;
            stats.commits_inserted += inserted;
            debug!(
                ledger_id = entry.id,
                page = stats.pages_fetched,
                stored = facts.len(),
                inserted,
                has_more = page.next_cursor.is_some(),
                "checkpointed page"
            );

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        db.complete_ledger(entry.id)?;
        info!(
            repository = %repository,
            %window,
            ledger_id = entry.id,
            pages = stats.pages_fetched,
            inserted = stats.commits_inserted,
            merges_skipped = stats.merges_skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ingestion completed"
        );

        Ok(IngestOutcome {
            commits: db.commits_in_window(&repository, &window)?,
            repository,
            window,
            cache_used: false,
            resumed,
            stats,
        })
    }
}
