use chrono::Utc;
use pulse_core::{
    Commit, CommitStatistics, StatisticsOutcome, TOP_WORDS_LIMIT, Window, WordFrequencyOutcome,
    count_words, format_timestamp, population_distribution, top_words,
};
use rusqlite::params;
use tracing::debug;

use crate::Db;
use crate::error::Result;

impl Db {
    /// Scores every commit in the window against the window's own
    /// change-size distribution, overwriting any score left by an earlier
    /// window. A window whose commits all have the same size leaves existing
    /// scores untouched.
    pub fn recompute_z_scores(
        &mut self,
        repository: &str,
        window: &Window,
    ) -> Result<StatisticsOutcome> {
        let commits = self.commits_in_window(repository, window)?;
        let sizes = commits
            .iter()
            .map(|commit| commit.total_changes)
            .collect::<Vec<_>>();
        let Some(distribution) = population_distribution(&sizes) else {
            return Ok(StatisticsOutcome::NoData);
        };

        if distribution.std_dev > 0.0 {
            let tx = self.conn.transaction()?;
            {
                let mut stmt = tx.prepare("UPDATE commits SET z_score = ?2 WHERE sha = ?1")?;
                for commit in &commits {
                    if let Some(z_score) = distribution.z_score(commit.total_changes) {
                        stmt.execute(params![commit.sha, z_score])?;
                    }
                }
            }
            tx.commit()?;
        } else {
            debug!(repository, %window, "change sizes have no spread; z-scores left as-is");
        }

        Ok(StatisticsOutcome::Computed(CommitStatistics {
            commit_count: distribution.count,
            mean_changes: distribution.mean,
            std_changes: distribution.std_dev,
        }))
    }

    /// Rebuilds the word table for exactly this window. Previous counts for
    /// the window are replaced, never added to. The window is marked as
    /// computed even when every word was filtered out.
    pub fn recompute_word_frequencies(
        &mut self,
        repository: &str,
        window: &Window,
    ) -> Result<WordFrequencyOutcome> {
        let commits = self.commits_in_window(repository, window)?;
        if commits.is_empty() {
            return Ok(WordFrequencyOutcome::NoData);
        }
        let messages = commits.iter().map(Commit::message_text).collect::<Vec<_>>();
        let counts = count_words(&messages);

        let start = window.start_text();
        let end = window.end_text();
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            DELETE FROM word_frequency
            WHERE repository = ?1 AND start_date = ?2 AND end_date = ?3
            "#,
            params![repository, start, end],
        )?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO word_frequency (word, frequency, repository, start_date, end_date)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for (word, frequency) in &counts {
                stmt.execute(params![word, *frequency as i64, repository, start, end])?;
            }
        }
        tx.execute(
            r#"
            INSERT INTO word_frequency_window (repository, start_date, end_date, computed_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(repository, start_date, end_date) DO UPDATE SET
              computed_at = excluded.computed_at
            "#,
            params![repository, start, end, format_timestamp(&Utc::now())],
        )?;
        tx.commit()?;

        Ok(WordFrequencyOutcome::Computed {
            distinct_words: counts.len(),
            top: top_words(&counts, TOP_WORDS_LIMIT),
        })
    }
}
