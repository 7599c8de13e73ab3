use chrono::Datelike;
use pulse_core::{
    Commit, DAY_NAMES, DayActivity, DayOfWeekMetric, DayValue, Window, WordFrequency,
};
use rusqlite::params;

use crate::Db;
use crate::error::Result;
use crate::helpers::{COMMIT_COLUMNS, row_to_commit};

impl Db {
    pub fn distinct_authors(&self, repository: &str, window: &Window) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT DISTINCT author_name
            FROM commits
            WHERE repository = ?1 AND author_date >= ?2 AND author_date <= ?3
            ORDER BY author_name ASC
            "#,
        )?;
        let rows = stmt.query_map(
            params![repository, window.start_text(), window.end_text()],
            |row| row.get::<_, String>(0),
        )?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Commits whose cached z-score is strictly above `threshold`, largest
    /// first.
    pub fn commits_above_z_score(
        &self,
        repository: &str,
        window: &Window,
        threshold: f64,
    ) -> Result<Vec<Commit>> {
        let sql = format!(
            r#"
            SELECT {COMMIT_COLUMNS}
            FROM commits
            WHERE repository = ?1
              AND author_date >= ?2
              AND author_date <= ?3
              AND z_score IS NOT NULL
              AND z_score > ?4
            ORDER BY z_score DESC, sha ASC
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![repository, window.start_text(), window.end_text(), threshold],
            row_to_commit,
        )?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Sums `metric` per weekday (UTC), Sunday first. Days without commits
    /// are reported as zero.
    pub fn day_of_week_activity(
        &self,
        repository: &str,
        window: &Window,
        metric: DayOfWeekMetric,
        author: Option<&str>,
    ) -> Result<DayActivity> {
        let mut totals = [0u64; 7];
        for commit in self.commits_in_window(repository, window)? {
            if author.is_some_and(|name| name != commit.author_name) {
                continue;
            }
            let day = commit.author_date.weekday().num_days_from_sunday() as usize;
            totals[day] = totals[day].saturating_add(metric.value_of(&commit));
        }
        Ok(DayActivity {
            metric,
            author: author.map(str::to_string),
            days: DAY_NAMES
                .iter()
                .zip(totals)
                .map(|(day, value)| DayValue {
                    day: (*day).to_string(),
                    value,
                })
                .collect(),
        })
    }

    /// Whether a word table was ever built for exactly this window, even an
    /// empty one.
    pub fn has_word_frequencies(&self, repository: &str, window: &Window) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM word_frequency_window
            WHERE repository = ?1 AND start_date = ?2 AND end_date = ?3
            "#,
            params![repository, window.start_text(), window.end_text()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Cached word counts for exactly this window, most frequent first.
    pub fn top_word_frequencies(
        &self,
        repository: &str,
        window: &Window,
        limit: usize,
    ) -> Result<Vec<WordFrequency>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT word, frequency
            FROM word_frequency
            WHERE repository = ?1 AND start_date = ?2 AND end_date = ?3
            ORDER BY frequency DESC, word ASC
            LIMIT ?4
            "#,
        )?;
        let rows = stmt.query_map(
            params![repository, window.start_text(), window.end_text(), limit as i64],
            |row| {
                Ok(WordFrequency {
                    word: row.get(0)?,
                    frequency: row.get::<_, i64>(1)?.max(0) as u64,
                })
            },
        )?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}
