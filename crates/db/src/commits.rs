use pulse_core::{Commit, CommitFact, Window, format_timestamp};
use rusqlite::{Connection, OptionalExtension, params};

use crate::Db;
use crate::error::Result;
use crate::helpers::{COMMIT_COLUMNS, now_text, row_to_commit};

impl Db {
    /// Stores `fact` unless a commit with the same SHA already exists and
    /// returns whatever is stored. The first write wins; later facts for the
    /// same SHA are not merged in.
    pub fn upsert_commit(&self, fact: &CommitFact) -> Result<Commit> {
        insert_commits(&self.conn, std::slice::from_ref(fact))?;
        let sql = format!("SELECT {COMMIT_COLUMNS} FROM commits WHERE sha = ?1");
        Ok(self.conn.query_row(&sql, params![fact.sha], row_to_commit)?)
    }

    pub fn upsert_commits(&mut self, facts: &[CommitFact]) -> Result<usize> {
        if facts.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let inserted = insert_commits(&tx, facts)?;
        tx.commit()?;
        Ok(inserted)
    }

    pub fn get_commit(&self, sha: &str) -> Result<Option<Commit>> {
        let sql = format!("SELECT {COMMIT_COLUMNS} FROM commits WHERE sha = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![sha], row_to_commit)
            .optional()?)
    }

    /// Commits authored inside the window, both bounds inclusive.
    pub fn commits_in_window(&self, repository: &str, window: &Window) -> Result<Vec<Commit>> {
        let sql = format!(
            r#"
            SELECT {COMMIT_COLUMNS}
            FROM commits
            WHERE repository = ?1 AND author_date >= ?2 AND author_date <= ?3
            ORDER BY author_date ASC, sha ASC
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![repository, window.start_text(), window.end_text()],
            row_to_commit,
        )?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn count_commits(&self, repository: &str) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM commits WHERE repository = ?1",
            params![repository],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }
}

/// Inserts every fact whose SHA is not stored yet; returns how many were new.
pub(crate) fn insert_commits(conn: &Connection, facts: &[CommitFact]) -> Result<usize> {
    let created_at = now_text();
    let mut stmt = conn.prepare_cached(
        r#"
        INSERT INTO commits (
          sha, author_name, author_email, author_date, message_title, message_body,
          additions, deletions, total_changes, repository, created_at
        ) VALUES (
          ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11
        )
        ON CONFLICT(sha) DO NOTHING
        "#,
    )?;
    let mut inserted = 0usize;
    for fact in facts {
        let rows = stmt.execute(params![
            fact.sha,
            fact.author_name,
            fact.author_email,
            format_timestamp(&fact.author_date),
            fact.message_title,
            fact.message_body,
            fact.additions as i64,
            fact.deletions as i64,
            fact.total_changes() as i64,
            fact.repository,
            created_at,
        ])?;
        if rows > 0 {
            inserted += 1;
        }
    }
    Ok(inserted)
}
