use pulse_core::{CommitFact, LedgerEntry, Window};
use rusqlite::{OptionalExtension, params};

use crate::Db;
use crate::commits::insert_commits;
use crate::error::{DbError, Result};
use crate::helpers::{LEDGER_COLUMNS, now_text, row_to_ledger_entry};

impl Db {
    /// A completed entry whose window contains `window`, newest first.
    pub fn find_covering_ledger(
        &self,
        repository: &str,
        window: &Window,
    ) -> Result<Option<LedgerEntry>> {
        let sql = format!(
            r#"
            SELECT {LEDGER_COLUMNS}
            FROM ingest_ledger
            WHERE repository = ?1
              AND completed = 1
              AND start_date <= ?2
              AND end_date >= ?3
            ORDER BY last_updated DESC, id DESC
            LIMIT 1
            "#
        );
        Ok(self
            .conn
            .query_row(
                &sql,
                params![repository, window.start_text(), window.end_text()],
                row_to_ledger_entry,
            )
            .optional()?)
    }

    /// The in-progress entry for exactly this window, if a fetch was started
    /// and never finished.
    pub fn find_open_ledger(
        &self,
        repository: &str,
        window: &Window,
    ) -> Result<Option<LedgerEntry>> {
        let sql = format!(
            r#"
            SELECT {LEDGER_COLUMNS}
            FROM ingest_ledger
            WHERE repository = ?1
              AND start_date = ?2
              AND end_date = ?3
              AND completed = 0
            "#
        );
        Ok(self
            .conn
            .query_row(
                &sql,
                params![repository, window.start_text(), window.end_text()],
                row_to_ledger_entry,
            )
            .optional()?)
    }

    pub fn begin_ledger(&self, repository: &str, window: &Window) -> Result<LedgerEntry> {
        self.conn.execute(
            r#"
            INSERT INTO ingest_ledger (
              repository, start_date, end_date, last_cursor, completed, last_updated
            ) VALUES (
              ?1, ?2, ?3, NULL, 0, ?4
            )
            "#,
            params![repository, window.start_text(), window.end_text(), now_text()],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_ledger(id)?.ok_or(DbError::LedgerNotFound(id))
    }

    pub fn get_ledger(&self, id: i64) -> Result<Option<LedgerEntry>> {
        let sql = format!("SELECT {LEDGER_COLUMNS} FROM ingest_ledger WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], row_to_ledger_entry)
            .optional()?)
    }

    pub fn list_ledger(&self, repository: &str) -> Result<Vec<LedgerEntry>> {
        let sql = format!(
            r#"
            SELECT {LEDGER_COLUMNS}
            FROM ingest_ledger
            WHERE repository = ?1
            ORDER BY start_date ASC, end_date ASC, id ASC
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![repository], row_to_ledger_entry)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Persists one page of commits and, in the same transaction, moves the
    /// ledger cursor to `next_cursor`. The cursor is left alone on the last
    /// page (`None`), so a crash before [`Db::complete_ledger`] re-fetches at
    /// most that page.
    pub fn checkpoint_page(
        &mut self,
        ledger_id: i64,
        facts: &[CommitFact],
        next_cursor: Option<&str>,
    ) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let inserted = insert_commits(&tx, facts)?;
        let updated = tx.execute(
            r#"
            UPDATE ingest_ledger
            SET last_cursor = COALESCE(?2, last_cursor),
                last_updated = ?3
            WHERE id = ?1 AND completed = 0
            "#,
            params![ledger_id, next_cursor, now_text()],
        )?;
        if updated == 0 {
            return Err(DbError::LedgerNotFound(ledger_id));
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn complete_ledger(&self, ledger_id: i64) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE ingest_ledger SET completed = 1, last_updated = ?2 WHERE id = ?1",
            params![ledger_id, now_text()],
        )?;
        if updated == 0 {
            return Err(DbError::LedgerNotFound(ledger_id));
        }
        Ok(())
    }
}
