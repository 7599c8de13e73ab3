use chrono::{DateTime, Utc};
use pulse_core::{Commit, LedgerEntry, Window, format_timestamp, parse_timestamp};
use rusqlite::Row;
use rusqlite::types::Type;

pub(crate) const COMMIT_COLUMNS: &str = r#"
    sha, author_name, author_email, author_date, message_title, message_body,
    additions, deletions, total_changes, repository, created_at, z_score
"#;

pub(crate) const LEDGER_COLUMNS: &str =
    "id, repository, start_date, end_date, last_cursor, completed, last_updated";

pub(crate) fn now_text() -> String {
    format_timestamp(&Utc::now())
}

pub(crate) fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: String = row.get(idx)?;
    parse_timestamp(&value)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

pub(crate) fn row_to_commit(row: &Row<'_>) -> rusqlite::Result<Commit> {
    Ok(Commit {
        sha: row.get(0)?,
        author_name: row.get(1)?,
        author_email: row.get(2)?,
        author_date: timestamp_at(row, 3)?,
        message_title: row.get(4)?,
        message_body: row.get(5)?,
        additions: row.get::<_, i64>(6)? as u64,
        deletions: row.get::<_, i64>(7)? as u64,
        total_changes: row.get::<_, i64>(8)? as u64,
        repository: row.get(9)?,
        ingested_at: timestamp_at(row, 10)?,
        z_score: row.get(11)?,
    })
}

pub(crate) fn row_to_ledger_entry(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let start = timestamp_at(row, 2)?;
    let end = timestamp_at(row, 3)?;
    let window = Window::new(start, end)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(err)))?;
    Ok(LedgerEntry {
        id: row.get(0)?,
        repository: row.get(1)?,
        window,
        last_cursor: row.get(4)?,
        completed: row.get::<_, i64>(5)? != 0,
        last_updated: timestamp_at(row, 6)?,
    })
}
