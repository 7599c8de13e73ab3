use rusqlite::Connection;
use tracing::warn;

use crate::Db;
use crate::error::Result;

const MIGRATION_0001: &str = include_str!("../migrations/0001_init.sql");
const MIGRATION_0002: &str = include_str!("../migrations/0002_open_ledger_unique.sql");
const MIGRATION_0003: &str = include_str!("../migrations/0003_add_rate_budget.sql");
const MIGRATION_0004: &str = include_str!("../migrations/0004_add_z_score_index.sql");
const MIGRATION_0005: &str = include_str!("../migrations/0005_add_word_frequency_windows.sql");

const MIGRATIONS: &[(&str, &str)] = &[
    ("0001_init", MIGRATION_0001),
    ("0002_open_ledger_unique", MIGRATION_0002),
    ("0003_add_rate_budget", MIGRATION_0003),
    ("0004_add_z_score_index", MIGRATION_0004),
    ("0005_add_word_frequency_windows", MIGRATION_0005),
];

impl Db {
    pub fn migrate(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        for (name, sql) in MIGRATIONS {
            if *name == "0002_open_ledger_unique" {
                collapse_duplicate_open_entries(&tx)?;
            }
            tx.execute_batch(sql)?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// Keeps only the newest in-progress ledger row per exact window so the
/// partial unique index can be created on databases written before it existed.
fn collapse_duplicate_open_entries(conn: &Connection) -> Result<()> {
    let removed = conn.execute(
        r#"
        DELETE FROM ingest_ledger
        WHERE completed = 0
          AND id NOT IN (
            SELECT MAX(id)
            FROM ingest_ledger
            WHERE completed = 0
            GROUP BY repository, start_date, end_date
          )
        "#,
        [],
    )?;
    if removed > 0 {
        warn!(removed, "dropped duplicate in-progress ledger entries");
    }
    Ok(())
}
